//! Main daemon state management

use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::TimerSettings,
    services::{Notifier, StateFile},
    utils::Shutdown,
};

use super::{Snapshot, SubscriberRegistry, Subscription, TickOutcome, TimerState};

/// Everything the daemon's tasks share
///
/// The timer lock is held until the new snapshot has been persisted and
/// broadcast, so subscribers observe mutations in the order they happened.
/// Lock order is always timer, then subscribers.
pub struct AppState {
    timer: Mutex<TimerState>,
    subscribers: SubscriberRegistry,
    state_file: StateFile,
    notifier: Box<dyn Notifier>,
    shutdown: Shutdown,
    start_time: Instant,
}

impl AppState {
    /// Create an idle timer with the given settings
    pub fn new(
        settings: TimerSettings,
        state_file: StateFile,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            timer: Mutex::new(TimerState::new(settings)),
            subscribers: SubscriberRegistry::new(),
            state_file,
            notifier,
            shutdown: Shutdown::new(),
            start_time: Instant::now(),
        }
    }

    pub async fn toggle(&self) -> Snapshot {
        self.update("toggle", TimerState::toggle).await
    }

    pub async fn stop(&self) -> Snapshot {
        self.update("stop", TimerState::stop).await
    }

    pub async fn skip(&self) -> Snapshot {
        self.update("skip", TimerState::skip).await
    }

    /// Advance the timer by one second
    ///
    /// Publishes only when the timer was running; a finished segment also
    /// triggers a notification.
    pub async fn tick(&self) -> TickOutcome {
        let mut timer = self.timer.lock().await;
        let outcome = timer.tick();

        if let TickOutcome::Completed(completion) = outcome {
            info!(
                sessions = timer.completed_work_segments(),
                next = ?timer.segment(),
                "Segment complete"
            );
            self.notifier.notify(completion);
        }

        if outcome.changed() {
            let snapshot = timer.snapshot();
            self.publish(&snapshot).await;
        }
        outcome
    }

    /// Apply a mutation and publish the result
    async fn update<F>(&self, action: &str, updater: F) -> Snapshot
    where
        F: FnOnce(&mut TimerState),
    {
        let mut timer = self.timer.lock().await;
        updater(&mut *timer);
        let snapshot = timer.snapshot();
        info!(
            action,
            status = ?snapshot.status,
            time_left = snapshot.time_left,
            sessions = snapshot.sessions,
            "Timer updated"
        );

        self.publish(&snapshot).await;
        snapshot
    }

    /// Persist and broadcast; failures are logged and absorbed
    async fn publish(&self, snapshot: &Snapshot) {
        if let Err(e) = self.state_file.write(snapshot) {
            warn!("Failed to persist snapshot: {}", e);
        }
        let subscribers = self.subscribers.broadcast(snapshot).await;
        debug!(subscribers, "Snapshot broadcast");
    }

    /// Write the current snapshot without broadcasting it
    pub async fn persist_current(&self) {
        let snapshot = self.snapshot().await;
        if let Err(e) = self.state_file.write(&snapshot) {
            warn!("Failed to persist snapshot: {}", e);
        }
    }

    /// Get current snapshot
    pub async fn snapshot(&self) -> Snapshot {
        self.timer.lock().await.snapshot()
    }

    /// Get a copy of the raw timer state
    pub async fn timer_state(&self) -> TimerState {
        self.timer.lock().await.clone()
    }

    /// Register a streaming client; its queue starts with the current snapshot
    ///
    /// Holding the timer lock here keeps a concurrent mutation from being
    /// queued ahead of the initial snapshot.
    pub async fn subscribe(&self) -> Option<Subscription> {
        let timer = self.timer.lock().await;
        let snapshot = timer.snapshot();
        self.subscribers.register(&snapshot).await
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.len().await
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// End subscriber streams and delete the snapshot file
    pub async fn close(&self) {
        self.subscribers.close_all().await;
        self.state_file.remove();
    }

    /// Calculate daemon uptime as a formatted string
    pub fn uptime(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::state::{Completion, Phase, Segment};
    use pretty_assertions::assert_eq;
    use std::{
        sync::{Arc, Mutex as StdMutex},
        time::Duration,
    };

    /// Notifier that records completions instead of spawning processes
    #[derive(Default, Clone)]
    pub(crate) struct RecordingNotifier(pub Arc<StdMutex<Vec<Completion>>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, completion: Completion) {
            self.0.lock().unwrap().push(completion);
        }
    }

    fn short_settings() -> TimerSettings {
        TimerSettings {
            work_duration: 3,
            short_break: 2,
            long_break: 4,
            long_break_interval: 4,
        }
    }

    fn app(dir: &tempfile::TempDir) -> (AppState, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let state = AppState::new(
            short_settings(),
            StateFile::new(dir.path().join("state.json")),
            Box::new(notifier.clone()),
        );
        (state, notifier)
    }

    fn read_state_file(dir: &tempfile::TempDir) -> Snapshot {
        let content = std::fs::read_to_string(dir.path().join("state.json")).unwrap();
        serde_json::from_str(content.trim_end()).unwrap()
    }

    #[tokio::test]
    async fn mutations_persist_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = app(&dir);

        let snapshot = state.toggle().await;
        assert_eq!(snapshot.status, Phase::Running);
        assert_eq!(read_state_file(&dir), snapshot);

        let snapshot = state.skip().await;
        assert!(snapshot.is_break);
        assert_eq!(read_state_file(&dir), snapshot);

        let snapshot = state.stop().await;
        assert_eq!(snapshot.sessions, 0);
        assert_eq!(read_state_file(&dir), snapshot);
    }

    #[tokio::test]
    async fn idle_tick_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = app(&dir);

        assert_eq!(state.tick().await, TickOutcome::Idle);
        assert!(!dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn completion_notifies_and_flips_segment() {
        let dir = tempfile::tempdir().unwrap();
        let (state, notifier) = app(&dir);

        state.toggle().await;
        for _ in 0..3 {
            state.tick().await;
        }

        let timer = state.timer_state().await;
        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.segment(), Segment::ShortBreak);
        assert_eq!(timer.completed_work_segments(), 1);
        assert_eq!(
            *notifier.0.lock().unwrap(),
            vec![Completion::Work { long_break_due: false }]
        );
        assert_eq!(read_state_file(&dir).time_left, 2);
    }

    #[tokio::test]
    async fn subscriber_gets_initial_then_updates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = app(&dir);

        let mut subscription = state.subscribe().await.unwrap();
        state.toggle().await;
        state.tick().await;

        let mut seen = Vec::new();
        for _ in 0..3 {
            let line = subscription.updates.recv().await.unwrap();
            let snapshot: Snapshot = serde_json::from_str(line.trim_end()).unwrap();
            seen.push((snapshot.status, snapshot.time_left));
        }
        assert_eq!(
            seen,
            vec![(Phase::Idle, 3), (Phase::Running, 3), (Phase::Running, 2)]
        );
    }

    #[tokio::test]
    async fn unread_subscriber_does_not_slow_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = app(&dir);
        let _idle = state.subscribe().await.unwrap();

        let started = Instant::now();
        for _ in 0..1_000 {
            state.toggle().await;
        }
        state.tick().await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(state.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn failed_persist_still_mutates_and_broadcasts() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            short_settings(),
            StateFile::new(dir.path().join("missing").join("state.json")),
            Box::new(RecordingNotifier::default()),
        );
        let mut subscription = state.subscribe().await.unwrap();
        subscription.updates.recv().await.unwrap();

        let snapshot = state.toggle().await;
        assert_eq!(snapshot.status, Phase::Running);
        assert_eq!(state.timer_state().await.phase(), Phase::Running);

        let line = subscription.updates.recv().await.unwrap();
        let received: Snapshot = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(received, snapshot);
        assert!(!dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn close_removes_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = app(&dir);
        state.persist_current().await;
        assert!(dir.path().join("state.json").exists());

        state.close().await;
        assert!(!dir.path().join("state.json").exists());
        assert_eq!(state.subscriber_count().await, 0);
    }
}
