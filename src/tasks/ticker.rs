//! One-second ticker driving the timer

use std::{sync::Arc, time::Duration};

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::state::AppState;

/// Default period between ticks
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Background task that advances the timer once per `period` until shutdown
///
/// Deadlines are computed from the start instant so small scheduling delays
/// do not accumulate. A late tick is delayed rather than burst, so the timer
/// never advances more than once per elapsed period.
pub async fn ticker_task(state: Arc<AppState>, period: Duration) {
    info!("Starting ticker task");

    let mut shutdown = state.shutdown().listener();
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let outcome = state.tick().await;
                if outcome.changed() {
                    debug!(?outcome, "Tick");
                }
            }
            _ = shutdown.requested() => {
                info!("Ticker stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::TimerSettings,
        services::StateFile,
        state::{app_state::tests::RecordingNotifier, Completion, Phase, Segment},
    };
    use pretty_assertions::assert_eq;

    fn app(dir: &tempfile::TempDir) -> (Arc<AppState>, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let state = AppState::new(
            TimerSettings {
                work_duration: 5,
                short_break: 2,
                long_break: 4,
                long_break_interval: 4,
            },
            StateFile::new(dir.path().join("state.json")),
            Box::new(notifier.clone()),
        );
        (Arc::new(state), notifier)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = app(&dir);
        let task = tokio::spawn(ticker_task(Arc::clone(&state), TICK_PERIOD));

        state.toggle().await;
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let timer = state.timer_state().await;
        assert_eq!(timer.phase(), Phase::Running);
        assert_eq!(timer.remaining_seconds(), 2);

        state.shutdown().request();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn runs_segment_to_completion_and_stops_counting() {
        let dir = tempfile::tempdir().unwrap();
        let (state, notifier) = app(&dir);
        let task = tokio::spawn(ticker_task(Arc::clone(&state), TICK_PERIOD));

        state.toggle().await;
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        let timer = state.timer_state().await;
        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.segment(), Segment::ShortBreak);
        assert_eq!(timer.remaining_seconds(), 2);
        assert_eq!(timer.completed_work_segments(), 1);
        assert_eq!(
            *notifier.0.lock().unwrap(),
            vec![Completion::Work { long_break_due: false }]
        );

        state.shutdown().request();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = app(&dir);
        let task = tokio::spawn(ticker_task(Arc::clone(&state), TICK_PERIOD));

        state.shutdown().request();
        task.await.unwrap();

        state.toggle().await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(state.timer_state().await.remaining_seconds(), 5);
    }
}
