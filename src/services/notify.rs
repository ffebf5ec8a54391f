//! Desktop notifications for finished segments

use tokio::process::Command;
use tracing::{debug, warn};

use crate::state::Completion;

/// Receives segment completions from the timer
pub trait Notifier: Send + Sync {
    fn notify(&self, completion: Completion);
}

/// Summary and body shown for a completion
pub fn message(completion: Completion) -> (&'static str, &'static str) {
    match completion {
        Completion::Break => ("Break Over!", "Time to focus!"),
        Completion::Work { long_break_due: true } => ("Pomodoro Complete!", "Take a long break!"),
        Completion::Work { long_break_due: false } => ("Pomodoro Complete!", "Take a short break!"),
    }
}

/// Sends notifications through `notify-send`
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, completion: Completion) {
        let (summary, body) = message(completion);
        debug!("Sending notification: {} - {}", summary, body);

        // Fire and forget; the child is reaped by the runtime
        if let Err(e) = Command::new("notify-send")
            .args([summary, body, "-u", "normal"])
            .spawn()
        {
            warn!("Failed to run notify-send: {}", e);
        }
    }
}
