//! Serialized view of the timer sent to clients

use serde::{Deserialize, Serialize};

use super::{Phase, TimerState};

const WORK_ICON: &str = "🍅";
const BREAK_ICON: &str = "☕";

/// Snapshot of the timer as seen by subscribers and the state file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: Phase,
    pub time_left: u32,
    pub time_display: String,
    pub sessions: u32,
    pub is_break: bool,
    pub percent: u32,
    pub icon: String,
}

impl Snapshot {
    pub fn from_state(state: &TimerState) -> Self {
        let duration = state.segment_duration_seconds();
        let remaining = state.remaining_seconds();
        let is_break = state.segment().is_break();

        Self {
            status: state.phase(),
            time_left: remaining,
            time_display: format_time(remaining),
            sessions: state.completed_work_segments(),
            is_break,
            percent: percent_elapsed(duration, remaining),
            icon: if is_break { BREAK_ICON } else { WORK_ICON }.to_string(),
        }
    }

    /// Encode as a single newline-terminated JSON line
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Format seconds as `M:SS`
pub fn format_time(total_seconds: u32) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

fn percent_elapsed(duration: u32, remaining: u32) -> u32 {
    if duration == 0 {
        return 0;
    }
    let elapsed = u64::from(duration.saturating_sub(remaining));
    (elapsed * 100 / u64::from(duration)) as u32
}
