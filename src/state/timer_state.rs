//! Pomodoro timer state machine
//!
//! Pure state and transitions; no I/O happens here. Completion side
//! effects are reported back to the caller through [`TickOutcome`].

use serde::{Deserialize, Serialize};

use crate::config::TimerSettings;

use super::Snapshot;

/// Coarse run status of the current segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Paused,
}

/// What is being timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Work,
    ShortBreak,
    LongBreak,
}

impl Segment {
    pub fn is_break(self) -> bool {
        !matches!(self, Segment::Work)
    }
}

/// A segment that ran down to zero on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A work segment finished; `long_break_due` when the next break is long
    Work { long_break_due: bool },
    /// A break finished and work is up next
    Break,
}

/// Result of advancing the timer by one second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer not running, nothing changed
    Idle,
    /// One second elapsed
    Advanced,
    /// The segment reached zero and the timer moved to the next one
    Completed(Completion),
}

impl TickOutcome {
    /// Whether the tick mutated the state
    pub fn changed(self) -> bool {
        !matches!(self, TickOutcome::Idle)
    }
}

/// Timer state for work/break cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    settings: TimerSettings,
    phase: Phase,
    segment: Segment,
    remaining_seconds: u32,
    segment_duration_seconds: u32,
    completed_work_segments: u32,
}

impl TimerState {
    /// Create an idle timer at the start of a full work segment
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            phase: Phase::Idle,
            segment: Segment::Work,
            remaining_seconds: settings.work_duration,
            segment_duration_seconds: settings.work_duration,
            completed_work_segments: 0,
            settings,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn segment_duration_seconds(&self) -> u32 {
        self.segment_duration_seconds
    }

    pub fn completed_work_segments(&self) -> u32 {
        self.completed_work_segments
    }

    /// Pause a running segment, resume a paused one, or start an idle one
    pub fn toggle(&mut self) {
        match self.phase {
            Phase::Running => self.phase = Phase::Paused,
            Phase::Paused => self.phase = Phase::Running,
            Phase::Idle => {
                // Re-derive the break length in case the counter moved since the flip
                let segment = if self.segment.is_break() {
                    self.next_break()
                } else {
                    Segment::Work
                };
                self.enter(segment);
                self.phase = Phase::Running;
            }
        }
    }

    /// Reset to an idle work segment and clear the session count
    pub fn stop(&mut self) {
        self.completed_work_segments = 0;
        self.enter(Segment::Work);
        self.phase = Phase::Idle;
    }

    /// Move to the following segment without counting the current one
    pub fn skip(&mut self) {
        self.phase = Phase::Idle;
        self.flip();
    }

    /// Advance one second; completes the segment when it reaches zero
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Idle;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Advanced;
        }

        self.phase = Phase::Idle;
        let completion = if self.segment.is_break() {
            Completion::Break
        } else {
            self.completed_work_segments = self.completed_work_segments.saturating_add(1);
            Completion::Work {
                long_break_due: self.long_break_due(),
            }
        };
        self.flip();
        TickOutcome::Completed(completion)
    }

    /// Read-only projection sent to clients and written to disk
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_state(self)
    }

    fn long_break_due(&self) -> bool {
        self.completed_work_segments > 0
            && self.completed_work_segments % self.settings.long_break_interval == 0
    }

    fn next_break(&self) -> Segment {
        if self.long_break_due() {
            Segment::LongBreak
        } else {
            Segment::ShortBreak
        }
    }

    fn flip(&mut self) {
        let next = if self.segment.is_break() {
            Segment::Work
        } else {
            self.next_break()
        };
        self.enter(next);
    }

    fn enter(&mut self, segment: Segment) {
        let duration = match segment {
            Segment::Work => self.settings.work_duration,
            Segment::ShortBreak => self.settings.short_break,
            Segment::LongBreak => self.settings.long_break,
        };
        self.segment = segment;
        self.segment_duration_seconds = duration;
        self.remaining_seconds = duration;
    }
}
