//! State management module
//!
//! The timer state machine, its serialized snapshot, the subscriber
//! registry and the shared daemon state that ties them together.

pub mod app_state;
pub mod snapshot;
pub mod subscribers;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use snapshot::Snapshot;
pub use subscribers::{SubscriberRegistry, Subscription};
pub use timer_state::{Completion, Phase, Segment, TickOutcome, TimerState};
