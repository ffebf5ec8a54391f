//! Side-effect services used by the daemon
//!
//! Snapshot persistence and desktop notifications.

pub mod notify;
pub mod persistence;

pub use notify::{DesktopNotifier, Notifier};
pub use persistence::StateFile;
