//! Utility functions module
//!
//! Signal handling, the shutdown flag and the singleton PID marker.

pub mod pidfile;
pub mod signals;

// Re-export main functions
pub use pidfile::PidFile;
pub use signals::{install_signal_handlers, shutdown_signal, Shutdown, ShutdownListener};
