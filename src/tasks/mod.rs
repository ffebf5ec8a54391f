//! Background tasks module
//!
//! This module contains background tasks that run alongside the IPC server.

pub mod ticker;

// Re-export main functions
pub use ticker::{ticker_task, TICK_PERIOD};
