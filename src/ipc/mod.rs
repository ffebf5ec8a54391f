//! Local IPC between the daemon and its clients

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{Client, DaemonLauncher};
pub use protocol::Request;
pub use server::serve;
