//! Line-oriented wire protocol
//!
//! A client sends one command word terminated by `\n`. One-shot commands get
//! a single reply line and the connection is closed; `listen` keeps the
//! connection open and receives one JSON snapshot per state change.

use std::{fmt, str::FromStr, time::Duration};

/// Reply to a successful mutation or `quit`
pub const REPLY_OK: &str = "OK\n";
/// Reply to anything that is not a known command
pub const REPLY_UNKNOWN: &str = "UNKNOWN\n";

/// Longest request line the server reads
pub const MAX_REQUEST_LEN: u64 = 1024;
/// Read/write bound for one-shot exchanges
pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Commands understood by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Toggle,
    Stop,
    Skip,
    State,
    Listen,
    Quit,
}

impl Request {
    pub fn as_str(self) -> &'static str {
        match self {
            Request::Toggle => "toggle",
            Request::Stop => "stop",
            Request::Skip => "skip",
            Request::State => "state",
            Request::Listen => "listen",
            Request::Quit => "quit",
        }
    }

    /// The request line as sent on the wire
    pub fn to_line(self) -> String {
        format!("{}\n", self.as_str())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The command text did not name a known request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRequest(pub String);

impl FromStr for Request {
    type Err = UnknownRequest;

    /// Surrounding whitespace is ignored; matching is case-sensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "toggle" => Ok(Request::Toggle),
            "stop" => Ok(Request::Stop),
            "skip" => Ok(Request::Skip),
            "state" => Ok(Request::State),
            "listen" => Ok(Request::Listen),
            "quit" => Ok(Request::Quit),
            other => Err(UnknownRequest(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands_with_line_endings() {
        assert_eq!("toggle\n".parse::<Request>(), Ok(Request::Toggle));
        assert_eq!("  listen\r\n".parse::<Request>(), Ok(Request::Listen));
        assert_eq!("quit".parse::<Request>(), Ok(Request::Quit));
        for request in [Request::Stop, Request::Skip, Request::State] {
            assert_eq!(request.to_line().parse::<Request>(), Ok(request));
        }
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(
            "kill".parse::<Request>(),
            Err(UnknownRequest("kill".to_string()))
        );
        assert!("TOGGLE".parse::<Request>().is_err());
        assert!("".parse::<Request>().is_err());
        assert!("toggle stop".parse::<Request>().is_err());
    }
}
