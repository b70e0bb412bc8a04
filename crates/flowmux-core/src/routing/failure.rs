use std::fmt;
use std::io;

/// Transport-level cause of a failed outbound connection attempt.
///
/// Only `Refused` evicts a fallback candidate. A refusal means the peer
/// host answered and nothing is listening; timeouts, resets and routing
/// failures may be transient and leave the candidate list alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Refused,
    TimedOut,
    Reset,
    Unreachable,
    Other,
}

/// Lowercased phrases that identify each kind in an error description.
/// Checked in order; the first hit wins.
const PHRASES: &[(&str, FailureKind)] = &[
    ("connection refused", FailureKind::Refused),
    ("actively refused", FailureKind::Refused),
    ("econnrefused", FailureKind::Refused),
    ("timed out", FailureKind::TimedOut),
    ("etimedout", FailureKind::TimedOut),
    ("connection reset", FailureKind::Reset),
    ("econnreset", FailureKind::Reset),
    ("unreachable", FailureKind::Unreachable),
];

impl FailureKind {
    /// Classify a free-form error description reported by the transport.
    /// Unrecognized text maps to `Other`.
    pub fn classify(description: &str) -> Self {
        let lower = description.to_ascii_lowercase();
        PHRASES
            .iter()
            .find(|(phrase, _)| lower.contains(phrase))
            .map(|(_, kind)| *kind)
            .unwrap_or(FailureKind::Other)
    }

    pub fn is_refused(self) -> bool {
        self == FailureKind::Refused
    }
}

impl From<&io::Error> for FailureKind {
    fn from(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused,
            io::ErrorKind::TimedOut => Self::TimedOut,
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => Self::Reset,
            _ => Self::classify(&e.to_string()),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Refused => "connection refused",
            Self::TimedOut => "connection timed out",
            Self::Reset => "connection reset",
            Self::Unreachable => "host unreachable",
            Self::Other => "connection failed",
        };
        f.write_str(s)
    }
}
