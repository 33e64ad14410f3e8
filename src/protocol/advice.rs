//! Advice hints attached to responses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `advice.reconnect` field
pub const RECONNECT: &str = "reconnect";

/// `advice.interval` field (milliseconds)
pub const INTERVAL: &str = "interval";

/// `advice.timeout` field (milliseconds)
pub const TIMEOUT: &str = "timeout";

/// Reconnect hint telling the client its next legal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reconnect {
    /// Do nothing extra
    None,
    /// Retry the same operation
    Retry,
    /// Go back through handshake
    Handshake,
}

impl Reconnect {
    /// Wire code of the hint
    pub fn code(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Retry => "retry",
            Self::Handshake => "handshake",
        }
    }
}

impl fmt::Display for Reconnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Reconnect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "retry" => Ok(Self::Retry),
            "handshake" => Ok(Self::Handshake),
            _ => Err(format!("Unknown reconnect advice: {s}")),
        }
    }
}
