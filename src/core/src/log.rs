//! Log level types and verbosity mapping.

use serde::{Deserialize, Serialize};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Map a repeated `-v` count onto a level.
    ///
    /// 0 → error, 1 → warn, 2 and 3 → info, anything higher → debug.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Error,
            1 => Self::Warn,
            2 | 3 => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Error
    }
}
