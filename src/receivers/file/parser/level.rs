// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level indicates the seriousness of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Detailed tracing
    Trace,
    /// Debugging purposes
    Debug,
    /// High level application details
    Info,
    /// Should be noticed
    Warning,
    /// Something undesirable happened
    Error,
    /// Requires immediate attention
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" | "information" | "notice" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "error" | "err" | "exception" => Ok(Self::Error),
            "critical" | "crit" | "fatal" | "alert" | "emergency" => Ok(Self::Critical),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

impl Level {
    /// Decide whether a message carrying the raw level text passes a minimum
    /// level. Messages whose level cannot be recognized always pass.
    pub fn admits(min: Option<Level>, raw: Option<&str>) -> bool {
        let Some(min) = min else {
            return true;
        };
        match raw.and_then(|r| r.parse::<Level>().ok()) {
            Some(level) => level >= min,
            None => true,
        }
    }
}
