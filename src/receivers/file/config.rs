// SPDX-License-Identifier: Apache-2.0

//! Configuration for the file receiver.

use std::path::PathBuf;
use std::time::Duration;

use crate::receivers::file::parser::Level;
use crate::receivers::file::parser::formats::PYLONS_FORMAT;

/// A user supplied line format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFormat {
    pub name: String,
    /// Regex with at least one of the named groups `timestamp`, `level`, `title`
    pub pattern: String,
    /// chrono format string for the `timestamp` group
    pub timestamp_format: Option<String>,
}

/// Which line formats are used, and for which files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConfig {
    /// Format, or `+`-joined chain, for files no pattern matches
    pub default: String,
    /// (glob, format selection) pairs, first matching glob wins
    pub patterns: Vec<(String, String)>,
    pub custom: Vec<CustomFormat>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            default: PYLONS_FORMAT.to_string(),
            patterns: Vec::new(),
            custom: Vec::new(),
        }
    }
}

/// Configuration for the file receiver
#[derive(Debug, Clone)]
pub struct FileReceiverConfig {
    /// Files to tail
    pub files: Vec<PathBuf>,
    /// Path of the position store
    pub state_path: PathBuf,
    /// Delay between scan passes
    pub scan_interval: Duration,
    /// A file unmodified for longer than this has its pending message flushed
    pub idle_flush_threshold: Duration,
    /// Files with this extension are forwarded line by line
    pub passthrough_extension: String,
    pub formats: FormatConfig,
    /// Aggregated events below this level are not dispatched
    pub min_level: Option<Level>,
    /// Maximum log line size in bytes
    pub max_line_size: usize,
}

impl Default for FileReceiverConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            state_path: PathBuf::from("ratchet-agent.state.json"),
            scan_interval: Duration::from_secs(1),
            idle_flush_threshold: Duration::from_secs(1),
            passthrough_extension: "ratchet".to_string(),
            formats: FormatConfig::default(),
            min_level: None,
            max_line_size: 1024 * 1024,
        }
    }
}

impl FileReceiverConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.files.is_empty() {
            return Err("At least one file must be specified".to_string());
        }

        if self.scan_interval.is_zero() {
            return Err("Scan interval must be greater than zero".to_string());
        }

        if self.max_line_size == 0 {
            return Err("Maximum line size must be greater than zero".to_string());
        }

        if self.formats.default.is_empty() {
            return Err("A default log format must be specified".to_string());
        }

        for custom in &self.formats.custom {
            if custom.name.is_empty() {
                return Err("Custom log formats must be named".to_string());
            }
        }

        Ok(())
    }
}
