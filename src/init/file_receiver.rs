// SPDX-License-Identifier: Apache-2.0

use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tower::BoxError;

use crate::init::parse;
use crate::receivers::file::parser::formats::PYLONS_FORMAT;
use crate::receivers::file::{CustomFormat, FileReceiverConfig, FormatConfig, Level};

#[derive(Debug, Args, Clone)]
pub struct FileReceiverArgs {
    /// Log files to tail, repeat the flag or separate paths with commas
    #[arg(
        long = "file",
        env = "RATCHET_FILES",
        value_delimiter = ',',
        required = true
    )]
    pub file_receiver_files: Vec<PathBuf>,

    /// Path of the file position store
    #[arg(
        long = "state-path",
        env = "RATCHET_STATE_PATH",
        default_value = "ratchet-agent.state.json"
    )]
    pub file_receiver_state_path: PathBuf,

    /// Delay between scans of the watched files, in milliseconds
    #[arg(long = "scan-interval-ms", env = "RATCHET_SCAN_INTERVAL_MS", default_value = "1000")]
    pub file_receiver_scan_interval_ms: u64,

    /// A file unmodified for this long has its buffered message sent, in milliseconds
    #[arg(long = "idle-flush-ms", env = "RATCHET_IDLE_FLUSH_MS", default_value = "1000")]
    pub file_receiver_idle_flush_ms: u64,

    /// Files with this extension hold one complete item per line
    #[arg(
        long = "passthrough-extension",
        env = "RATCHET_PASSTHROUGH_EXTENSION",
        default_value = "ratchet"
    )]
    pub file_receiver_passthrough_extension: String,

    /// Log format used for files no pattern matches. Join names with `+`
    /// to try several formats in order, e.g. `pylons+rails`.
    #[arg(
        long = "log-format-default",
        env = "RATCHET_LOG_FORMAT_DEFAULT",
        default_value = PYLONS_FORMAT
    )]
    pub file_receiver_log_format_default: String,

    /// Comma-separated GLOB=FORMAT pairs choosing a format by file name.
    /// FORMAT may be a `+`-joined chain like the default.
    #[arg(
        long = "log-format-pattern",
        env = "RATCHET_LOG_FORMAT_PATTERNS",
        value_parser = parse::parse_key_val::<String, String>,
        value_delimiter = ','
    )]
    pub file_receiver_log_format_patterns: Vec<(String, String)>,

    /// Custom format as NAME=REGEX, repeatable. The regex may name the
    /// groups timestamp, level and title.
    #[arg(
        long = "log-format-custom",
        value_parser = parse::parse_key_val::<String, String>
    )]
    pub file_receiver_log_format_custom: Vec<(String, String)>,

    /// Timestamp format of a custom format as NAME=STRFTIME, repeatable
    #[arg(
        long = "log-format-custom-timestamp",
        value_parser = parse::parse_key_val::<String, String>
    )]
    pub file_receiver_log_format_custom_timestamp: Vec<(String, String)>,

    /// Aggregated messages below this level are not sent
    #[arg(long = "min-log-level", env = "RATCHET_MIN_LOG_LEVEL")]
    pub file_receiver_min_log_level: Option<Level>,

    /// Maximum log line size in bytes, longer lines are truncated
    #[arg(
        long = "max-line-size",
        env = "RATCHET_MAX_LINE_SIZE",
        default_value = "1048576"
    )]
    pub file_receiver_max_line_size: usize,
}

impl Default for FileReceiverArgs {
    fn default() -> Self {
        Self {
            file_receiver_files: Vec::new(),
            file_receiver_state_path: PathBuf::from("ratchet-agent.state.json"),
            file_receiver_scan_interval_ms: 1000,
            file_receiver_idle_flush_ms: 1000,
            file_receiver_passthrough_extension: "ratchet".to_string(),
            file_receiver_log_format_default: PYLONS_FORMAT.to_string(),
            file_receiver_log_format_patterns: Vec::new(),
            file_receiver_log_format_custom: Vec::new(),
            file_receiver_log_format_custom_timestamp: Vec::new(),
            file_receiver_min_log_level: None,
            file_receiver_max_line_size: 1024 * 1024,
        }
    }
}

impl FileReceiverArgs {
    /// Build the receiver config. Relative paths are resolved against `cwd`
    /// so position store keys stay stable across restarts.
    pub fn build_config(&self, cwd: &Path) -> Result<FileReceiverConfig, BoxError> {
        for (name, _) in &self.file_receiver_log_format_custom_timestamp {
            if !self
                .file_receiver_log_format_custom
                .iter()
                .any(|(custom, _)| custom == name)
            {
                return Err(format!("timestamp format given for unknown custom format: {}", name).into());
            }
        }

        let custom = self
            .file_receiver_log_format_custom
            .iter()
            .map(|(name, pattern)| CustomFormat {
                name: name.clone(),
                pattern: pattern.clone(),
                timestamp_format: self
                    .file_receiver_log_format_custom_timestamp
                    .iter()
                    .find(|(ts_name, _)| ts_name == name)
                    .map(|(_, fmt)| fmt.clone()),
            })
            .collect();

        let config = FileReceiverConfig {
            files: self
                .file_receiver_files
                .iter()
                .map(|p| absolute(cwd, p))
                .collect(),
            state_path: absolute(cwd, &self.file_receiver_state_path),
            scan_interval: Duration::from_millis(self.file_receiver_scan_interval_ms),
            idle_flush_threshold: Duration::from_millis(self.file_receiver_idle_flush_ms),
            passthrough_extension: self.file_receiver_passthrough_extension.clone(),
            formats: FormatConfig {
                default: self.file_receiver_log_format_default.clone(),
                patterns: self.file_receiver_log_format_patterns.clone(),
                custom,
            },
            min_level: self.file_receiver_min_log_level,
            max_line_size: self.file_receiver_max_line_size,
        };
        config.validate()?;

        Ok(config)
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
