// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use regex::Regex;

use super::traits::{BoundaryMatch, LineFormat, strip_line_ending};
use crate::receivers::file::error::{Error, Result};

/// Capture group holding the message timestamp
pub const TIMESTAMP_GROUP: &str = "timestamp";
/// Capture group holding the message level
pub const LEVEL_GROUP: &str = "level";
/// Capture group holding the first-line summary
pub const TITLE_GROUP: &str = "title";

/// A line format that recognizes message boundaries with a regular
/// expression using the named capture groups `timestamp`, `level` and
/// `title`. Any of the three may be absent from the pattern, but at least
/// one must be present.
pub struct RegexFormat {
    name: String,
    regex: Regex,
    /// Chrono format string for the `timestamp` group
    timestamp_format: Option<String>,
}

impl RegexFormat {
    /// Create a new RegexFormat from a regex pattern string.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::Regex(format!("invalid regex pattern: {}", e)))?;

        let has_known_group = regex.capture_names().flatten().any(|name| {
            name == TIMESTAMP_GROUP || name == LEVEL_GROUP || name == TITLE_GROUP
        });
        if !has_known_group {
            return Err(Error::Config(
                "format pattern must contain a named group: timestamp, level or title (use (?P<name>...) syntax)"
                    .to_string(),
            ));
        }

        Ok(Self {
            name: name.into(),
            regex,
            timestamp_format: None,
        })
    }

    /// Configure how the `timestamp` group is parsed.
    ///
    /// The format is a chrono format string. Formats with a `%z` offset are
    /// parsed as absolute times; formats without one are read in the host's
    /// local time zone.
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = Some(format.into());
        self
    }

    fn parse_timestamp(&self, value: &str) -> Option<i64> {
        let format = self.timestamp_format.as_deref()?;
        parse_timestamp(format, value)
    }
}

/// Strictly parse `value` with the chrono `format`, returning epoch seconds.
pub fn parse_timestamp(format: &str, value: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_str(value, format) {
        return Some(dt.timestamp());
    }

    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.timestamp())
}

impl LineFormat for RegexFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn match_boundary(&self, line: &str) -> Option<BoundaryMatch> {
        let content = strip_line_ending(line);
        let captures = self.regex.captures(content)?;
        let whole = captures.get(0)?;

        let timestamp_raw = captures
            .name(TIMESTAMP_GROUP)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let timestamp = if timestamp_raw.is_empty() {
            None
        } else {
            self.parse_timestamp(&timestamp_raw)
        };

        Some(BoundaryMatch {
            timestamp,
            timestamp_raw,
            level: captures.name(LEVEL_GROUP).map(|m| m.as_str().to_string()),
            title: captures.name(TITLE_GROUP).map(|m| m.as_str().to_string()),
            span: whole.start()..whole.end(),
        })
    }
}
