// SPDX-License-Identifier: Apache-2.0

use std::ops::Range;

/// The fields a [`LineFormat`] extracts from a line that starts a new message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryMatch {
    /// Raw timestamp text as captured, empty when the format has none
    pub timestamp_raw: String,
    /// Timestamp in epoch seconds, when `timestamp_raw` parsed cleanly
    pub timestamp: Option<i64>,
    /// Level text as written in the line (e.g. "ERROR")
    pub level: Option<String>,
    /// First-line summary of the message
    pub title: Option<String>,
    /// Byte span of the line consumed by the boundary marker
    pub span: Range<usize>,
}

impl BoundaryMatch {
    /// Timestamp for the message, falling back to `now` when the captured
    /// text was missing or unparsable.
    pub fn timestamp_or(&self, now: i64) -> i64 {
        self.timestamp.unwrap_or(now)
    }
}

/// A LineFormat recognizes lines that begin a new logical log message.
///
/// Implementations are pure: the same line always yields the same answer.
/// A line that does not match is never a boundary and is treated by callers
/// as a continuation of whatever message is pending.
pub trait LineFormat: Send + Sync {
    /// Name used to select the format from configuration
    fn name(&self) -> &str;

    /// Return the boundary fields if `line` starts a new message.
    /// `line` may still carry its line terminator.
    fn match_boundary(&self, line: &str) -> Option<BoundaryMatch>;
}

/// Strip a trailing `\n` or `\r\n` so anchored patterns see only the content.
pub fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
