// SPDX-License-Identifier: Apache-2.0

//! Reconstructed log events and the in-progress message buffer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::receivers::file::parser::BoundaryMatch;

/// How an event's body should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The body is an already serialized payload and is forwarded verbatim.
    Passthrough,
    /// The body is a reassembled log message that needs an envelope.
    Message,
}

/// A completed event, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Epoch seconds
    pub timestamp: Option<i64>,
    pub level: Option<String>,
    pub title: Option<String>,
    /// Message body, verbatim including line terminators
    pub body: String,
    /// File the event was read from
    pub source: PathBuf,
}

impl Event {
    /// An event for one line of a passthrough file.
    pub fn passthrough(body: impl Into<String>, source: &Path) -> Self {
        Self {
            kind: EventKind::Passthrough,
            timestamp: None,
            level: None,
            title: None,
            body: body.into(),
            source: source.to_path_buf(),
        }
    }
}

/// A multi-line message still being assembled. Carried across scan ticks
/// and persisted with the file's cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEvent {
    /// Epoch seconds from the first line, or wall-clock when it had none
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Raw lines in arrival order
    #[serde(default)]
    pub lines: Vec<String>,
}

impl PendingEvent {
    /// Start a message from a line that matched a format.
    pub fn from_boundary(boundary: &BoundaryMatch, now: i64) -> Self {
        Self {
            timestamp: boundary.timestamp_or(now),
            level: boundary.level.clone(),
            title: boundary.title.clone(),
            lines: Vec::new(),
        }
    }

    /// Start a message with no metadata, for lines that arrive before any
    /// boundary has been seen.
    pub fn untimed(now: i64) -> Self {
        Self {
            timestamp: now,
            ..Default::default()
        }
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// An empty pending message is equivalent to no pending message.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn body(&self) -> String {
        self.lines.concat()
    }

    /// Complete the message.
    pub fn into_event(self, source: &Path) -> Event {
        Event {
            kind: EventKind::Message,
            timestamp: Some(self.timestamp),
            body: self.lines.concat(),
            level: self.level,
            title: self.title,
            source: source.to_path_buf(),
        }
    }
}
