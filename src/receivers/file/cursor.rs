// SPDX-License-Identifier: Apache-2.0

//! Read position of one watched path.
//!
//! ## Offset Semantics
//!
//! `offset` is the byte position just past the last line handed to a
//! processor. Lines consumed into `pending_message` are already counted, so
//! a restart resumes after them and restores the buffer instead of
//! re-reading it.

use std::path::{Path, PathBuf};

use crate::receivers::file::event::PendingEvent;
use crate::receivers::file::input::{FileId, FileStat};

/// What happened to the file behind a path since the cursor was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorTransition {
    /// Same physical file, offset still within bounds
    Continue,
    /// A different physical file now occupies the path
    Rotated,
    /// Same physical file, but shorter than the saved offset
    Truncated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCursor {
    pub path: PathBuf,
    pub offset: u64,
    pub fingerprint: FileId,
    /// Modification time seen by the last scan, epoch seconds
    pub mtime: i64,
    pub pending_message: Option<PendingEvent>,
}

impl FileCursor {
    /// A cursor for a path seen for the first time.
    pub fn new(path: impl Into<PathBuf>, stat: &FileStat) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            fingerprint: stat.file_id,
            mtime: stat.mtime_secs(),
            pending_message: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compare the cursor against a fresh stat of its path.
    pub fn transition(&self, stat: &FileStat) -> CursorTransition {
        if self.fingerprint != stat.file_id {
            CursorTransition::Rotated
        } else if stat.size < self.offset {
            CursorTransition::Truncated
        } else {
            CursorTransition::Continue
        }
    }

    /// Restart from the beginning of the file identified by `stat`, handing
    /// back any message left pending from before.
    pub fn reset(&mut self, stat: &FileStat) -> Option<PendingEvent> {
        self.offset = 0;
        self.fingerprint = stat.file_id;
        self.pending_message.take().filter(|p| !p.is_empty())
    }

    /// Record the outcome of one read.
    pub fn advance(&mut self, end_offset: u64, stat: &FileStat, pending: Option<PendingEvent>) {
        self.offset = end_offset;
        self.mtime = stat.mtime_secs();
        self.pending_message = pending.filter(|p| !p.is_empty());
    }
}
