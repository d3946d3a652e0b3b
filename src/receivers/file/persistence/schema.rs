// SPDX-License-Identifier: Apache-2.0

//! Persistence schema definitions for the position store.
//!
//! The document is keyed by absolute path so that a person inspecting the
//! state file can see at a glance how far each log has been read:
//!
//! ```json
//! {
//!   "version": 1,
//!   "files": {
//!     "/var/log/app.log": {
//!       "offset": 1024,
//!       "fingerprint": { "dev": 2049, "ino": 131 },
//!       "mtime": 1609495205,
//!       "pending_message": { "timestamp": 1609495205, "lines": ["..."] }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::receivers::file::cursor::FileCursor;
use crate::receivers::file::event::PendingEvent;
use crate::receivers::file::input::FileId;

/// Current schema version for persisted state
pub const PERSISTED_STATE_VERSION: u8 = 1;

/// Persisted state for all known files (v1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedStateV1 {
    /// Schema version (always 1 for this format)
    pub version: u8,
    /// Map from absolute path to that path's cursor
    pub files: BTreeMap<String, PersistedCursorV1>,
}

impl Default for PersistedStateV1 {
    fn default() -> Self {
        Self {
            version: PERSISTED_STATE_VERSION,
            files: BTreeMap::new(),
        }
    }
}

/// Persisted state for a single path (v1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCursorV1 {
    /// Byte position to resume reading from
    pub offset: u64,
    /// Identity of the file the offset refers to
    pub fingerprint: FileId,
    /// Last observed modification time, epoch seconds
    pub mtime: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_message: Option<PendingEvent>,
}

impl PersistedCursorV1 {
    pub fn into_cursor(self, path: &Path) -> FileCursor {
        FileCursor {
            path: path.to_path_buf(),
            offset: self.offset,
            fingerprint: self.fingerprint,
            mtime: self.mtime,
            pending_message: self.pending_message,
        }
    }
}

impl From<&FileCursor> for PersistedCursorV1 {
    fn from(cursor: &FileCursor) -> Self {
        Self {
            offset: cursor.offset,
            fingerprint: cursor.fingerprint,
            mtime: cursor.mtime,
            pending_message: cursor.pending_message.clone(),
        }
    }
}

/// Generate the map key for a path
pub fn path_to_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_state_v1_default() {
        let state = PersistedStateV1::default();
        assert_eq!(state.version, PERSISTED_STATE_VERSION);
        assert!(state.files.is_empty());
    }

    #[test]
    fn test_v1_layout() {
        let mut state = PersistedStateV1::default();
        state.files.insert(
            "/var/log/app.log".to_string(),
            PersistedCursorV1 {
                offset: 500,
                fingerprint: FileId::new(1, 100),
                mtime: 1_609_495_205,
                pending_message: None,
            },
        );

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "version": 1,
                "files": {
                    "/var/log/app.log": {
                        "offset": 500,
                        "fingerprint": {"dev": 1, "ino": 100},
                        "mtime": 1_609_495_205
                    }
                }
            })
        );
    }

    #[test]
    fn test_pending_message_survives_serialization() {
        let entry = PersistedCursorV1 {
            offset: 42,
            fingerprint: FileId::new(3, 4),
            mtime: 7,
            pending_message: Some(PendingEvent {
                timestamp: 7,
                level: Some("ERROR".to_string()),
                title: Some("boom".to_string()),
                lines: vec!["2021-01-01 00:00:00,000 ERROR boom\n".to_string()],
            }),
        };

        let json = serde_json::to_string(&entry).unwrap();
        let restored: PersistedCursorV1 = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, entry);

        let cursor = restored.into_cursor(Path::new("/var/log/app.log"));
        assert_eq!(cursor.offset, 42);
        assert_eq!(PersistedCursorV1::from(&cursor), entry);
    }

    #[test]
    fn test_path_key() {
        let path = Path::new("/var/log/app.log");
        assert_eq!(path_to_key(path), "/var/log/app.log");
    }
}
