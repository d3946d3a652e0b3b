// SPDX-License-Identifier: Apache-2.0

//! JSON file-based position store with atomic writes.
//!
//! Every `put` rewrites the document through a temp file that is renamed
//! over the previous one, so a process starting after a crash sees either
//! the old document or the new one, never a mix.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::schema::{PERSISTED_STATE_VERSION, PersistedCursorV1, PersistedStateV1, path_to_key};
use crate::receivers::file::cursor::FileCursor;
use crate::receivers::file::error::{Error, Result};

/// Durable map from watched path to its [`FileCursor`].
///
/// There is a single writer, the scanner, so no locking is done here.
#[derive(Debug)]
pub struct PositionStore {
    path: PathBuf,
    state: PersistedStateV1,
}

impl PositionStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let file = File::open(&path)
                .map_err(|e| Error::Persistence(format!("failed to open state file: {}", e)))?;
            let state: PersistedStateV1 = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| {
                    Error::Persistence(format!(
                        "state file is corrupted and cannot be loaded: {}. \
                         To start fresh, delete the state file and restart.",
                        e
                    ))
                })?;

            if state.version != PERSISTED_STATE_VERSION {
                return Err(Error::Persistence(format!(
                    "unsupported state file version {}",
                    state.version
                )));
            }
            state
        } else {
            PersistedStateV1::default()
        };

        debug!(path = ?path, files = state.files.len(), "Opened position store");

        Ok(Self { path, state })
    }

    /// Create an in-memory store (useful for testing)
    pub fn open_memory() -> Self {
        Self {
            path: PathBuf::new(),
            state: PersistedStateV1::default(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<FileCursor> {
        self.state
            .files
            .get(&path_to_key(path))
            .cloned()
            .map(|entry| entry.into_cursor(path))
    }

    /// Store the cursor under its path and write the document to disk.
    /// Entries for other paths are left as they are.
    pub fn put(&mut self, cursor: &FileCursor) -> Result<()> {
        let key = path_to_key(cursor.path());
        let previous = self
            .state
            .files
            .insert(key.clone(), PersistedCursorV1::from(cursor));

        if let Err(e) = self.flush() {
            // Keep memory in line with what is on disk
            match previous {
                Some(entry) => self.state.files.insert(key, entry),
                None => self.state.files.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.files.is_empty()
    }

    fn flush(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(()); // In-memory mode, nothing to flush
        }
        atomic_write(&self.path, &self.state)
    }
}

/// Write state to file atomically (write to temp, then rename)
fn atomic_write(path: &Path, state: &PersistedStateV1) -> Result<()> {
    use portable_atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("failed to create parent directory: {}", e))
            })?;
        }
    }

    // Process ID plus counter keeps temp names unique across writers
    let unique_id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let temp_path = path.with_extension(format!("tmp.{}.{}", std::process::id(), unique_id));

    let file = File::create(&temp_path)
        .map_err(|e| Error::Persistence(format!("failed to create temp file: {}", e)))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, state)
        .map_err(|e| Error::Persistence(format!("failed to write state: {}", e)))?;

    writer
        .flush()
        .map_err(|e| Error::Persistence(format!("failed to flush state: {}", e)))?;
    let file = writer
        .into_inner()
        .map_err(|e| Error::Persistence(format!("failed to flush state: {}", e)))?;
    file.sync_all()
        .map_err(|e| Error::Persistence(format!("failed to sync state: {}", e)))?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::Persistence(format!(
            "failed to rename state file: {}",
            e
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receivers::file::event::PendingEvent;
    use crate::receivers::file::input::FileId;

    fn cursor(path: &str, offset: u64) -> FileCursor {
        FileCursor {
            path: PathBuf::from(path),
            offset,
            fingerprint: FileId::new(1, offset),
            mtime: 100,
            pending_message: None,
        }
    }

    #[test]
    fn test_get_put_memory() {
        let mut store = PositionStore::open_memory();
        assert!(store.is_empty());
        assert!(store.get(Path::new("/var/log/a.log")).is_none());

        store.put(&cursor("/var/log/a.log", 10)).unwrap();
        store.put(&cursor("/var/log/b.log", 20)).unwrap();
        store.put(&cursor("/var/log/a.log", 30)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(Path::new("/var/log/a.log")).unwrap().offset, 30);
        assert_eq!(store.get(Path::new("/var/log/b.log")).unwrap().offset, 20);
    }

    #[test]
    fn test_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("state.json");

        let mut pending = PendingEvent::untimed(5);
        pending.push_line("partial message\n");

        {
            let mut store = PositionStore::open(&db_path).unwrap();
            let mut c = cursor("/var/log/a.log", 12345);
            c.pending_message = Some(pending.clone());
            store.put(&c).unwrap();
            store.put(&cursor("/var/log/b.log", 7)).unwrap();
        }

        let store = PositionStore::open(&db_path).unwrap();
        let a = store.get(Path::new("/var/log/a.log")).unwrap();
        assert_eq!(a.offset, 12345);
        assert_eq!(a.fingerprint, FileId::new(1, 12345));
        assert_eq!(a.pending_message, Some(pending));
        assert_eq!(store.get(Path::new("/var/log/b.log")).unwrap().offset, 7);

        assert_eq!(store.len(), 2);
        assert!(store.get(Path::new("/var/log/c.log")).is_none());
    }

    #[test]
    fn test_put_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("state.json");

        let mut store = PositionStore::open(&db_path).unwrap();
        store.put(&cursor("/var/log/a.log", 1)).unwrap();
        store.put(&cursor("/var/log/a.log", 2)).unwrap();

        let entries: Vec<_> = fs::read_dir(db_path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn test_open_fails_on_corrupted_state_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("state.json");
        fs::write(&db_path, "not valid json {{{").unwrap();

        let err = PositionStore::open(&db_path).unwrap_err();
        assert!(err.to_string().contains("corrupted"), "{}", err);
    }

    #[test]
    fn test_open_fails_on_unknown_version() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("state.json");
        fs::write(&db_path, r#"{"version": 9, "files": {}}"#).unwrap();

        assert!(PositionStore::open(&db_path).is_err());
    }

    #[test]
    fn test_failed_write_keeps_previous_entry() {
        let temp_dir = tempfile::tempdir().unwrap();
        // A directory in place of the state file makes the rename fail
        let db_path = temp_dir.path().join("state.json");

        let mut store = PositionStore::open(&db_path).unwrap();
        store.put(&cursor("/var/log/a.log", 1)).unwrap();

        fs::remove_file(&db_path).unwrap();
        fs::create_dir(&db_path).unwrap();
        fs::write(db_path.join("occupied"), "x").unwrap();

        assert!(store.put(&cursor("/var/log/a.log", 2)).is_err());
        assert_eq!(store.get(Path::new("/var/log/a.log")).unwrap().offset, 1);

        assert!(store.put(&cursor("/var/log/new.log", 3)).is_err());
        assert!(store.get(Path::new("/var/log/new.log")).is_none());
    }
}
