// SPDX-License-Identifier: Apache-2.0

//! The scan loop.
//!
//! Once per tick every configured path is visited in order:
//! - stat the file, skipping the path if it is missing
//! - compare the stored fingerprint and offset against the stat to detect
//!   rotation or truncation, restarting from offset 0 when either happened
//! - read the new lines, hand them to the path's processor and dispatch the
//!   completed events
//! - store the new offset and pending message
//!
//! File reads run on the blocking pool so a slow disk does not stall the
//! runtime. Paths are still handled strictly one after another.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::select;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{debug, error, info, warn};

use crate::receivers::file::config::FileReceiverConfig;
use crate::receivers::file::cursor::{CursorTransition, FileCursor};
use crate::receivers::file::error::{Error, Result};
use crate::receivers::file::event::{Event, EventKind, PendingEvent};
use crate::receivers::file::input::{FileReader, FileStat, ReadChunk};
use crate::receivers::file::parser::{FormatRegistry, Level};
use crate::receivers::file::persistence::PositionStore;
use crate::receivers::file::processor::{IdleCheck, LineProcessor, ProcessContext};

/// Destination for completed events.
pub trait EventSink: Send + Sync + 'static {
    /// Deliver one event. Failures are reported back but never retried.
    fn dispatch(&self, event: &Event) -> impl Future<Output = std::result::Result<(), BoxError>> + Send;
}

/// Counters for one scan pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Paths that were read
    pub scanned: usize,
    /// Paths skipped because the file did not exist
    pub missing: usize,
    /// Paths that failed and were left untouched
    pub failed: usize,
    pub dispatched: usize,
    pub dispatch_failures: usize,
    /// Aggregated events dropped by the minimum level
    pub filtered: usize,
    /// Paths not visited because shutdown was requested mid-pass
    pub deferred: usize,
}

struct WatchedFile {
    path: PathBuf,
    processor: LineProcessor,
}

/// Everything learned from one path during a tick, before any event leaves.
struct PathRead {
    cursor: FileCursor,
    stat: FileStat,
    /// Pending message of the file that used to be at the path
    leftover: Option<PendingEvent>,
    chunk: ReadChunk,
    idle: bool,
}

pub struct Scanner<S> {
    config: FileReceiverConfig,
    files: Vec<Arc<WatchedFile>>,
    sink: S,
    /// Opened lazily and dropped after a failed write so the next pass
    /// reloads it from disk
    store: Option<PositionStore>,
}

impl<S: EventSink> Scanner<S> {
    /// Create a scanner backed by the store at `config.state_path`.
    pub fn new(config: FileReceiverConfig, sink: S) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        let formats = FormatRegistry::from_config(&config.formats)?;

        let files = config
            .files
            .iter()
            .map(|path| {
                let processor =
                    LineProcessor::select(path, &config.passthrough_extension, &formats);
                debug!(
                    path = ?path,
                    processor = processor.name(),
                    format = processor.format_name(),
                    "Watching file"
                );
                Arc::new(WatchedFile {
                    path: path.clone(),
                    processor,
                })
            })
            .collect();

        Ok(Self {
            config,
            files,
            sink,
            store: None,
        })
    }

    /// Use an already opened store instead of opening `config.state_path`.
    pub fn with_store(mut self, store: PositionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store(&self) -> Option<&PositionStore> {
        self.store.as_ref()
    }

    /// Scan until cancelled, sleeping `scan_interval` between passes.
    pub async fn run(mut self, cancel: CancellationToken) -> std::result::Result<(), BoxError> {
        info!(
            files = ?self.config.files,
            interval = ?self.config.scan_interval,
            state_path = ?self.config.state_path,
            "Starting file scanner"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.scan_until(SystemTime::now(), &cancel).await {
                Ok(summary) => debug!(?summary, "Scan pass complete"),
                Err(e) => error!(error = %e, "Scan pass abandoned"),
            }

            select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.scan_interval) => {}
            }
        }

        info!("File scanner stopped");
        Ok(())
    }

    /// One pass over every configured path.
    ///
    /// Problems with a single file are logged and counted. An error is only
    /// returned when the position store cannot be opened or written, in which
    /// case the rest of the pass is abandoned.
    pub async fn scan_all(&mut self, scan_start: SystemTime) -> Result<ScanSummary> {
        self.scan_until(scan_start, &CancellationToken::new()).await
    }

    /// Like [`Scanner::scan_all`], but stops between paths once `cancel`
    /// fires. A path that was started is always read, dispatched and
    /// stored before the pass returns.
    pub async fn scan_until(
        &mut self,
        scan_start: SystemTime,
        cancel: &CancellationToken,
    ) -> Result<ScanSummary> {
        let mut store = match self.store.take() {
            Some(store) => store,
            None => PositionStore::open(&self.config.state_path)?,
        };

        let mut summary = ScanSummary::default();
        let files = self.files.clone();
        for (idx, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.deferred = files.len() - idx;
                debug!(remaining = summary.deferred, "Shutdown requested, ending scan pass early");
                break;
            }
            self.scan_path(file, &mut store, scan_start, &mut summary).await?;
        }

        self.store = Some(store);
        Ok(summary)
    }

    async fn scan_path(
        &self,
        file: &WatchedFile,
        store: &mut PositionStore,
        scan_start: SystemTime,
        summary: &mut ScanSummary,
    ) -> Result<()> {
        let stored = store.get(&file.path);
        let idle_check = IdleCheck {
            scan_start,
            threshold: self.config.idle_flush_threshold,
        };

        let read = {
            let path = file.path.clone();
            let stored = stored.clone();
            let max_line_size = self.config.max_line_size;
            tokio::task::spawn_blocking(move || read_path(&path, stored, idle_check, max_line_size))
                .await
                .map_err(|e| Error::Io(io::Error::other(e)))?
        };

        let PathRead {
            mut cursor,
            stat,
            leftover,
            chunk,
            idle,
        } = match read {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = ?file.path, "File not found, skipping");
                summary.missing += 1;
                return Ok(());
            }
            Err(e) => {
                warn!(path = ?file.path, error = %e, "Failed to read file, will retry next pass");
                summary.failed += 1;
                return Ok(());
            }
        };

        if let Some(leftover) = leftover {
            debug!(path = ?file.path, "Flushing message left from the previous file");
            self.dispatch(leftover.into_event(&file.path), summary)
                .await;
        }

        let ctx = ProcessContext {
            now: epoch_secs(scan_start),
            idle,
        };
        let end_offset = chunk.end_offset;
        let output = file.processor.process(
            &file.path,
            chunk.lines,
            cursor.pending_message.take(),
            &ctx,
        );

        for event in output.events {
            self.dispatch(event, summary).await;
        }

        cursor.advance(end_offset, &stat, output.pending);
        summary.scanned += 1;

        if stored.as_ref() != Some(&cursor) {
            store.put(&cursor)?;
            debug!(path = ?file.path, offset = cursor.offset, "Stored file position");
        }

        Ok(())
    }

    async fn dispatch(&self, event: Event, summary: &mut ScanSummary) {
        if event.kind == EventKind::Message
            && !Level::admits(self.config.min_level, event.level.as_deref())
        {
            summary.filtered += 1;
            return;
        }

        match self.sink.dispatch(&event).await {
            Ok(()) => summary.dispatched += 1,
            Err(e) => {
                warn!(
                    path = ?event.source,
                    error = %e,
                    "Failed to dispatch event, dropping it"
                );
                summary.dispatch_failures += 1;
            }
        }
    }
}

/// Stat the file behind `path`, reconcile it with the stored cursor and
/// read everything appended since.
fn read_path(
    path: &Path,
    stored: Option<FileCursor>,
    idle_check: IdleCheck,
    max_line_size: usize,
) -> io::Result<PathRead> {
    let mut reader = FileReader::open(path, max_line_size)?;
    let stat = *reader.stat();

    let (cursor, leftover) = match stored {
        None => {
            info!(path = ?path, file_id = %stat.file_id, "Started tracking file");
            (FileCursor::new(path, &stat), None)
        }
        Some(mut cursor) => match cursor.transition(&stat) {
            CursorTransition::Continue => (cursor, None),
            CursorTransition::Rotated => {
                info!(
                    path = ?path,
                    previous = %cursor.fingerprint,
                    current = %stat.file_id,
                    "File rotated, reading from the start"
                );
                let leftover = cursor.reset(&stat);
                (cursor, leftover)
            }
            CursorTransition::Truncated => {
                info!(
                    path = ?path,
                    offset = cursor.offset,
                    size = stat.size,
                    "File truncated, reading from the start"
                );
                let leftover = cursor.reset(&stat);
                (cursor, leftover)
            }
        },
    };

    let idle = idle_check.is_idle(stat.mtime);
    let chunk = reader.read_lines_from(cursor.offset, idle)?;

    Ok(PathRead {
        cursor,
        stat,
        leftover,
        chunk,
        idle,
    })
}

fn epoch_secs(time: SystemTime) -> i64 {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
