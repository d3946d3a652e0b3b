// SPDX-License-Identifier: Apache-2.0

//! File receiver for tailing log files.
//!
//! This receiver scans a fixed list of files on a timer, reads the lines
//! appended since the last scan, reassembles multi-line messages and hands
//! each completed event to an [`EventSink`].
//!
//! Features:
//! - Inode-based rotation and truncation detection
//! - Offset and pending message persistence for resume after restarts
//! - Passthrough of pre-serialized JSON lines
//! - Pylons, Python and Rails line formats plus user defined regex formats

pub mod config;
pub mod cursor;
pub mod error;
pub mod event;
pub mod input;
pub mod parser;
pub mod persistence;
pub mod processor;
pub mod receiver;
pub mod scanner;

pub use config::{CustomFormat, FileReceiverConfig, FormatConfig};
pub use cursor::FileCursor;
pub use error::{Error, Result};
pub use event::{Event, EventKind, PendingEvent};
pub use input::{FileId, FileReader};
pub use parser::{FormatRegistry, Level};
pub use persistence::PositionStore;
pub use processor::LineProcessor;
pub use receiver::FileReceiver;
pub use scanner::{EventSink, ScanSummary, Scanner};
