// SPDX-License-Identifier: Apache-2.0

//! End to end behavior of the scan loop against real files on disk.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use ratchet_agent::receivers::file::{
    Event, EventKind, EventSink, FileReceiverConfig, PositionStore, Scanner,
};
use tempfile::TempDir;
use tower::BoxError;

#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// (level, title, body) of every message, ignoring the source path
    fn messages(&self) -> Vec<(Option<String>, Option<String>, String)> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == EventKind::Message)
            .map(|e| (e.level, e.title, e.body))
            .collect()
    }
}

impl EventSink for RecordingSink {
    async fn dispatch(&self, event: &Event) -> Result<(), BoxError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn config(dir: &Path, files: &[PathBuf]) -> FileReceiverConfig {
    FileReceiverConfig {
        files: files.to_vec(),
        state_path: dir.join("state.json"),
        scan_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

fn append(path: &Path, content: &str) {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.sync_all().unwrap();
}

/// Every file looks idle from here
fn idle_time() -> SystemTime {
    SystemTime::now() + Duration::from_secs(60)
}

/// No file looks idle from here
fn busy_time() -> SystemTime {
    SystemTime::now() - Duration::from_secs(60)
}

fn stored_offset(dir: &Path, path: &Path) -> Option<u64> {
    PositionStore::open(dir.join("state.json"))
        .unwrap()
        .get(path)
        .map(|c| c.offset)
}

const TWO_ENTRIES: &str = "2021-01-01 10:00:00,000 INFO first message\n\
continuation line\n\
2021-01-01 10:00:05,000 ERROR second message\n";

#[tokio::test]
async fn two_entries_become_two_events() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("app.log");
    append(&log, TWO_ENTRIES);

    let sink = RecordingSink::default();
    let mut scanner = Scanner::new(config(dir.path(), &[log.clone()]), sink.clone()).unwrap();
    scanner.scan_all(idle_time()).await.unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 2);

    assert_eq!(events[0].level.as_deref(), Some("INFO"));
    assert_eq!(events[0].title.as_deref(), Some("first message"));
    assert_eq!(
        events[0].body,
        "2021-01-01 10:00:00,000 INFO first message\ncontinuation line\n"
    );
    assert_eq!(events[0].source, log);

    assert_eq!(events[1].level.as_deref(), Some("ERROR"));
    assert_eq!(events[1].title.as_deref(), Some("second message"));
    assert_eq!(
        events[1].body,
        "2021-01-01 10:00:05,000 ERROR second message\n"
    );

    assert_eq!(stored_offset(dir.path(), &log), Some(TWO_ENTRIES.len() as u64));
}

#[tokio::test]
async fn chunked_appends_match_whole_file() {
    let content = "2021-01-01 10:00:00,000 INFO starting worker\n\
  pool size 4\n\
2021-01-01 10:00:01,000 WARNING slow request\n\
2021-01-01 10:00:02,000 ERROR request failed\n\
Traceback (most recent call last):\n\
  File \"app.py\", line 10, in handle\n\
ValueError: bad input\n\
2021-01-01 10:00:03,000 INFO recovered\n";

    // Whole file in a single pass
    let whole_dir = TempDir::new().unwrap();
    let whole_log = whole_dir.path().join("app.log");
    append(&whole_log, content);
    let whole_sink = RecordingSink::default();
    let mut whole = Scanner::new(
        config(whole_dir.path(), &[whole_log.clone()]),
        whole_sink.clone(),
    )
    .unwrap();
    whole.scan_all(idle_time()).await.unwrap();

    // Same bytes appended in uneven chunks, some splitting lines, one pass
    // per chunk
    let chunked_dir = TempDir::new().unwrap();
    let chunked_log = chunked_dir.path().join("app.log");
    let chunked_sink = RecordingSink::default();
    let mut chunked = Scanner::new(
        config(chunked_dir.path(), &[chunked_log.clone()]),
        chunked_sink.clone(),
    )
    .unwrap();

    let bytes = content.as_bytes();
    let cuts = [7, 45, 46, 90, 133, 200, 230, bytes.len()];
    let mut start = 0;
    for cut in cuts {
        let cut = cut.min(bytes.len());
        append(&chunked_log, std::str::from_utf8(&bytes[start..cut]).unwrap());
        chunked.scan_all(busy_time()).await.unwrap();
        start = cut;
    }
    chunked.scan_all(idle_time()).await.unwrap();

    assert_eq!(whole_sink.messages().len(), 4);
    assert_eq!(chunked_sink.messages(), whole_sink.messages());
}

#[tokio::test]
async fn offsets_only_move_forward_by_consumed_bytes() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("app.log");
    let sink = RecordingSink::default();
    let mut scanner = Scanner::new(config(dir.path(), &[log.clone()]), sink.clone()).unwrap();

    let appends = [
        "2021-01-01 10:00:00,000 INFO one\n",
        "partial without newline",
        " finished\n",
        "2021-01-01 10:00:01,000 INFO two\nmore\n",
    ];

    let mut complete = 0u64;
    let mut written = String::new();
    let mut previous = 0u64;
    for chunk in appends {
        append(&log, chunk);
        written.push_str(chunk);
        complete = written.rfind('\n').map(|i| i as u64 + 1).unwrap_or(complete);

        scanner.scan_all(busy_time()).await.unwrap();
        let offset = stored_offset(dir.path(), &log).unwrap();

        assert!(offset >= previous);
        // A partial line is left for a later pass while the file is active
        assert_eq!(offset, complete);
        previous = offset;
    }
}

#[tokio::test]
async fn rotation_flushes_pending_and_restarts_at_zero() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("app.log");
    append(
        &log,
        "2021-01-01 10:00:00,000 ERROR before rotation\n  detail line\n",
    );

    let sink = RecordingSink::default();
    let mut scanner = Scanner::new(config(dir.path(), &[log.clone()]), sink.clone()).unwrap();

    // Still being written, so the message stays pending
    scanner.scan_all(busy_time()).await.unwrap();
    assert!(sink.events().is_empty());

    // Move the old file aside so the new one cannot reuse its inode
    fs::rename(&log, dir.path().join("app.log.1")).unwrap();
    append(&log, "2021-01-01 11:00:00,000 INFO after rotation\n");

    scanner.scan_all(idle_time()).await.unwrap();

    let messages = sink.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].1.as_deref(), Some("before rotation"));
    assert_eq!(
        messages[0].2,
        "2021-01-01 10:00:00,000 ERROR before rotation\n  detail line\n"
    );
    assert_eq!(messages[1].1.as_deref(), Some("after rotation"));

    let new_len = fs::metadata(&log).unwrap().len();
    assert_eq!(stored_offset(dir.path(), &log), Some(new_len));
}

#[tokio::test]
async fn truncation_restarts_at_zero() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("app.log");
    append(&log, TWO_ENTRIES);

    let sink = RecordingSink::default();
    let mut scanner = Scanner::new(config(dir.path(), &[log.clone()]), sink.clone()).unwrap();
    scanner.scan_all(idle_time()).await.unwrap();
    assert_eq!(sink.events().len(), 2);

    // copytruncate style rotation keeps the inode
    let f = OpenOptions::new().write(true).open(&log).unwrap();
    f.set_len(0).unwrap();
    drop(f);
    append(&log, "2021-01-01 12:00:00,000 INFO fresh\n");

    scanner.scan_all(idle_time()).await.unwrap();

    let messages = sink.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].1.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn missing_file_keeps_its_stored_cursor() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("app.log");
    append(&log, TWO_ENTRIES);

    let sink = RecordingSink::default();
    let mut scanner = Scanner::new(config(dir.path(), &[log.clone()]), sink.clone()).unwrap();
    scanner.scan_all(idle_time()).await.unwrap();

    let before = PositionStore::open(dir.path().join("state.json"))
        .unwrap()
        .get(&log)
        .unwrap();

    fs::remove_file(&log).unwrap();
    let summary = scanner.scan_all(idle_time()).await.unwrap();
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.scanned, 0);

    let after = PositionStore::open(dir.path().join("state.json"))
        .unwrap()
        .get(&log)
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn restart_resumes_offset_and_pending_message() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("app.log");
    append(
        &log,
        "2021-01-01 10:00:00,000 ERROR crashed\nTraceback (most recent call last):\n",
    );

    {
        let sink = RecordingSink::default();
        let mut scanner =
            Scanner::new(config(dir.path(), &[log.clone()]), sink.clone()).unwrap();
        scanner.scan_all(busy_time()).await.unwrap();
        assert!(sink.events().is_empty());
    }

    append(
        &log,
        "ValueError: bad input\n2021-01-01 10:00:01,000 INFO restarted\n",
    );

    let sink = RecordingSink::default();
    let mut scanner = Scanner::new(config(dir.path(), &[log.clone()]), sink.clone()).unwrap();
    scanner.scan_all(idle_time()).await.unwrap();

    let messages = sink.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[0].2,
        "2021-01-01 10:00:00,000 ERROR crashed\n\
Traceback (most recent call last):\n\
ValueError: bad input\n"
    );
    assert_eq!(messages[1].1.as_deref(), Some("restarted"));
}

#[tokio::test]
async fn passthrough_and_aggregated_files_share_a_pass() {
    let dir = TempDir::new().unwrap();
    let items = dir.path().join("items.ratchet");
    let log = dir.path().join("app.log");
    append(&items, "{\"a\":1}\nnot json\n\n");
    append(&log, "2021-01-01 10:00:00,000 INFO hello\n");

    let sink = RecordingSink::default();
    let mut scanner = Scanner::new(
        config(dir.path(), &[items.clone(), log.clone()]),
        sink.clone(),
    )
    .unwrap();
    let summary = scanner.scan_all(idle_time()).await.unwrap();

    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.dispatched, 3);

    let events = sink.events();
    assert_eq!(events[0].kind, EventKind::Passthrough);
    assert_eq!(events[0].body, "{\"a\":1}");
    assert_eq!(events[1].kind, EventKind::Passthrough);
    assert_eq!(events[1].body, "not json");
    assert_eq!(events[2].kind, EventKind::Message);
    assert_eq!(events[2].source, log);
}

#[tokio::test]
async fn unreadable_path_does_not_stop_the_pass() {
    let dir = TempDir::new().unwrap();
    // A directory where a log is expected fails on read, not on lookup
    let bad = dir.path().join("bad.log");
    fs::create_dir(&bad).unwrap();
    let good = dir.path().join("good.log");
    append(&good, "2021-01-01 10:00:00,000 INFO still shipped\n");

    let sink = RecordingSink::default();
    let mut scanner = Scanner::new(
        config(dir.path(), &[bad.clone(), good.clone()]),
        sink.clone(),
    )
    .unwrap();
    let summary = scanner.scan_all(idle_time()).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.missing, 0);
    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(sink.messages()[0].1.as_deref(), Some("still shipped"));

    assert_eq!(stored_offset(dir.path(), &bad), None);
    assert!(stored_offset(dir.path(), &good).is_some());
}
