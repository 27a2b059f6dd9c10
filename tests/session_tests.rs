//! End-to-end session tests over in-memory transports and stores.

use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use locflow::cli::ConsoleSink;
use locflow::transport::SplitTransport;
use locflow::{
    ChunkSource, Location, Session, SessionConfig, SessionError, SqliteStore, StatusMessage,
    StatusSink, Store, StoreError, StreamTransport, TransportError, run_session,
};

const HEADER: &str = "LOCID,LOCTIMEZONE,COUNTRY,LOCNAME,BUSINESS";

// --- Test doubles ---

/// Replays a fixed list of chunks, then optionally stalls (an idle peer) or fails.
struct ScriptedSource {
    chunks: std::vec::IntoIter<Vec<u8>>,
    fail_at_end: bool,
    stall: Option<Duration>,
}

impl ScriptedSource {
    fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into_iter(),
            fail_at_end: false,
            stall: None,
        }
    }

    fn failing(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            fail_at_end: true,
            ..Self::new(chunks)
        }
    }

    fn stalling(chunks: Vec<Vec<u8>>, stall: Duration) -> Self {
        Self {
            stall: Some(stall),
            ..Self::new(chunks)
        }
    }
}

impl ChunkSource for ScriptedSource {
    fn read_next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(chunk) = self.chunks.next() {
            return Ok(Some(chunk));
        }
        if let Some(stall) = self.stall.take() {
            thread::sleep(stall);
        }
        if self.fail_at_end {
            return Err(TransportError::Read(io::Error::other("link down")));
        }
        Ok(None)
    }
}

/// Collects every status message and counts closes.
#[derive(Clone, Default)]
struct RecordingSink {
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<StatusMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|t| serde_json::from_str(t).unwrap())
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts upsert calls; fails the calls numbered in `fail_on` (1-based). Successful calls take
/// `delay`.
#[derive(Default)]
struct CountingStore {
    calls: AtomicUsize,
    rows: AtomicUsize,
    fail_on: Vec<usize>,
    delay: Duration,
    seen: Mutex<Vec<Location>>,
}

impl CountingStore {
    fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            ..Default::default()
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Store for CountingStore {
    fn upsert(&self, batch: &[Location]) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(StoreError::Unavailable("disk full".into()));
        }
        thread::sleep(self.delay);
        self.rows.fetch_add(batch.len(), Ordering::SeqCst);
        self.seen.lock().unwrap().extend_from_slice(batch);
        Ok(())
    }
}

/// Panics on every upsert.
struct PanickingStore;

impl Store for PanickingStore {
    fn upsert(&self, _batch: &[Location]) -> Result<(), StoreError> {
        panic!("store exploded");
    }
}

/// Yields `data` in one read, then fails with `kind`.
struct BrokenReader {
    data: Option<Vec<u8>>,
    kind: io::ErrorKind,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.take() {
            Some(data) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            None => Err(io::Error::from(self.kind)),
        }
    }
}

/// Shared in-memory writer for StreamTransport.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// --- Helpers ---

fn csv(rows: usize) -> String {
    let mut out = format!("{HEADER}\n");
    for i in 0..rows {
        out.push_str(&format!("LOC{i:04},Asia/Tokyo,Japan,Lakeside,EduWise\n"));
    }
    out
}

/// Split `text` into chunks of uneven sizes so lines straddle chunk boundaries.
fn ragged_chunks(text: &str) -> Vec<Vec<u8>> {
    let bytes = text.as_bytes();
    let sizes = [1, 7, 3, 64, 13, 2, 29];
    let mut chunks = Vec::new();
    let mut pos = 0;
    let mut i = 0;
    while pos < bytes.len() {
        let end = (pos + sizes[i % sizes.len()]).min(bytes.len());
        chunks.push(bytes[pos..end].to_vec());
        pos = end;
        i += 1;
    }
    chunks
}

fn config(batch_size: usize, worker_count: usize) -> SessionConfig {
    SessionConfig {
        batch_size,
        worker_count,
        queue_capacity: 2,
    }
}

fn transport(
    source: ScriptedSource,
    sink: &RecordingSink,
) -> SplitTransport<ScriptedSource, RecordingSink> {
    SplitTransport::new(source, sink.clone())
}

fn assert_single_terminal_last(msgs: &[StatusMessage]) {
    let terminals = msgs.iter().filter(|m| m.is_terminal()).count();
    assert_eq!(terminals, 1, "messages: {msgs:?}");
    assert!(msgs.last().is_some_and(StatusMessage::is_terminal));
}

// --- Scenarios ---

#[test]
fn test_session_writes_all_rows_in_batches() {
    let batch = 10;
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let source = ScriptedSource::new(ragged_chunks(&csv(2 * batch + 1)));

    let report = run_session(transport(source, &sink), Arc::clone(&store), &config(batch, 3)).unwrap();

    assert_eq!(report.rows_written, 2 * batch + 1);
    assert_eq!(report.batches_written, 3);
    assert_eq!(report.rows_skipped, 0);
    assert_eq!(report.lines_seen, 2 * batch + 2);
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.rows.load(Ordering::SeqCst), 2 * batch + 1);

    let msgs = sink.messages();
    assert_single_terminal_last(&msgs);
    assert_eq!(
        msgs.last(),
        Some(&StatusMessage::Complete {
            rows: 2 * batch + 1,
            message: "CSV processed successfully".to_string()
        })
    );
    assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_session_progress_is_monotonic_and_bounded() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let source = ScriptedSource::new(ragged_chunks(&csv(200)));

    run_session(transport(source, &sink), store, &config(7, 4)).unwrap();

    let progress: Vec<usize> = sink
        .messages()
        .into_iter()
        .filter_map(|m| match m {
            StatusMessage::Progress { rows } => Some(rows),
            _ => None,
        })
        .collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
    assert!(progress.iter().all(|&r| r <= 200));
}

#[test]
fn test_session_records_reach_store_intact() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let text = "BUSINESS,LOCNAME,COUNTRY,LOCTIMEZONE,LOCID\nCoffeeCo, Rivertown ,UK,Europe/London,LOC7";
    let source = ScriptedSource::new(ragged_chunks(text));

    run_session(transport(source, &sink), Arc::clone(&store), &config(5, 1)).unwrap();

    let seen = store.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![Location {
            loc_id: "LOC7".to_string(),
            loc_timezone: "Europe/London".to_string(),
            country: "UK".to_string(),
            loc_name: "Rivertown".to_string(),
            business: "CoffeeCo".to_string(),
        }]
    );
}

#[test]
fn test_session_store_failure_reports_one_error() {
    let batch = 5;
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::failing_on(&[3]));
    let source = ScriptedSource::new(ragged_chunks(&csv(10 * batch)));

    let err = run_session(transport(source, &sink), Arc::clone(&store), &config(batch, 1))
        .unwrap_err();

    assert!(matches!(err, SessionError::Store(_)), "{err}");
    // A single worker stops at the failing call.
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.rows.load(Ordering::SeqCst), 2 * batch);

    let msgs = sink.messages();
    assert_single_terminal_last(&msgs);
    match msgs.last() {
        Some(StatusMessage::Error { message }) => assert!(message.contains("disk full")),
        other => panic!("expected error message, got {other:?}"),
    }
    assert!(!msgs.iter().any(|m| matches!(m, StatusMessage::Complete { .. })));
    assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_session_empty_stream_is_invalid_header() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let source = ScriptedSource::new(Vec::new());

    let err = run_session(transport(source, &sink), Arc::clone(&store), &config(10, 2))
        .unwrap_err();

    assert!(matches!(err, SessionError::InvalidHeader(_)));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    let msgs = sink.messages();
    assert_eq!(msgs.len(), 1);
    assert!(matches!(msgs[0], StatusMessage::Error { .. }));
}

#[test]
fn test_session_short_header_stops_before_store() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let text = "LOCID,COUNTRY\nLOC1,Japan\nLOC2,Japan\n";
    let source = ScriptedSource::new(ragged_chunks(text));

    let err = run_session(transport(source, &sink), Arc::clone(&store), &config(1, 2))
        .unwrap_err();

    assert!(matches!(err, SessionError::InvalidHeader(_)));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert_single_terminal_last(&sink.messages());
}

#[test]
fn test_session_skips_short_rows() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let text = format!(
        "{HEADER}\nLOC1,Asia/Tokyo\nLOC2,Asia/Tokyo,Japan,Lakeside,EduWise\n\n"
    );
    let source = ScriptedSource::new(ragged_chunks(&text));

    let report = run_session(transport(source, &sink), Arc::clone(&store), &config(10, 2)).unwrap();

    assert_eq!(report.rows_written, 1);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(report.lines_seen, 3);
    assert_eq!(store.seen.lock().unwrap()[0].loc_id, "LOC2");
}

#[test]
fn test_session_header_only_completes_with_zero_rows() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let source = ScriptedSource::new(vec![HEADER.as_bytes().to_vec()]);

    let report = run_session(transport(source, &sink), Arc::clone(&store), &config(10, 2)).unwrap();

    assert_eq!(report.rows_written, 0);
    assert_eq!(report.batches_written, 0);
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert!(matches!(
        sink.messages().as_slice(),
        [StatusMessage::Complete { rows: 0, .. }]
    ));
}

#[test]
fn test_session_unterminated_last_row_is_written() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let text = format!("{HEADER}\nLOC1,Asia/Tokyo,Japan,Lakeside,EduWise");
    let source = ScriptedSource::new(ragged_chunks(&text));

    let report = run_session(transport(source, &sink), store, &config(10, 1)).unwrap();
    assert_eq!(report.rows_written, 1);
}

#[test]
fn test_session_invalid_config_is_rejected() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let source = ScriptedSource::new(ragged_chunks(&csv(3)));

    let err = run_session(transport(source, &sink), Arc::clone(&store), &config(0, 1))
        .unwrap_err();

    assert!(matches!(err, SessionError::Config(_)));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert!(matches!(
        sink.messages().as_slice(),
        [StatusMessage::Error { .. }]
    ));
    assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_session_read_error_fails_session() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let source = ScriptedSource::failing(ragged_chunks(&csv(3)));

    let err = run_session(transport(source, &sink), store, &config(10, 1)).unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    let msgs = sink.messages();
    assert_single_terminal_last(&msgs);
    assert!(matches!(msgs.last(), Some(StatusMessage::Error { .. })));
}

#[test]
fn test_session_cancelled_before_run() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::default());
    let source = ScriptedSource::new(ragged_chunks(&csv(50)));

    let session = Session::new(&config(5, 2));
    session
        .latch()
        .record(SessionError::Cancelled("interrupted".into()));
    let err = session
        .run(transport(source, &sink), Arc::clone(&store))
        .unwrap_err();

    assert!(matches!(err, SessionError::Cancelled(_)));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    let msgs = sink.messages();
    assert_single_terminal_last(&msgs);
    match msgs.last() {
        Some(StatusMessage::Error { message }) => assert!(message.contains("interrupted")),
        other => panic!("expected error message, got {other:?}"),
    }
}

#[test]
fn test_stream_transport_into_sqlite() {
    let out = SharedBuf::default();
    let input = Cursor::new(csv(25).into_bytes());
    let transport = StreamTransport::new(input, out.clone()).with_chunk_size(17);
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let report = run_session(transport, Arc::clone(&store), &config(4, 3)).unwrap();

    assert_eq!(report.rows_written, 25);
    assert_eq!(store.location_count().unwrap(), 25);

    let written = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
    let msgs: Vec<StatusMessage> = written
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_single_terminal_last(&msgs);
    assert!(matches!(
        msgs.last(),
        Some(StatusMessage::Complete { rows: 25, .. })
    ));
}

#[test]
fn test_same_input_twice_leaves_same_store() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    for _ in 0..2 {
        let transport = StreamTransport::new(Cursor::new(csv(12).into_bytes()), io::sink());
        run_session(transport, Arc::clone(&store), &config(5, 2)).unwrap();
    }
    assert_eq!(store.location_count().unwrap(), 12);
}

#[test]
fn test_session_store_failure_with_many_workers_reports_one_error() {
    let batch = 2;
    let workers = 4;
    let sink = RecordingSink::default();
    let store =
        Arc::new(CountingStore::failing_on(&[2, 3]).with_delay(Duration::from_millis(20)));
    let source = ScriptedSource::new(ragged_chunks(&csv(40 * batch)));

    let err = run_session(transport(source, &sink), Arc::clone(&store), &config(batch, workers))
        .unwrap_err();

    assert!(matches!(err, SessionError::Store(_)), "{err}");
    // After the first failure each worker finishes at most the batch it already holds.
    let calls = store.calls.load(Ordering::SeqCst);
    assert!(calls >= 2 && calls <= 2 + 2 * workers, "calls = {calls}");
    assert!(store.rows.load(Ordering::SeqCst) < 40 * batch);

    let msgs = sink.messages();
    assert_single_terminal_last(&msgs);
    assert!(matches!(msgs.last(), Some(StatusMessage::Error { .. })));
    assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_session_store_failure_does_not_wait_for_idle_peer() {
    let sink = RecordingSink::default();
    let store = Arc::new(CountingStore::failing_on(&[1]));
    let text = format!("{HEADER}\nLOC1,a,b,c,d\nLOC2,a,b,c,d\n");
    // The peer goes quiet after the first rows instead of closing.
    let source = ScriptedSource::stalling(vec![text.into_bytes()], Duration::from_secs(5));

    let start = Instant::now();
    let err = run_session(transport(source, &sink), Arc::clone(&store), &config(2, 1))
        .unwrap_err();

    assert!(matches!(err, SessionError::Store(_)), "{err}");
    assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    assert!(matches!(
        sink.messages().as_slice(),
        [StatusMessage::Error { .. }]
    ));
}

#[test]
fn test_session_panicking_store_reports_error_to_peer() {
    let sink = RecordingSink::default();
    let text = format!("{HEADER}\nLOC1,a,b,c,d\n");
    let source = ScriptedSource::stalling(vec![text.into_bytes()], Duration::from_millis(300));

    let err = run_session(transport(source, &sink), Arc::new(PanickingStore), &config(1, 1))
        .unwrap_err();

    assert!(matches!(err, SessionError::Cancelled(_)), "{err}");
    let msgs = sink.messages();
    assert_single_terminal_last(&msgs);
    match msgs.last() {
        Some(StatusMessage::Error { message }) => assert!(message.contains("panicked")),
        other => panic!("expected error message, got {other:?}"),
    }
}

#[test]
fn test_stream_connection_reset_fails_session() {
    for kind in [io::ErrorKind::ConnectionReset, io::ErrorKind::ConnectionAborted] {
        let out = SharedBuf::default();
        let reader = BrokenReader {
            data: Some(format!("{HEADER}\nA,a,a,a,a\nB,b,b,").into_bytes()),
            kind,
        };
        let store = Arc::new(CountingStore::default());

        let err = run_session(
            StreamTransport::new(reader, out.clone()),
            Arc::clone(&store),
            &config(10, 1),
        )
        .unwrap_err();

        assert!(matches!(err, SessionError::Transport(_)), "{kind:?}: {err}");
        // The half-received row is never parsed and nothing is written.
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        let written = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        let msgs: Vec<StatusMessage> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert!(matches!(msgs.as_slice(), [StatusMessage::Error { .. }]), "{msgs:?}");
    }
}

#[test]
fn test_console_sink_prints_frames_without_counter() {
    let out = SharedBuf::default();
    let mut sink = ConsoleSink::new(out.clone(), false);
    sink.send_status(&StatusMessage::Progress { rows: 3 }).unwrap();
    sink.send_status(&StatusMessage::Complete {
        rows: 3,
        message: "done".to_string(),
    })
    .unwrap();
    sink.close().unwrap();

    let written = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
    let msgs: Vec<StatusMessage> = written
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(
        msgs,
        vec![
            StatusMessage::Progress { rows: 3 },
            StatusMessage::Complete {
                rows: 3,
                message: "done".to_string()
            }
        ]
    );
    assert!(matches!(
        sink.send_status(&StatusMessage::Progress { rows: 4 }),
        Err(TransportError::Closed)
    ));
}

#[test]
fn test_console_sink_counter_replaces_progress_lines() {
    let out = SharedBuf::default();
    let mut sink = ConsoleSink::new(out.clone(), true);
    sink.send_status(&StatusMessage::Progress { rows: 5 }).unwrap();
    sink.send_status(&StatusMessage::Error {
        message: "boom".to_string(),
    })
    .unwrap();

    let written = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
    let msgs: Vec<StatusMessage> = written
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(
        msgs,
        vec![StatusMessage::Error {
            message: "boom".to_string()
        }]
    );
}
