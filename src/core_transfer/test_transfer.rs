use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::core_network::data_channel::DataConn;
use crate::core_network::responder::Responder;
use crate::core_transfer::plan;
use crate::core_transfer::state::{TransferCtl, TransferOp, TransferShared};
use crate::core_transfer::{abort, engine};
use crate::core_vfs::backend::{Backend, OpenMode};
use crate::core_vfs::testutil::MemBackend;
use crate::core_watchdog::ActivityClock;

async fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    (client.unwrap(), accepted.unwrap().0)
}

struct Harness {
    shared: Arc<TransferShared>,
    backend: Arc<MemBackend>,
    control: BufReader<TcpStream>,
    data: TcpStream,
}

async fn harness(
    backend: Arc<MemBackend>,
    op: TransferOp,
    path: &str,
    parallelism: u32,
    slot_size: usize,
    start_offset: u64,
    range_length: Option<u64>,
) -> Harness {
    let mode = match op {
        TransferOp::Retrieve => OpenMode::Retrieve,
        _ => OpenMode::Store,
    };
    let handle = backend.open(path, mode, None).await.unwrap();

    let (control_client, control_server) = socket_pair().await;
    let (data_client, data_server) = socket_pair().await;
    let (_ctrl_read, ctrl_write) = control_server.into_split();

    let ctl = TransferCtl::new();
    assert!(ctl.begin_transfer());
    let shared = TransferShared::new(
        op,
        plan::compute(parallelism, slot_size, usize::MAX),
        start_offset,
        range_length,
        ctl,
        Some((Arc::clone(&backend) as Arc<dyn Backend>, handle)),
        DataConn::from_stream(data_server),
        Responder::new(ctrl_write),
        ActivityClock::new(),
    );
    Harness {
        shared,
        backend,
        control: BufReader::new(control_client),
        data: data_client,
    }
}

async fn read_terminal(control: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(10), control.read_line(&mut line))
        .await
        .expect("no terminal response")
        .unwrap();
    line.trim_end().to_string()
}

fn assert_disjoint_cover(mut ranges: Vec<(u64, usize)>, start: u64, end: u64) {
    ranges.retain(|(_, len)| *len > 0);
    ranges.sort_by_key(|(offset, _)| *offset);
    let mut cursor = start;
    for (offset, len) in ranges {
        assert_eq!(offset, cursor, "offset ranges overlap or leave a gap");
        cursor = offset + len as u64;
    }
    assert_eq!(cursor, end, "offset ranges do not cover the payload");
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn store_pipeline_moves_bytes_and_commits_once() {
    let backend = Arc::new(MemBackend::new());
    let mut h = harness(
        Arc::clone(&backend),
        TransferOp::Store,
        "/foo.txt",
        2,
        8,
        0,
        None,
    )
    .await;
    engine::spawn(Arc::clone(&h.shared));

    let bytes = payload(100);
    h.data.write_all(&bytes).await.unwrap();
    h.data.shutdown().await.unwrap();

    assert_eq!(read_terminal(&mut h.control).await, "226 Transfer complete.");
    assert_eq!(backend.file_contents("/foo.txt").unwrap(), bytes);

    let closes = backend.close_calls.lock().unwrap().clone();
    assert_eq!(closes.len(), 1);
    assert!(closes[0].1, "successful store must commit");
    assert_disjoint_cover(backend.write_ranges.lock().unwrap().clone(), 0, 100);
    assert!(!h.shared.ctl.is_in_progress());
}

#[tokio::test]
async fn retrieve_preserves_wire_order_across_slots() {
    let bytes = payload(1000);
    let backend = Arc::new(MemBackend::new().with_file("/big.bin", &bytes));
    let mut h = harness(
        Arc::clone(&backend),
        TransferOp::Retrieve,
        "/big.bin",
        4,
        16,
        0,
        None,
    )
    .await;
    engine::spawn(Arc::clone(&h.shared));

    let mut received = Vec::new();
    h.data.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, bytes);

    assert_eq!(read_terminal(&mut h.control).await, "226 Transfer complete.");
    assert_eq!(backend.close_count(), 1);
}

#[tokio::test]
async fn retrieve_honors_restart_offset_and_range() {
    let bytes = payload(64);
    let backend = Arc::new(MemBackend::new().with_file("/f.bin", &bytes));
    let mut h = harness(
        Arc::clone(&backend),
        TransferOp::Retrieve,
        "/f.bin",
        1,
        4,
        10,
        Some(20),
    )
    .await;
    engine::spawn(Arc::clone(&h.shared));

    let mut received = Vec::new();
    h.data.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, &bytes[10..30]);
    assert_eq!(read_terminal(&mut h.control).await, "226 Transfer complete.");
}

#[tokio::test]
async fn teardown_runs_exactly_once_with_many_racing_slots() {
    // 41 slots race over a payload most of them never touch.
    let bytes = payload(10);
    let backend = Arc::new(MemBackend::new().with_file("/small.bin", &bytes));
    let mut h = harness(
        Arc::clone(&backend),
        TransferOp::Retrieve,
        "/small.bin",
        50,
        4,
        0,
        None,
    )
    .await;
    engine::spawn(Arc::clone(&h.shared));

    let mut received = Vec::new();
    h.data.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, bytes);
    assert_eq!(read_terminal(&mut h.control).await, "226 Transfer complete.");
    assert_eq!(backend.close_count(), 1);
}

#[tokio::test]
async fn abort_is_idempotent_and_discards_store() {
    let backend = Arc::new(MemBackend::new());
    let mut h = harness(
        Arc::clone(&backend),
        TransferOp::Store,
        "/partial.txt",
        2,
        8,
        0,
        None,
    )
    .await;
    engine::spawn(Arc::clone(&h.shared));

    h.data.write_all(b"partial data").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Two concurrent abort requesters: exactly one forced close.
    let first = abort::abort_and_wait(&h.shared, Duration::from_secs(10));
    let second = abort::abort_and_wait(&h.shared, Duration::from_secs(10));
    let (first, second) = tokio::join!(first, second);
    assert!(first && second, "abort did not converge");

    let terminal = read_terminal(&mut h.control).await;
    assert!(terminal.starts_with("426"), "unexpected terminal: {}", terminal);

    let closes = backend.close_calls.lock().unwrap().clone();
    assert_eq!(closes.len(), 1, "backend close must run exactly once");
    assert!(!closes[0].1, "aborted store must not commit");
    assert_eq!(backend.file_contents("/partial.txt"), None);

    // No second terminal response may follow.
    let mut extra = String::new();
    let more = tokio::time::timeout(
        Duration::from_millis(300),
        h.control.read_line(&mut extra),
    )
    .await;
    assert!(more.is_err() || extra.is_empty(), "extra response: {}", extra);
}

#[tokio::test]
async fn stalled_transfer_is_cancellable_through_the_control_block() {
    let backend = Arc::new(MemBackend::new());
    let mut h = harness(
        Arc::clone(&backend),
        TransferOp::Store,
        "/stalled.bin",
        2,
        8,
        0,
        None,
    )
    .await;
    engine::spawn(Arc::clone(&h.shared));

    h.data.write_all(b"stall").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The idle reaper has only the control block; the live transfer must
    // be reachable through it so slot tasks enter the abort path.
    let live = h
        .shared
        .ctl
        .active_transfer()
        .expect("live transfer not reachable");
    assert!(Arc::ptr_eq(&live, &h.shared));
    abort::force_abort(&live).await;
    assert!(h.shared.ctl.wait_done(Duration::from_secs(10)).await);

    let terminal = read_terminal(&mut h.control).await;
    assert!(terminal.starts_with("426"), "unexpected terminal: {}", terminal);
    let closes = backend.close_calls.lock().unwrap().clone();
    assert_eq!(closes.len(), 1);
    assert!(!closes[0].1, "cancelled store must not commit");
    assert_eq!(backend.file_contents("/stalled.bin"), None);
    assert!(h.shared.ctl.active_transfer().is_none());
}

#[tokio::test]
async fn backend_read_error_funnels_into_abort_path() {
    let bytes = payload(64);
    let backend = Arc::new(MemBackend::new().with_file("/flaky.bin", &bytes));
    *backend.fail_read_at.lock().unwrap() = Some(8);
    let mut h = harness(
        Arc::clone(&backend),
        TransferOp::Retrieve,
        "/flaky.bin",
        2,
        8,
        0,
        None,
    )
    .await;
    engine::spawn(Arc::clone(&h.shared));

    let mut sink = Vec::new();
    let _ = h.data.read_to_end(&mut sink).await;

    let terminal = read_terminal(&mut h.control).await;
    assert!(terminal.starts_with("451"), "unexpected terminal: {}", terminal);
    let closes = backend.close_calls.lock().unwrap().clone();
    assert_eq!(closes.len(), 1);
    assert!(!closes[0].1);
    assert!(!h.shared.ctl.is_in_progress());
}
