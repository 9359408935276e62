//! Node integration tests
//!
//! Drives the intake and announcement listeners over loopback TCP and checks
//! what reaches the buffer and the miner.

use compute_chain::network::{BlockMonitor, Ingestor, Listener, ThreadPerConnection};
use compute_chain::{
    ChainError, FileStore, Miner, MiningOutcome, MiningTarget, NodeContext, ProofOfWork, Result,
    ScriptRunner, Transaction, TransactionBuffer,
};
use std::fs;
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

/// Every reference resolves to its own name as file contents
struct NameStore;

impl FileStore for NameStore {
    fn fetch(&self, reference: &str, dest: &Path) -> Result<()> {
        if reference.starts_with("missing") {
            return Err(ChainError::FileStore(format!("unknown {reference}")));
        }
        fs::write(dest, reference)?;
        Ok(())
    }

    fn put(&self, path: &Path) -> Result<String> {
        Ok(path.display().to_string())
    }
}

/// Outputs the staged dataset unchanged
struct CatRunner;

impl ScriptRunner for CatRunner {
    fn run(&self, _script: &Path, data: &Path) -> Result<String> {
        Ok(fs::read_to_string(data)?)
    }
}

fn start_intake(context: &NodeContext) -> (SocketAddr, TempDir) {
    let staging = tempdir().unwrap();
    let ingestor = Arc::new(
        Ingestor::new(context, Arc::new(NameStore), Arc::new(CatRunner), staging.path()).unwrap(),
    );
    let listener = Listener::bind("transaction listener", "127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || listener.serve(ingestor, &ThreadPerConnection));
    (addr, staging)
}

fn start_monitor(context: &NodeContext) -> SocketAddr {
    let monitor = Arc::new(BlockMonitor::new(context));
    let listener = Listener::bind("block listener", "127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || listener.serve(monitor, &ThreadPerConnection));
    addr
}

fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_intake_to_mined_block() {
    let context = NodeContext::new(TransactionBuffer::new(100), MiningTarget::unbounded());
    let (addr, _staging) = start_intake(&context);

    let (block_tx, block_rx) = mpsc::channel();
    let miner = Miner::new(&context, "genesis".to_string(), block_tx);
    let mining = thread::spawn(move || miner.run_once());

    // One connection keeps the three jobs in order.
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(b"script a\nscript b\nscript c\n").unwrap();

    let block = block_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(mining.join().unwrap().unwrap(), MiningOutcome::Found(_)));

    let expected = ["a", "b", "c"].map(|d| Transaction::new(d.to_string()));
    assert_eq!(block.get_transactions(), expected.as_slice());
    assert_eq!(block.get_nonce(), 0);
    assert_eq!(block.get_hash(), ProofOfWork::hash_hex("genesis", &expected, 0));
    assert!(ProofOfWork::validate(&block, &MiningTarget::unbounded()));
}

#[test]
fn test_malformed_line_keeps_connection_open() {
    let context = NodeContext::new(TransactionBuffer::new(100), MiningTarget::unbounded());
    let (addr, _staging) = start_intake(&context);
    let buffer = context.buffer();

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(b"script data extra\n").unwrap();
    stream.write_all(b"script missing-data\n").unwrap();
    stream.write_all(b"\n").unwrap();
    stream.write_all(b"script ok\n").unwrap();

    wait_until("the valid job", || buffer.len() == 1);
    assert_eq!(buffer.dequeue().get_data(), "ok");

    // Still the same connection.
    stream.write_all(b"script again\n").unwrap();
    wait_until("the follow-up job", || buffer.len() == 1);
    assert_eq!(buffer.dequeue().get_data(), "again");
}

#[test]
fn test_announcements_cancel_mining_once() {
    let context = NodeContext::new(TransactionBuffer::new(100), MiningTarget::zero());
    let monitor_addr = start_monitor(&context);

    let (block_tx, block_rx) = mpsc::channel();
    let miner = Miner::new(&context, "genesis".to_string(), block_tx);
    let mining = thread::spawn(move || miner.run_once());

    let buffer = context.buffer();
    for data in ["a", "b", "c"] {
        buffer.enqueue(Transaction::new(data.to_string()));
    }
    wait_until("batch collection", || buffer.is_empty());

    // Two rival announcements from two connections.
    let mut first = TcpStream::connect(monitor_addr).unwrap();
    let mut second = TcpStream::connect(monitor_addr).unwrap();
    first.write_all(b"{\"hash\":\"rival\"}\n").unwrap();
    second.write_all(b"anything at all\n").unwrap();

    let outcome = mining.join().unwrap().unwrap();
    assert!(matches!(outcome, MiningOutcome::Cancelled { .. }));
    assert!(block_rx.try_recv().is_err());
    assert!(context.cancellation().is_cancelled());
}

#[test]
fn test_non_utf8_job_is_dropped_and_connection_survives() {
    let context = NodeContext::new(TransactionBuffer::new(100), MiningTarget::unbounded());
    let (addr, _staging) = start_intake(&context);
    let buffer = context.buffer();

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(b"\xff\xfe garbage extra\n").unwrap();
    stream.write_all(b"script ok\n").unwrap();

    wait_until("the valid job", || buffer.len() == 1);
    assert_eq!(buffer.dequeue().get_data(), "ok");
}

#[test]
fn test_non_utf8_announcement_still_cancels() {
    let context = NodeContext::new(TransactionBuffer::new(100), MiningTarget::zero());
    let monitor_addr = start_monitor(&context);
    let cancellation = context.cancellation();

    let mut stream = TcpStream::connect(monitor_addr).unwrap();
    stream.write_all(b"\x00\xc3\x28 block\n").unwrap();

    wait_until("cancellation", || cancellation.is_cancelled());
}
