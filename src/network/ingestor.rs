use crate::core::Transaction;
use crate::error::{ChainError, Result};
use crate::network::LineHandler;
use crate::node::NodeContext;
use crate::services::{FileStore, ScriptRunner};
use crate::storage::TransactionBuffer;
use log::{debug, info, warn};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// A parsed intake line: which script to run against which dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub script_ref: String,
    pub data_ref: String,
}

impl JobDescriptor {
    /// Split on whitespace; anything other than exactly two tokens is malformed
    pub fn parse(line: &str) -> Result<JobDescriptor> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [script_ref, data_ref] => Ok(JobDescriptor {
                script_ref: script_ref.to_string(),
                data_ref: data_ref.to_string(),
            }),
            _ => Err(ChainError::MalformedMessage {
                line: line.to_string(),
                tokens: tokens.len(),
            }),
        }
    }
}

/// Staged artifacts for one in-flight message, removed on drop
struct StagedJob {
    script_path: PathBuf,
    data_path: PathBuf,
}

impl Drop for StagedJob {
    fn drop(&mut self) {
        for path in [&self.script_path, &self.data_path] {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("Failed to remove staged file {}: {e}", path.display());
                }
            }
        }
    }
}

/// Turns intake lines into transactions on the shared buffer.
pub struct Ingestor {
    buffer: Arc<TransactionBuffer>,
    store: Arc<dyn FileStore>,
    runner: Arc<dyn ScriptRunner>,
    staging_dir: PathBuf,
}

impl Ingestor {
    pub fn new(
        context: &NodeContext,
        store: Arc<dyn FileStore>,
        runner: Arc<dyn ScriptRunner>,
        staging_dir: impl Into<PathBuf>,
    ) -> Result<Ingestor> {
        let staging_dir = staging_dir.into();
        fs::create_dir_all(&staging_dir)?;
        Ok(Ingestor {
            buffer: context.buffer(),
            store,
            runner,
            staging_dir,
        })
    }

    /// Parse, fetch, execute and enqueue one message.
    ///
    /// May block on a full buffer. Any error means nothing was enqueued.
    pub fn ingest(&self, line: &str) -> Result<Transaction> {
        let job = JobDescriptor::parse(line)?;
        let staged = self.stage(&job)?;

        let output = self.runner.run(&staged.script_path, &staged.data_path)?;
        drop(staged);

        let transaction = Transaction::new(output);
        self.buffer.enqueue(transaction.clone());
        Ok(transaction)
    }

    /// Fetch both artifacts under a name unique to this message
    fn stage(&self, job: &JobDescriptor) -> Result<StagedJob> {
        let request_id = Uuid::new_v4();
        let staged = StagedJob {
            script_path: self.staging_dir.join(format!("{request_id}-script.py")),
            data_path: self.staging_dir.join(format!("{request_id}-data.txt")),
        };

        fetch(self.store.as_ref(), "data", &job.data_ref, &staged.data_path)?;
        fetch(self.store.as_ref(), "script", &job.script_ref, &staged.script_path)?;
        Ok(staged)
    }
}

fn fetch(store: &dyn FileStore, what: &str, reference: &str, dest: &Path) -> Result<()> {
    store.fetch(reference, dest).map_err(|e| match e {
        ChainError::FileStore(msg) => ChainError::FileStore(format!("Failed to download {what}: {msg}")),
        other => other,
    })
}

impl LineHandler for Ingestor {
    fn handle_line(&self, line: &str, peer: SocketAddr) {
        info!("Received job from {peer}: {line}");
        match self.ingest(line) {
            Ok(tx) => info!(
                "Transaction {} created and added to buffer ({} pending)",
                tx.get_id(),
                self.buffer.len()
            ),
            Err(e) => warn!("Discarding message from {peer}: {e}"),
        }
    }
}
