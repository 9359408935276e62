use crate::core::{CancellationSignal, MiningTarget};
use crate::storage::TransactionBuffer;
use std::sync::Arc;

/// Shared state handed to every long-lived task.
///
/// Built once at startup. Clones are cheap handles onto the same buffer,
/// target and cancellation signal, so tests can build a fresh one each.
#[derive(Clone)]
pub struct NodeContext {
    buffer: Arc<TransactionBuffer>,
    target: Arc<MiningTarget>,
    cancel: CancellationSignal,
}

impl NodeContext {
    pub fn new(buffer: TransactionBuffer, target: MiningTarget) -> NodeContext {
        NodeContext {
            buffer: Arc::new(buffer),
            target: Arc::new(target),
            cancel: CancellationSignal::new(),
        }
    }

    pub fn buffer(&self) -> Arc<TransactionBuffer> {
        Arc::clone(&self.buffer)
    }

    pub fn target(&self) -> Arc<MiningTarget> {
        Arc::clone(&self.target)
    }

    pub fn cancellation(&self) -> CancellationSignal {
        self.cancel.clone()
    }
}
