use crate::core::CancellationSignal;
use crate::network::LineHandler;
use crate::node::NodeContext;
use log::{debug, info};
use std::net::SocketAddr;

/// Decides whether an announced block should preempt local mining.
///
/// Received blocks are not checked today; a consensus-aware implementation
/// would verify the announced block before cancelling.
pub trait BlockValidator: Send + Sync {
    fn accept(&self, announcement: &str) -> bool;
}

/// Treats every announcement as a valid competing block
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl BlockValidator for AcceptAll {
    fn accept(&self, _announcement: &str) -> bool {
        true
    }
}

/// Listens for rival blocks and cancels the running search.
pub struct BlockMonitor {
    cancel: CancellationSignal,
    validator: Box<dyn BlockValidator>,
}

impl BlockMonitor {
    pub fn new(context: &NodeContext) -> BlockMonitor {
        Self::with_validator(context, Box::new(AcceptAll))
    }

    pub fn with_validator(context: &NodeContext, validator: Box<dyn BlockValidator>) -> BlockMonitor {
        BlockMonitor {
            cancel: context.cancellation(),
            validator,
        }
    }

    /// Returns `true` when this announcement is the one that stopped mining
    pub fn observe(&self, announcement: &str) -> bool {
        if !self.validator.accept(announcement) {
            info!("Ignoring rejected block announcement");
            return false;
        }
        let first = self.cancel.trigger();
        if first {
            info!("Competing block received, stopping mining");
        } else {
            debug!("Mining already stopped, ignoring repeated announcement");
        }
        first
    }
}

impl LineHandler for BlockMonitor {
    fn handle_line(&self, line: &str, peer: SocketAddr) {
        info!("Received block from {peer}: {line}");
        self.observe(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MiningTarget;
    use crate::storage::TransactionBuffer;

    struct RejectAll;

    impl BlockValidator for RejectAll {
        fn accept(&self, _announcement: &str) -> bool {
            false
        }
    }

    fn context() -> NodeContext {
        NodeContext::new(TransactionBuffer::new(1), MiningTarget::zero())
    }

    #[test]
    fn test_any_line_cancels_once() {
        let context = context();
        let monitor = BlockMonitor::new(&context);

        assert!(monitor.observe("not even json"));
        assert!(!monitor.observe("{\"hash\":\"00ab\"}"));
        assert!(context.cancellation().is_cancelled());
    }

    #[test]
    fn test_rejected_announcement_does_not_cancel() {
        let context = context();
        let monitor = BlockMonitor::with_validator(&context, Box::new(RejectAll));

        assert!(!monitor.observe("block"));
        assert!(!context.cancellation().is_cancelled());
    }
}
