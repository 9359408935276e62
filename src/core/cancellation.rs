use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide signal telling the miner a competing block arrived.
///
/// Cloning shares the same flag. Triggering is idempotent from any number of
/// threads and the flag never resets.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal. Returns `true` only for the call that flipped it.
    pub fn trigger(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    /// Non-blocking read, checked by the miner once per nonce
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_unset() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn test_trigger_twice_is_idempotent() {
        let signal = CancellationSignal::new();
        assert!(signal.trigger());
        assert!(!signal.trigger());
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_concurrent_triggers_flip_once() {
        let signal = CancellationSignal::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || signal.trigger())
            })
            .collect();

        let flips = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|first| *first)
            .count();
        assert_eq!(flips, 1);
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let signal = CancellationSignal::new();
        let observer = signal.clone();
        let setter = {
            let signal = signal.clone();
            thread::spawn(move || signal.trigger())
        };
        assert!(setter.join().unwrap());
        assert!(observer.is_cancelled());
        assert!(!observer.trigger());
    }
}
