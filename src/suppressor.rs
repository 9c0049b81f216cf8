//! Feedback suppression
//!
//! Writing an entry back to the monitored external resource triggers the
//! same change notification the detector polls for, which would re-capture
//! our own write as new external input. The suppressor is a one-shot latch:
//! the write path arms it immediately before writing, and the detector
//! consumes it once per detected change.

use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot "ignore the next self-triggered change" latch.
///
/// Shared between the write-back path (arms) and the detector thread
/// (consumes). The atomic swap makes arm/consume safe from both threads;
/// the remaining race — a genuine external change landing in the window
/// between the write and the next poll — is accepted, because the store's
/// content dedup collapses the recaptured echo into a recency refresh.
#[derive(Debug, Default)]
pub struct FeedbackSuppressor {
    armed: AtomicBool,
}

impl FeedbackSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the latch. Call strictly before performing a write-back.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Consume the latch. Call exactly once per detected external change;
    /// returns true for the first change after `arm()`, false otherwise.
    pub fn should_suppress(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }

    /// Disarm without a detector tick. Used when an armed write fails, so
    /// the next genuine change isn't swallowed.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unarmed_does_not_suppress() {
        let suppressor = FeedbackSuppressor::new();
        assert!(!suppressor.should_suppress());
    }

    #[test]
    fn test_one_shot_semantics() {
        let suppressor = FeedbackSuppressor::new();
        suppressor.arm();
        assert!(suppressor.should_suppress(), "first check consumes");
        assert!(!suppressor.should_suppress(), "second check is clear");
    }

    #[test]
    fn test_rearming_works() {
        let suppressor = FeedbackSuppressor::new();
        suppressor.arm();
        assert!(suppressor.should_suppress());
        suppressor.arm();
        assert!(suppressor.should_suppress());
    }

    #[test]
    fn test_double_arm_is_still_one_shot() {
        let suppressor = FeedbackSuppressor::new();
        suppressor.arm();
        suppressor.arm();
        assert!(suppressor.should_suppress());
        assert!(!suppressor.should_suppress());
    }

    #[test]
    fn test_disarm_clears_latch() {
        let suppressor = FeedbackSuppressor::new();
        suppressor.arm();
        suppressor.disarm();
        assert!(!suppressor.should_suppress());
    }

    #[test]
    fn test_concurrent_consumers_see_exactly_one_suppression() {
        let suppressor = Arc::new(FeedbackSuppressor::new());
        suppressor.arm();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = suppressor.clone();
                std::thread::spawn(move || s.should_suppress())
            })
            .collect();

        let suppressed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|suppressed| *suppressed)
            .count();
        assert_eq!(suppressed, 1, "the latch is single-slot");
    }
}
