//! Trigger policy: when a windowed aggregate emits, and what each
//! emission contains.

/// What a firing emits for each touched key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumulationMode {
    /// Each firing restates the full cumulative sum since window start.
    ///
    /// Snapshots for a key are monotonically non-decreasing across
    /// firings, which makes redelivery at the sink indistinguishable from
    /// crash-retry; the production mode.
    Accumulating,

    /// Each firing emits only the values contributed since the last
    /// firing for that key.
    Discarding,
}

/// Count-based repeating trigger.
///
/// Counts raw elements entering the window (not per-key contributions)
/// and fires each time `threshold` elements have arrived since the last
/// firing, then resets. Repeats for the lifetime of the stream.
#[derive(Clone, Debug)]
pub struct CountTrigger {
    threshold: usize,
    seen: usize,
}

impl CountTrigger {
    /// Create a trigger that fires after every `threshold` elements.
    ///
    /// # Panics
    ///
    /// Panics if `threshold` is zero.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        assert!(threshold > 0, "trigger threshold must be greater than 0");
        Self { threshold, seen: 0 }
    }

    /// Record one element entering the window; `true` means fire now.
    pub fn observe(&mut self) -> bool {
        self.seen += 1;
        if self.seen >= self.threshold {
            self.seen = 0;
            true
        } else {
            false
        }
    }

    /// Reset the element count without firing (used on flush).
    pub fn reset(&mut self) {
        self.seen = 0;
    }

    /// The configured firing threshold.
    #[must_use]
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    /// Elements observed since the last firing.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_every_threshold() {
        let mut trigger = CountTrigger::new(3);
        let firings: Vec<bool> = (0..9).map(|_| trigger.observe()).collect();
        assert_eq!(
            firings,
            vec![false, false, true, false, false, true, false, false, true]
        );
    }

    #[test]
    fn reset_clears_pending_count() {
        let mut trigger = CountTrigger::new(10);
        for _ in 0..7 {
            trigger.observe();
        }
        assert_eq!(trigger.pending(), 7);
        trigger.reset();
        assert_eq!(trigger.pending(), 0);

        // A fresh run of `threshold` elements is needed after the reset.
        for _ in 0..9 {
            assert!(!trigger.observe());
        }
        assert!(trigger.observe());
    }

    #[test]
    #[should_panic(expected = "threshold must be greater than 0")]
    fn zero_threshold_is_rejected() {
        let _ = CountTrigger::new(0);
    }
}
