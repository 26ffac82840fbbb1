//! Keyed state store for per-user purchase contributions.
//!
//! Explicit keyed state, not ambient globals: the store is owned by the
//! aggregator, which is owned by the single pipeline task: single-owner
//! key routing by construction. Per-key lifecycle is absent → accumulating;
//! state is only released when the process (or the owning pipeline) ends.

use crate::trigger::AccumulationMode;
use retailstream_core::PurchaseAggregate;
use std::collections::{HashMap, HashSet};

/// Contributions for one key.
#[derive(Debug, Default)]
struct KeyState {
    /// Every successfully parsed value since window start, arrival order.
    values: Vec<f64>,
    /// How many of `values` have been emitted in discarding mode.
    emitted: usize,
}

/// Map from `user_id` to purchase contributions since window start.
#[derive(Debug, Default)]
pub struct KeyedTotals {
    keys: HashMap<String, KeyState>,
    /// Keys with new contributions since the last snapshot.
    touched: HashSet<String>,
}

impl KeyedTotals {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one parsed contribution in arrival order.
    pub fn contribute(&mut self, user_id: &str, value: f64) {
        self.keys
            .entry(user_id.to_string())
            .or_default()
            .values
            .push(value);
        self.touched.insert(user_id.to_string());
    }

    /// Number of keys with at least one contribution since window start.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Whether any key has new contributions since the last snapshot.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.touched.is_empty()
    }

    /// Emit one firing's rows and clear the touched set.
    ///
    /// Only keys touched since the last snapshot appear; quiet keys are
    /// not re-emitted. In accumulating mode each row restates the full
    /// cumulative sum, re-summed from every contribution since window
    /// start; in discarding mode each row carries only the values since
    /// the last firing. Rows are sorted by key for deterministic output.
    pub fn snapshot(&mut self, mode: AccumulationMode) -> Vec<PurchaseAggregate> {
        let mut rows: Vec<PurchaseAggregate> = self
            .touched
            .drain()
            .filter_map(|user_id| {
                let state = self.keys.get_mut(&user_id)?;
                let summed = match mode {
                    AccumulationMode::Accumulating => state.values.iter().sum(),
                    AccumulationMode::Discarding => {
                        let sum = state.values[state.emitted..].iter().sum();
                        state.emitted = state.values.len();
                        sum
                    }
                };
                Some(PurchaseAggregate::new(user_id, summed))
            })
            .collect();
        rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        rows
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accumulating_restates_full_totals() {
        let mut totals = KeyedTotals::new();
        totals.contribute("u1", 10.0);
        totals.contribute("u2", 5.0);
        totals.contribute("u1", 7.0);

        let first = totals.snapshot(AccumulationMode::Accumulating);
        assert_eq!(
            first,
            vec![
                PurchaseAggregate::new("u1".to_string(), 17.0),
                PurchaseAggregate::new("u2".to_string(), 5.0),
            ]
        );

        totals.contribute("u1", 3.0);
        let second = totals.snapshot(AccumulationMode::Accumulating);
        // u1 restated in full; u2 was quiet and is not re-emitted.
        assert_eq!(second, vec![PurchaseAggregate::new("u1".to_string(), 20.0)]);
    }

    #[test]
    fn discarding_emits_only_deltas() {
        let mut totals = KeyedTotals::new();
        totals.contribute("u1", 10.0);
        let first = totals.snapshot(AccumulationMode::Discarding);
        assert_eq!(first[0].summed_value, 10.0);

        totals.contribute("u1", 7.0);
        let second = totals.snapshot(AccumulationMode::Discarding);
        assert_eq!(second[0].summed_value, 7.0);
    }

    #[test]
    fn snapshot_clears_pending_state() {
        let mut totals = KeyedTotals::new();
        totals.contribute("u1", 1.0);
        assert!(totals.has_pending());

        let _ = totals.snapshot(AccumulationMode::Accumulating);
        assert!(!totals.has_pending());
        assert_eq!(totals.key_count(), 1);
    }

    proptest! {
        /// The cumulative sum is order-independent: any permutation of the
        /// same contributions yields the same restated total. Integer-valued
        /// contributions keep f64 addition exact.
        #[test]
        fn accumulating_sum_is_permutation_invariant(
            values in proptest::collection::vec(0u32..10_000, 1..50),
            seed in any::<u64>(),
        ) {
            let mut forward = KeyedTotals::new();
            for v in &values {
                forward.contribute("u1", f64::from(*v));
            }

            let mut shuffled = values.clone();
            // Deterministic Fisher-Yates driven by the seed.
            let mut state = seed | 1;
            for i in (1..shuffled.len()).rev() {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                #[allow(clippy::cast_possible_truncation)]
                let j = (state % (i as u64 + 1)) as usize;
                shuffled.swap(i, j);
            }
            let mut permuted = KeyedTotals::new();
            for v in &shuffled {
                permuted.contribute("u1", f64::from(*v));
            }

            let a = forward.snapshot(AccumulationMode::Accumulating);
            let b = permuted.snapshot(AccumulationMode::Accumulating);
            prop_assert_eq!(a[0].summed_value, b[0].summed_value);
        }
    }
}
