//! The windowed aggregation engine: per-key running purchase sums under a
//! count trigger over a global window.

use crate::state::KeyedTotals;
use crate::trigger::{AccumulationMode, CountTrigger};
use retailstream_core::error::ValueParseError;
use retailstream_core::event::Event;
use retailstream_core::record::PurchaseAggregate;

/// Outcome of observing one purchase element.
///
/// Both fields can be populated at once: a malformed value still enters
/// the window and can be the element that trips the trigger.
#[derive(Debug)]
pub struct Observation {
    /// One firing's rows, when the trigger fired on this element.
    pub snapshot: Option<Vec<PurchaseAggregate>>,
    /// The rejected contribution, when the value failed to parse.
    pub rejected: Option<ValueParseError>,
}

/// Groups purchase events by `user_id`, accumulates purchase value, and
/// emits running totals under the configured trigger policy.
///
/// The engine exclusively owns its keyed state; callers observe it only
/// through the snapshots returned here. Per-key lifecycle: absent on
/// first sight → accumulating for the rest of the stream's life.
pub struct WindowedAggregator {
    trigger: CountTrigger,
    mode: AccumulationMode,
    totals: KeyedTotals,
}

impl WindowedAggregator {
    /// Create an engine firing after every `threshold` purchase elements.
    ///
    /// # Panics
    ///
    /// Panics if `threshold` is zero.
    #[must_use]
    pub fn new(threshold: usize, mode: AccumulationMode) -> Self {
        Self {
            trigger: CountTrigger::new(threshold),
            mode,
            totals: KeyedTotals::new(),
        }
    }

    /// Observe one purchase element.
    ///
    /// Parses the purchase value (JSON number or numeric string), applies
    /// it to the key's running state in arrival order, and advances the
    /// trigger. A value that fails to parse is reported in
    /// [`Observation::rejected`] and contributes nothing; the per-key
    /// sums of every other contribution are untouched. The element
    /// advances the trigger either way: it entered the window.
    pub fn observe(&mut self, purchase: &Event) -> Observation {
        let rejected = match contribution(purchase) {
            Ok(value) => {
                self.totals.contribute(&purchase.user_id, value);
                None
            }
            Err(error) => Some(error),
        };

        let snapshot = self
            .trigger
            .observe()
            .then(|| self.totals.snapshot(self.mode));

        Observation { snapshot, rejected }
    }

    /// Emit pending trigger-eligible aggregates on graceful shutdown.
    ///
    /// Returns rows for keys touched since the last firing (empty when
    /// there is nothing pending) and resets the trigger.
    pub fn flush(&mut self) -> Vec<PurchaseAggregate> {
        self.trigger.reset();
        if self.totals.has_pending() {
            self.totals.snapshot(self.mode)
        } else {
            Vec::new()
        }
    }

    /// The configured accumulation mode.
    #[must_use]
    pub const fn mode(&self) -> AccumulationMode {
        self.mode
    }

    /// The configured trigger threshold.
    #[must_use]
    pub const fn threshold(&self) -> usize {
        self.trigger.threshold()
    }

    /// Number of keys with at least one contribution since window start.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.totals.key_count()
    }
}

/// Extract the purchase value for one contribution.
fn contribution(event: &Event) -> Result<f64, ValueParseError> {
    let payload =
        event
            .ecommerce
            .purchase
            .as_ref()
            .ok_or_else(|| ValueParseError::MissingPurchase {
                user_id: event.user_id.clone(),
            })?;

    parse_value(&payload.value).ok_or_else(|| ValueParseError::NotNumeric {
        user_id: event.user_id.clone(),
        raw: payload.value.to_string(),
    })
}

fn parse_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
