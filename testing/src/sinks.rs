//! Recording sinks: in-memory destinations that capture what the router
//! delivered.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use retailstream_core::error::SinkError;
use retailstream_core::record::{PurchaseAggregate, ViewRecord};
use retailstream_core::sink::{AggregateSink, ViewSink};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory destination A: captures appended view rows.
#[derive(Clone, Default)]
pub struct RecordingViewSink {
    rows: Arc<RwLock<Vec<ViewRecord>>>,
    ensure_calls: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl RecordingViewSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row appended so far, in append order.
    #[must_use]
    pub fn rows(&self) -> Vec<ViewRecord> {
        self.rows.read().unwrap().clone()
    }

    /// How many times `ensure` was invoked.
    #[must_use]
    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent appends fail (destination unavailable).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl ViewSink for RecordingViewSink {
    fn ensure(&self) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn append(
        &self,
        rows: &[ViewRecord],
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
        let rows = rows.to_vec();
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(SinkError::WriteFailed {
                    table: "item_views".to_string(),
                    reason: "injected write failure".to_string(),
                });
            }
            self.rows.write().unwrap().extend(rows);
            Ok(())
        })
    }
}

/// In-memory destination B: captures snapshot batches per firing.
#[derive(Clone, Default)]
pub struct RecordingAggregateSink {
    batches: Arc<RwLock<Vec<Vec<PurchaseAggregate>>>>,
    ensure_calls: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl RecordingAggregateSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every appended batch, one per firing, in firing order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<PurchaseAggregate>> {
        self.batches.read().unwrap().clone()
    }

    /// The most recently emitted total per key across all batches.
    ///
    /// In accumulating mode this is each key's final cumulative sum.
    #[must_use]
    pub fn latest_totals(&self) -> HashMap<String, f64> {
        let mut totals = HashMap::new();
        for batch in self.batches.read().unwrap().iter() {
            for row in batch {
                totals.insert(row.user_id.clone(), row.summed_value);
            }
        }
        totals
    }

    /// How many times `ensure` was invoked.
    #[must_use]
    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent appends fail (destination unavailable).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl AggregateSink for RecordingAggregateSink {
    fn ensure(&self) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn append(
        &self,
        rows: &[PurchaseAggregate],
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
        let rows = rows.to_vec();
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(SinkError::WriteFailed {
                    table: "purchase_totals".to_string(),
                    reason: "injected write failure".to_string(),
                });
            }
            self.batches.write().unwrap().push(rows);
            Ok(())
        })
    }
}
