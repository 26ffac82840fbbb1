//! Routes finished records to their designated destinations.

use retailstream_core::error::SinkError;
use retailstream_core::record::{PurchaseAggregate, ViewRecord};
use retailstream_core::sink::{AggregateSink, ViewSink};
use std::sync::Arc;

/// Delivers view rows and aggregate snapshots to two independently-
/// addressed append-only destinations.
///
/// The two destinations are isolated: a write failure on one is returned
/// to the caller for that branch only and never blocks or corrupts the
/// other. Retries belong to the execution substrate.
#[derive(Clone)]
pub struct SinkRouter {
    views: Arc<dyn ViewSink>,
    aggregates: Arc<dyn AggregateSink>,
}

impl SinkRouter {
    /// Create a router over the two destinations.
    #[must_use]
    pub fn new(views: Arc<dyn ViewSink>, aggregates: Arc<dyn AggregateSink>) -> Self {
        Self { views, aggregates }
    }

    /// Idempotently create both destination schemas.
    ///
    /// Called once at startup, before any message is consumed.
    ///
    /// # Errors
    ///
    /// Returns the first [`SinkError::CreateFailed`] encountered. An
    /// unresolvable destination is an unrecoverable configuration error
    /// and fatal at startup.
    pub async fn prepare(&self) -> Result<(), SinkError> {
        self.views.ensure().await?;
        self.aggregates.ensure().await?;
        Ok(())
    }

    /// Append one view row to destination A.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::WriteFailed`] on append failure.
    pub async fn deliver_view(&self, row: &ViewRecord) -> Result<(), SinkError> {
        self.views.append(std::slice::from_ref(row)).await
    }

    /// Append one firing's snapshot rows to destination B.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::WriteFailed`] on append failure. Safe to
    /// redeliver: snapshot rows restate full cumulative totals.
    pub async fn deliver_snapshot(&self, rows: &[PurchaseAggregate]) -> Result<(), SinkError> {
        self.aggregates.append(rows).await
    }
}
