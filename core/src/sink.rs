//! Outbound destination abstractions.
//!
//! Two independently-addressed append-only destinations exist: one for
//! flat view rows, one for aggregate snapshots. Each is
//! **idempotent-on-create** (`ensure` creates the destination schema if
//! absent, otherwise no-ops) and **append-only on write** (rows are only
//! ever added, never updated or deleted).
//!
//! A failure writing to one destination must not block or corrupt writes
//! to the other; the router delivers to each independently. Write retries
//! belong to the execution substrate; because aggregate snapshots restate
//! full cumulative totals, redelivering a snapshot cannot double-count.
//!
//! # Dyn compatibility
//!
//! These traits use explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` so the router can hold them as `Arc<dyn ViewSink>` /
//! `Arc<dyn AggregateSink>` trait objects.

use crate::error::SinkError;
use crate::record::{PurchaseAggregate, ViewRecord};
use std::future::Future;
use std::pin::Pin;

/// Destination A: the append-only table of flat view rows.
pub trait ViewSink: Send + Sync {
    /// Create the destination schema if absent; no-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::CreateFailed`] if the destination cannot be
    /// created; fatal at startup.
    fn ensure(&self) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>>;

    /// Append view rows. Never overwrites or deletes existing rows.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::WriteFailed`] if the append fails; the caller
    /// logs and continues, leaving retry to the substrate.
    fn append(
        &self,
        rows: &[ViewRecord],
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>>;
}

/// Destination B: the append-only table of aggregate snapshots.
pub trait AggregateSink: Send + Sync {
    /// Create the destination schema if absent; no-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::CreateFailed`] if the destination cannot be
    /// created; fatal at startup.
    fn ensure(&self) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>>;

    /// Append one firing's snapshot rows.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::WriteFailed`] if the append fails; the caller
    /// logs and continues, leaving retry to the substrate.
    fn append(
        &self,
        rows: &[PurchaseAggregate],
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>>;
}
