//! Inbound message source abstraction.
//!
//! The pipeline reads from an ordered, at-least-once message stream where
//! each message is a JSON-encoded event envelope. The transport is an
//! external collaborator behind [`EventSource`]; the production
//! implementation lives in `retailstream-kafka`, and tests drive the
//! pipeline with an in-memory source from `retailstream-testing`.
//!
//! # Delivery semantics
//!
//! - **At-least-once**: messages may be redelivered; downstream output is
//!   idempotent-safe because aggregate snapshots restate full totals.
//! - **Ordered within a key's owner**: contributions for a given key are
//!   applied in arrival order as observed by that key's owner.

use crate::error::SourceError;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;

/// An undecoded message from the source, plus delivery metadata.
///
/// Ephemeral: owned by the ingestion boundary and discarded after decoding.
#[derive(Clone, Debug)]
pub struct RawMessage {
    /// Transport coordinates (e.g. `partition@offset`), used for logging.
    pub id: String,
    /// When the broker accepted the message.
    pub publish_time: DateTime<Utc>,
    /// Opaque payload bytes, expected to be a JSON event envelope.
    pub payload: Vec<u8>,
}

impl RawMessage {
    /// Create a raw message.
    #[must_use]
    pub const fn new(id: String, publish_time: DateTime<Utc>, payload: Vec<u8>) -> Self {
        Self {
            id,
            publish_time,
            payload,
        }
    }
}

/// Stream of raw messages from a subscription.
///
/// Transport errors are yielded in-band so one bad receive never tears the
/// stream down; the pipeline logs them and keeps reading.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<RawMessage, SourceError>> + Send>>;

/// A subscription-based message source.
///
/// Reading the next message may block on I/O, so the stream is async and
/// must not stall unrelated pipeline work. A stream that ends (`None`) is
/// treated as a shutdown signal by the pipeline; finite sources are how
/// the integration tests drive it.
pub trait EventSource: Send + Sync {
    /// Open the subscription and return the message stream.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the subscription cannot be established.
    /// This is fatal at startup: there is nothing to read from.
    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<MessageStream, SourceError>> + Send + '_>>;
}
