//! # Retailstream Core
//!
//! Event model, classification, and I/O traits for the retailstream
//! pipeline.
//!
//! The pipeline turns a continuous stream of e-commerce interaction events
//! into two derived outputs:
//!
//! - a flattened, row-oriented projection of `view_item` events, and
//! - a running total of purchase value per user, emitted as snapshots.
//!
//! This crate owns everything both sides agree on:
//!
//! - **Data model**: [`event::Event`] and its nested `ecommerce` payload,
//!   plus the derived [`record::ViewRecord`] and
//!   [`record::PurchaseAggregate`] output rows.
//! - **Decoder**: [`decode::decode_event`] parses raw message payloads into
//!   structured events and rejects malformed input.
//! - **Classifier**: [`event::EventKind`] and the three independent
//!   predicates on [`event::Event`].
//! - **Boundary traits**: [`source::EventSource`] for the inbound message
//!   stream, [`sink::ViewSink`] and [`sink::AggregateSink`] for the two
//!   append-only destinations.
//! - **Error taxonomy**: record-level failures ([`error::DecodeError`],
//!   [`error::ExtractError`], [`error::ValueParseError`]) are isolated to
//!   the offending record and never terminate the stream; transport and
//!   destination failures surface as [`error::SourceError`] and
//!   [`error::SinkError`].
//!
//! The stateful aggregation engine itself lives in `retailstream-engine`;
//! concrete source/sink implementations live in `retailstream-kafka` and
//! `retailstream-postgres`.

pub mod decode;
pub mod error;
pub mod event;
pub mod record;
pub mod sink;
pub mod source;

pub use decode::decode_event;
pub use error::{ConfigError, DecodeError, ExtractError, SinkError, SourceError, ValueParseError};
pub use event::{Ecommerce, Event, EventKind, LineItem, PurchasePayload};
pub use record::{PurchaseAggregate, ViewRecord};
pub use sink::{AggregateSink, ViewSink};
pub use source::{EventSource, MessageStream, RawMessage};
