//! Testing utilities for retailstream.
//!
//! Fast, deterministic in-memory doubles for the pipeline's boundaries:
//!
//! - [`InMemoryEventSource`]: a finite message source; the stream ends
//!   after the last message, which the pipeline treats as shutdown.
//! - [`RecordingViewSink`] / [`RecordingAggregateSink`]: capture appended
//!   rows for assertions, count `ensure` calls, and can inject write
//!   failures to exercise destination isolation.
//! - [`payloads`]: JSON envelope builders shaped like the production
//!   dataLayer payloads.

pub mod payloads;
pub mod sinks;
pub mod source;

pub use sinks::{RecordingAggregateSink, RecordingViewSink};
pub use source::InMemoryEventSource;
