//! Stateful windowed aggregation engine for retailstream.
//!
//! # Overview
//!
//! This crate is the core of the pipeline: it classifies an unbounded
//! event stream, maintains per-key running purchase sums under an explicit
//! trigger policy, and emits incremental snapshots with defined
//! accumulation semantics.
//!
//! - [`trigger`]: the count-based repeating trigger and the accumulation
//!   mode enum: explicit policy objects, not hidden library behavior.
//! - [`state`]: the keyed state store mapping `user_id` to contributions,
//!   exclusively owned by the engine.
//! - [`aggregator`]: [`WindowedAggregator`] ties trigger, mode, and state
//!   together over a global (stream-lifetime) window.
//! - [`router`]: [`SinkRouter`] delivers finished rows and snapshots to
//!   the two independently-addressed destinations.
//! - [`pipeline`]: the run loop: decode, classify, branch, shutdown.
//!
//! # Windowing semantics
//!
//! The window is global: it spans the entire lifetime of the stream and is
//! never time-bounded. The trigger fires after every `threshold` elements
//! observed by the windowing mechanism (raw elements entering the window,
//! not per-key). In accumulating mode each firing restates the full
//! cumulative sum per touched key, so downstream snapshots for a key never
//! decrease and never reset while the process runs.
//!
//! The count trigger bounds end-to-end latency to a fixed element backlog
//! rather than wall-clock time. Known trade-off: an idle period with fewer
//! than `threshold` purchases does not flush until shutdown. That is
//! intentional: the policy is a count trigger, not a time trigger.
//!
//! # Ownership and concurrency
//!
//! The pipeline task exclusively owns the aggregator and its keyed state;
//! no other component reads or mutates it; all observation happens
//! through emitted snapshots. Contributions for a key are applied in
//! arrival order as seen by that owner. Partitioned deployments shard
//! whole pipelines by key at the substrate level, which is what makes
//! lock-free single-owner state sound here.

pub mod aggregator;
pub mod pipeline;
pub mod router;
pub mod state;
pub mod trigger;

pub use aggregator::{Observation, WindowedAggregator};
pub use pipeline::{Pipeline, PipelineError, PipelineReport};
pub use router::SinkRouter;
pub use state::KeyedTotals;
pub use trigger::{AccumulationMode, CountTrigger};
