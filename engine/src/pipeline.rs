//! The pipeline run loop: decode, classify, branch, shut down.

use crate::aggregator::WindowedAggregator;
use crate::router::SinkRouter;
use futures::StreamExt;
use retailstream_core::decode::decode_event;
use retailstream_core::error::{SinkError, SourceError};
use retailstream_core::event::{Event, EventKind};
use retailstream_core::record::ViewRecord;
use retailstream_core::source::{EventSource, RawMessage};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Fatal pipeline errors, raised at startup only.
///
/// Everything after startup is record-level and handled in place; the
/// stream itself never terminates on a bad record.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The subscription could not be established.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A destination could not be created.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Counters reported when the pipeline stops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Raw messages received from the source.
    pub messages: u64,
    /// View rows successfully routed to destination A.
    pub views: u64,
    /// Purchase elements observed by the aggregation engine.
    pub purchases: u64,
    /// Add-to-cart events classified (reserved branch, routed nowhere).
    pub carted: u64,
    /// Events whose kind matched no recognized discriminant.
    pub unrecognized: u64,
    /// Trigger firings routed to destination B (including the final flush).
    pub firings: u64,
    /// Messages dropped as undecodable.
    pub decode_failures: u64,
    /// View records dropped for a missing `items[0]`.
    pub extract_failures: u64,
    /// Purchase contributions rejected as non-numeric or missing.
    pub value_failures: u64,
    /// Append attempts that failed (either destination).
    pub sink_failures: u64,
}

/// The streaming pipeline: one source, one engine, two destinations.
///
/// The pipeline task exclusively owns the aggregator and its per-key
/// state. Classification and aggregation are synchronous and cheap; the
/// only awaits are reading the next message and appending rows, so slow
/// destinations never stall classification of other work beyond the
/// current message.
pub struct Pipeline {
    source: Arc<dyn EventSource>,
    router: SinkRouter,
    aggregator: WindowedAggregator,
    report: PipelineReport,
}

impl Pipeline {
    /// Assemble a pipeline.
    #[must_use]
    pub fn new(
        source: Arc<dyn EventSource>,
        router: SinkRouter,
        aggregator: WindowedAggregator,
    ) -> Self {
        Self {
            source,
            router,
            aggregator,
            report: PipelineReport::default(),
        }
    }

    /// Run until the shutdown signal fires or the source stream ends.
    ///
    /// Graceful shutdown: stop accepting new messages, flush pending
    /// trigger-eligible aggregates to destination B, release per-key state
    /// (dropped with the pipeline), and report counters.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only for startup failures: destination
    /// creation or subscription. Record-level failures are counted and
    /// logged, never propagated.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<PipelineReport, PipelineError> {
        self.router.prepare().await?;
        let mut stream = self.source.subscribe().await?;

        tracing::info!(
            threshold = self.aggregator.threshold(),
            mode = ?self.aggregator.mode(),
            "pipeline started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
                next = stream.next() => match next {
                    None => {
                        tracing::info!("source stream ended");
                        break;
                    }
                    Some(Err(error)) => {
                        // Transport hiccup: surfaced in-band, stream stays up.
                        tracing::warn!(%error, "source error");
                    }
                    Some(Ok(message)) => self.handle(message).await,
                },
            }
        }

        // Stop consuming before the final flush.
        drop(stream);

        let pending = self.aggregator.flush();
        if !pending.is_empty() {
            self.report.firings += 1;
            if let Err(error) = self.router.deliver_snapshot(&pending).await {
                self.report.sink_failures += 1;
                tracing::error!(%error, rows = pending.len(), "final flush failed");
            }
        }

        tracing::info!(
            messages = self.report.messages,
            views = self.report.views,
            purchases = self.report.purchases,
            firings = self.report.firings,
            decode_failures = self.report.decode_failures,
            extract_failures = self.report.extract_failures,
            value_failures = self.report.value_failures,
            sink_failures = self.report.sink_failures,
            "pipeline stopped"
        );

        Ok(self.report)
    }

    async fn handle(&mut self, message: RawMessage) {
        self.report.messages += 1;

        let event = match decode_event(&message) {
            Ok(event) => event,
            Err(error) => {
                self.report.decode_failures += 1;
                tracing::warn!(%error, "dropping undecodable message");
                return;
            }
        };

        match event.kind() {
            Some(EventKind::ItemView) => self.handle_view(&event).await,
            Some(EventKind::Purchase) => self.handle_purchase(&event).await,
            Some(EventKind::AddToCart) => {
                // Reserved extension point for a future cart destination.
                self.report.carted += 1;
            }
            None => {
                self.report.unrecognized += 1;
                tracing::trace!(kind = %event.event, "unrecognized event kind");
            }
        }
    }

    async fn handle_view(&mut self, event: &Event) {
        match ViewRecord::project(event) {
            Ok(row) => match self.router.deliver_view(&row).await {
                Ok(()) => self.report.views += 1,
                Err(error) => {
                    self.report.sink_failures += 1;
                    tracing::warn!(%error, user_id = %event.user_id, "view append failed");
                }
            },
            Err(error) => {
                self.report.extract_failures += 1;
                tracing::warn!(%error, "dropping view record");
            }
        }
    }

    async fn handle_purchase(&mut self, event: &Event) {
        self.report.purchases += 1;

        let observation = self.aggregator.observe(event);

        if let Some(error) = observation.rejected {
            self.report.value_failures += 1;
            tracing::warn!(%error, "rejected purchase contribution");
        }

        if let Some(snapshot) = observation.snapshot {
            self.report.firings += 1;
            if let Err(error) = self.router.deliver_snapshot(&snapshot).await {
                self.report.sink_failures += 1;
                tracing::warn!(%error, rows = snapshot.len(), "snapshot append failed");
            }
        }
    }
}
