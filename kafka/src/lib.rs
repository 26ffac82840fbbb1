//! Kafka-compatible message source for the retailstream pipeline.
//!
//! Implements the [`EventSource`] trait from `retailstream-core` over
//! `rdkafka`. Any Kafka-protocol broker works (Apache Kafka, Redpanda,
//! a managed cloud offering), which keeps the ingestion boundary a thin,
//! swappable collaborator the way the pipeline treats it.
//!
//! # Delivery semantics
//!
//! **At-least-once** with manual offset commits:
//! - Offsets are committed only AFTER a message is handed to the pipeline's
//!   channel; a crash before commit means redelivery.
//! - Downstream output is idempotent-safe under redelivery because
//!   aggregate snapshots restate full cumulative totals.
//! - Ordering is preserved within a partition, which is what keys a
//!   partition-sharded deployment relies on for per-key arrival order.
//!
//! # Example
//!
//! ```no_run
//! use retailstream_kafka::KafkaEventSource;
//! use retailstream_core::source::EventSource;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = KafkaEventSource::builder()
//!     .brokers("localhost:9092")
//!     .topic("ecommerce-events")
//!     .consumer_group("retailstream-pipeline")
//!     .build()?;
//!
//! let mut stream = source.subscribe().await?;
//! while let Some(result) = stream.next().await {
//!     match result {
//!         Ok(message) => println!("received {}", message.id),
//!         Err(e) => eprintln!("source error: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use retailstream_core::error::SourceError;
use retailstream_core::source::{EventSource, MessageStream, RawMessage};
use std::future::Future;
use std::pin::Pin;

/// Kafka-backed implementation of [`EventSource`].
///
/// Holds configuration only; the consumer is created per subscription so a
/// fresh `subscribe` after a failure starts from committed offsets.
pub struct KafkaEventSource {
    brokers: String,
    topic: String,
    consumer_group: String,
    buffer_size: usize,
    auto_offset_reset: String,
}

impl KafkaEventSource {
    /// Create a builder for configuring the source.
    #[must_use]
    pub fn builder() -> KafkaEventSourceBuilder {
        KafkaEventSourceBuilder::default()
    }

    /// The subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The broker bootstrap list.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

/// Builder for [`KafkaEventSource`].
#[derive(Default)]
pub struct KafkaEventSourceBuilder {
    brokers: Option<String>,
    topic: Option<String>,
    consumer_group: Option<String>,
    buffer_size: Option<usize>,
    auto_offset_reset: Option<String>,
}

impl KafkaEventSourceBuilder {
    /// Set the broker addresses (comma-separated).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the topic carrying the event envelopes.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Set the consumer group ID.
    ///
    /// Partitions are balanced across members of the group, which is how a
    /// deployment shards the stream: all messages of a partition (and
    /// therefore a key, with key-based partitioning upstream) go to one
    /// member at a time.
    #[must_use]
    pub fn consumer_group(mut self, consumer_group: impl Into<String>) -> Self {
        self.consumer_group = Some(consumer_group.into());
        self
    }

    /// Set the message buffer size between the consumer task and the
    /// pipeline (default: 1000).
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is 0.
    #[must_use]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer_size must be greater than 0");
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Where a new consumer group starts reading: `"earliest"` or
    /// `"latest"` (default).
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Build the [`KafkaEventSource`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ConnectionFailed`] if brokers or topic are
    /// not configured.
    pub fn build(self) -> Result<KafkaEventSource, SourceError> {
        let brokers = self
            .brokers
            .ok_or_else(|| SourceError::ConnectionFailed("brokers not configured".to_string()))?;
        let topic = self
            .topic
            .ok_or_else(|| SourceError::ConnectionFailed("topic not configured".to_string()))?;

        Ok(KafkaEventSource {
            brokers,
            consumer_group: self
                .consumer_group
                .unwrap_or_else(|| format!("retailstream-{topic}")),
            topic,
            buffer_size: self.buffer_size.unwrap_or(1000),
            auto_offset_reset: self.auto_offset_reset.unwrap_or_else(|| "latest".to_string()),
        })
    }
}

/// Broker timestamp of a message, falling back to receipt time.
fn publish_time(millis: Option<i64>) -> DateTime<Utc> {
    millis
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

impl EventSource for KafkaEventSource {
    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<MessageStream, SourceError>> + Send + '_>> {
        let brokers = self.brokers.clone();
        let topic = self.topic.clone();
        let consumer_group = self.consumer_group.clone();
        let buffer_size = self.buffer_size;
        let auto_offset_reset = self.auto_offset_reset.clone();

        Box::pin(async move {
            // Manual commit for at-least-once delivery.
            let consumer: StreamConsumer = ClientConfig::new()
                .set("bootstrap.servers", &brokers)
                .set("group.id", &consumer_group)
                .set("enable.auto.commit", "false")
                .set("auto.offset.reset", &auto_offset_reset)
                .set("session.timeout.ms", "6000")
                .set("enable.partition.eof", "false")
                .create()
                .map_err(|e| SourceError::SubscriptionFailed {
                    topic: topic.clone(),
                    reason: format!("failed to create consumer: {e}"),
                })?;

            consumer
                .subscribe(&[topic.as_str()])
                .map_err(|e| SourceError::SubscriptionFailed {
                    topic: topic.clone(),
                    reason: format!("failed to subscribe: {e}"),
                })?;

            tracing::info!(
                topic = %topic,
                consumer_group = %consumer_group,
                buffer_size = buffer_size,
                auto_offset_reset = %auto_offset_reset,
                "subscribed to event topic"
            );

            let (tx, rx) = tokio::sync::mpsc::channel(buffer_size);

            // The consumer lives on its own task and forwards into the
            // channel, so broker I/O never blocks pipeline processing.
            tokio::spawn(async move {
                use futures::StreamExt;
                use rdkafka::consumer::CommitMode;

                let mut stream = consumer.stream();

                while let Some(msg_result) = stream.next().await {
                    match msg_result {
                        Ok(message) => {
                            let id = format!("{}@{}", message.partition(), message.offset());
                            let raw = RawMessage::new(
                                id,
                                publish_time(message.timestamp().to_millis()),
                                message.payload().unwrap_or_default().to_vec(),
                            );

                            tracing::trace!(
                                id = %raw.id,
                                bytes = raw.payload.len(),
                                "received message"
                            );

                            // Commit only AFTER successful delivery to the
                            // channel: crash before commit → redelivery.
                            if tx.send(Ok(raw)).await.is_err() {
                                tracing::debug!("receiver dropped, exiting consumer task");
                                break;
                            }

                            if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                                tracing::warn!(
                                    partition = message.partition(),
                                    offset = message.offset(),
                                    error = %e,
                                    "offset commit failed (message may be redelivered)"
                                );
                            }
                        }
                        Err(e) => {
                            let err =
                                SourceError::TransportError(format!("failed to receive: {e}"));
                            if tx.send(Err(err)).await.is_err() {
                                break;
                            }
                        }
                    }
                }

                tracing::debug!("consumer task exiting");
            });

            let stream = async_stream::stream! {
                let mut rx = rx;
                while let Some(result) = rx.recv().await {
                    yield result;
                }
            };

            Ok(Box::pin(stream) as MessageStream)
        })
    }
}
