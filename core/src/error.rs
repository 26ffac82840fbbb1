//! Error taxonomy for the pipeline.
//!
//! Record-level errors (`DecodeError`, `ExtractError`, `ValueParseError`)
//! are isolated to the offending record or contribution; the stream keeps
//! running. Transport and destination errors (`SourceError`, `SinkError`)
//! are surfaced to the pipeline, which logs and continues; retries belong
//! to the execution substrate, not to this core. Only `ConfigError` is
//! fatal, and only at startup.

use thiserror::Error;

/// A raw message could not be decoded into an [`Event`](crate::Event).
///
/// The message is dropped and logged; decoding never aborts the stream and
/// never retries (retry, if any, belongs to the message source).
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload is not a valid JSON event envelope.
    #[error("malformed message {message_id}: {reason}")]
    Malformed {
        /// Transport coordinates of the offending message.
        message_id: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// A required nested field was missing during view projection.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The event's item list is empty, so `items[0]` does not exist.
    #[error("view event for user {user_id} has an empty item list")]
    EmptyItems {
        /// User the dropped record belonged to.
        user_id: String,
    },
}

/// A purchase contribution could not be applied to the running sum.
///
/// Fails that single element's contribution without corrupting the per-key
/// state for other contributions.
#[derive(Error, Debug)]
pub enum ValueParseError {
    /// The event carries no `ecommerce.purchase` payload.
    #[error("purchase event for user {user_id} has no purchase payload")]
    MissingPurchase {
        /// Key the contribution was destined for.
        user_id: String,
    },

    /// The purchase value is not numeric.
    #[error("purchase value for user {user_id} is not numeric: {raw}")]
    NotNumeric {
        /// Key the contribution was destined for.
        user_id: String,
        /// The rejected raw value, rendered for logging.
        raw: String,
    },
}

/// Errors from the inbound message source.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Failed to connect to the message broker.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to subscribe to the event topic.
    #[error("subscription failed for topic '{topic}': {reason}")]
    SubscriptionFailed {
        /// The topic that failed.
        topic: String,
        /// The reason for failure.
        reason: String,
    },

    /// Network or transport error while receiving.
    #[error("transport error: {0}")]
    TransportError(String),
}

/// Errors from an outbound destination.
#[derive(Error, Debug, Clone)]
pub enum SinkError {
    /// Creating the destination schema failed.
    #[error("failed to create destination '{table}': {reason}")]
    CreateFailed {
        /// Destination table name.
        table: String,
        /// The reason for failure.
        reason: String,
    },

    /// Appending rows to the destination failed.
    ///
    /// The substrate retries delivery; snapshots restate full cumulative
    /// totals, so redelivery cannot double-count.
    #[error("failed to append to destination '{table}': {reason}")]
    WriteFailed {
        /// Destination table name.
        table: String,
        /// The reason for failure.
        reason: String,
    },
}

/// Unrecoverable configuration error, fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration value is present but unusable.
    #[error("invalid configuration for {key}: {reason}")]
    Invalid {
        /// Environment key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display_includes_message_id() {
        let err = DecodeError::Malformed {
            message_id: "3@42".to_string(),
            reason: "expected value at line 1".to_string(),
        };
        assert!(err.to_string().contains("3@42"));
    }

    #[test]
    fn value_parse_error_display_includes_raw_value() {
        let err = ValueParseError::NotNumeric {
            user_id: "UID00001".to_string(),
            raw: "\"abc\"".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("UID00001"));
        assert!(rendered.contains("abc"));
    }
}
