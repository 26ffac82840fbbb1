//! Event decoder: raw message bytes to structured events.

use crate::error::DecodeError;
use crate::event::Event;
use crate::source::RawMessage;

/// Decode a raw message payload into an [`Event`].
///
/// On failure the message is dropped by the caller (and logged with its
/// transport id); decoding never aborts the stream and never retries.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] when the payload is not a valid JSON
/// event envelope.
pub fn decode_event(message: &RawMessage) -> Result<Event, DecodeError> {
    serde_json::from_slice(&message.payload).map_err(|e| DecodeError::Malformed {
        message_id: message.id.clone(),
        reason: e.to_string(),
    })
}
