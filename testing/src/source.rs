//! In-memory message source for driving the pipeline in tests.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use futures::stream;
use retailstream_core::error::SourceError;
use retailstream_core::source::{EventSource, MessageStream, RawMessage};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// A finite, in-memory [`EventSource`].
///
/// `subscribe` yields the queued items in order and then ends the stream,
/// which the pipeline treats as a shutdown signal. Transport errors can be
/// interleaved to verify that the pipeline logs and keeps reading.
///
/// Each source is single-shot: a second `subscribe` sees an empty stream.
pub struct InMemoryEventSource {
    items: Mutex<Vec<Result<RawMessage, SourceError>>>,
}

impl InMemoryEventSource {
    /// A source that delivers `messages` in order, then ends.
    #[must_use]
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            items: Mutex::new(messages.into_iter().map(Ok).collect()),
        }
    }

    /// A source over explicit results, for interleaving transport errors.
    #[must_use]
    pub fn from_results(items: Vec<Result<RawMessage, SourceError>>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }
}

impl EventSource for InMemoryEventSource {
    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<MessageStream, SourceError>> + Send + '_>> {
        let items = std::mem::take(&mut *self.items.lock().unwrap());
        Box::pin(async move { Ok(Box::pin(stream::iter(items)) as MessageStream) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads;
    use futures::StreamExt;

    #[tokio::test]
    async fn delivers_messages_in_order_then_ends() {
        let source = InMemoryEventSource::new(vec![
            payloads::view_message(1, "UID00001"),
            payloads::purchase_message(2, "UID00001", 9.5),
        ]);

        let mut stream = source.subscribe().await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().id, "1");
        assert_eq!(stream.next().await.unwrap().unwrap().id, "2");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn second_subscribe_is_empty() {
        let source = InMemoryEventSource::new(vec![payloads::view_message(1, "UID00001")]);
        let _ = source.subscribe().await.unwrap();

        let mut second = source.subscribe().await.unwrap();
        assert!(second.next().await.is_none());
    }
}
