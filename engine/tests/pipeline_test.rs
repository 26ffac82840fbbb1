//! End-to-end pipeline tests over in-memory boundaries.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use retailstream_core::source::{EventSource, RawMessage};
use retailstream_engine::{AccumulationMode, Pipeline, PipelineReport, SinkRouter, WindowedAggregator};
use retailstream_testing::payloads;
use retailstream_testing::{InMemoryEventSource, RecordingAggregateSink, RecordingViewSink};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

struct Harness {
    views: RecordingViewSink,
    aggregates: RecordingAggregateSink,
}

impl Harness {
    fn new() -> Self {
        Self {
            views: RecordingViewSink::new(),
            aggregates: RecordingAggregateSink::new(),
        }
    }

    fn pipeline(&self, source: Arc<dyn EventSource>, threshold: usize) -> Pipeline {
        let router = SinkRouter::new(
            Arc::new(self.views.clone()),
            Arc::new(self.aggregates.clone()),
        );
        let aggregator = WindowedAggregator::new(threshold, AccumulationMode::Accumulating);
        Pipeline::new(source, router, aggregator)
    }

    /// Run over a finite message list; stream end acts as shutdown.
    async fn run(&self, messages: Vec<RawMessage>, threshold: usize) -> PipelineReport {
        let source = Arc::new(InMemoryEventSource::new(messages));
        let (_tx, rx) = watch::channel(false);
        self.pipeline(source, threshold).run(rx).await.unwrap()
    }
}

#[tokio::test]
async fn thousand_mixed_events_split_exactly() {
    let harness = Harness::new();

    let mut messages = Vec::new();
    let mut expected: HashMap<String, f64> = HashMap::new();
    for i in 0u64..1000 {
        let user = format!("UID0000{}", i % 5 + 1);
        // 4 views, 3 carts, 3 purchases out of every 10 events.
        let msg = match i % 10 {
            0..=3 => payloads::view_message(i, &user),
            4..=6 => payloads::cart_message(i, &user),
            _ => {
                let value = f64::from(u32::try_from(i % 7).unwrap() + 1);
                *expected.entry(user.clone()).or_insert(0.0) += value;
                payloads::purchase_message(i, &user, value)
            }
        };
        messages.push(msg);
    }

    let report = harness.run(messages, 10).await;

    assert_eq!(report.messages, 1000);
    assert_eq!(report.views, 400);
    assert_eq!(report.carted, 300);
    assert_eq!(report.purchases, 300);
    assert_eq!(report.decode_failures, 0);
    assert_eq!(report.sink_failures, 0);

    // Exactly 400 flat rows on destination A; cart events produced none.
    assert_eq!(harness.views.rows().len(), 400);

    // 300 purchases with a threshold of 10: thirty firings, nothing left
    // to flush at stream end.
    assert_eq!(harness.aggregates.batches().len(), 30);
    assert_eq!(report.firings, 30);

    // Final restated totals equal the manually computed per-key sums.
    assert_eq!(harness.aggregates.latest_totals(), expected);
}

#[tokio::test]
async fn fires_at_the_tenth_purchase_with_expected_totals() {
    let harness = Harness::new();

    let mut messages = vec![
        payloads::purchase_message(0, "u1", 10.0),
        payloads::purchase_message(1, "u2", 5.0),
        payloads::purchase_message(2, "u1", 7.0),
    ];
    for i in 3u64..10 {
        messages.push(payloads::purchase_message(i, "u3", 1.0));
    }

    let report = harness.run(messages, 10).await;

    assert!(report.firings >= 1);
    let batches = harness.aggregates.batches();
    let first: HashMap<_, _> = batches[0]
        .iter()
        .map(|row| (row.user_id.clone(), row.summed_value))
        .collect();
    assert_eq!(first["u1"], 17.0);
    assert_eq!(first["u2"], 5.0);
    assert_eq!(first["u3"], 7.0);
}

#[tokio::test]
async fn empty_item_list_drops_the_record_not_the_stream() {
    let harness = Harness::new();

    let messages = vec![
        payloads::view_message_with_items(0, "UID00001", serde_json::json!([])),
        payloads::view_message(1, "UID00002"),
    ];
    let report = harness.run(messages, 10).await;

    assert_eq!(report.extract_failures, 1);
    assert_eq!(report.views, 1);
    let rows = harness.views.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, "UID00002");
}

#[tokio::test]
async fn undecodable_message_is_dropped_and_logged() {
    let harness = Harness::new();

    let messages = vec![
        payloads::garbage_message(0),
        payloads::view_message(1, "UID00001"),
    ];
    let report = harness.run(messages, 10).await;

    assert_eq!(report.decode_failures, 1);
    assert_eq!(report.views, 1);
}

#[tokio::test]
async fn transport_error_does_not_stop_the_stream() {
    let harness = Harness::new();

    let source = Arc::new(InMemoryEventSource::from_results(vec![
        Err(retailstream_core::SourceError::TransportError(
            "broker hiccup".to_string(),
        )),
        Ok(payloads::view_message(1, "UID00001")),
    ]));
    let (_tx, rx) = watch::channel(false);
    let report = harness.pipeline(source, 10).run(rx).await.unwrap();

    assert_eq!(report.views, 1);
}

#[tokio::test]
async fn unrecognized_kinds_reach_no_destination() {
    let harness = Harness::new();

    let scroll = payloads::message(
        0,
        &serde_json::json!({
            "event_datetime": "2024-11-05 14:44:12",
            "event": "scroll_depth",
            "user_id": "UID00001",
            "client_id": "CID-1",
            "page": "/home",
            "page_previous": "/home",
        }),
    );
    let report = harness.run(vec![scroll], 10).await;

    assert_eq!(report.unrecognized, 1);
    assert!(harness.views.rows().is_empty());
    assert!(harness.aggregates.batches().is_empty());
}

#[tokio::test]
async fn cart_events_produce_zero_output_in_either_destination() {
    let harness = Harness::new();

    let messages = (0u64..20)
        .map(|i| payloads::cart_message(i, "UID00001"))
        .collect();
    let report = harness.run(messages, 10).await;

    assert_eq!(report.carted, 20);
    assert!(harness.views.rows().is_empty());
    assert!(harness.aggregates.batches().is_empty());
}

#[tokio::test]
async fn view_destination_failure_does_not_block_aggregates() {
    let harness = Harness::new();
    harness.views.fail_writes(true);

    let mut messages = vec![payloads::view_message(0, "UID00001")];
    for i in 1u64..=10 {
        messages.push(payloads::purchase_message(i, "u1", 2.0));
    }
    let report = harness.run(messages, 10).await;

    assert_eq!(report.sink_failures, 1);
    assert_eq!(report.views, 0);
    assert_eq!(harness.aggregates.latest_totals()["u1"], 20.0);
}

#[tokio::test]
async fn aggregate_destination_failure_does_not_block_views() {
    let harness = Harness::new();
    harness.aggregates.fail_writes(true);

    let mut messages: Vec<RawMessage> = (0u64..10)
        .map(|i| payloads::purchase_message(i, "u1", 1.0))
        .collect();
    messages.push(payloads::view_message(10, "UID00001"));
    let report = harness.run(messages, 10).await;

    assert!(report.sink_failures >= 1);
    assert_eq!(report.views, 1);
    assert_eq!(harness.views.rows().len(), 1);
}

#[tokio::test]
async fn redelivered_purchases_restate_totals_like_crash_retry() {
    let harness = Harness::new();

    // The same logical purchase delivered twenty times: at-least-once
    // delivery makes this indistinguishable from crash-retry. Each firing
    // restates the full cumulative total rather than a delta, so the
    // destination sees a monotonic series it can apply idempotently.
    let messages = (0u64..20)
        .map(|_| payloads::purchase_message(7, "u1", 1.0))
        .collect();
    let report = harness.run(messages, 10).await;

    assert_eq!(report.firings, 2);
    let batches = harness.aggregates.batches();
    assert_eq!(batches[0][0].summed_value, 10.0);
    assert_eq!(batches[1][0].summed_value, 20.0);
}

#[tokio::test]
async fn non_numeric_value_leaves_other_keys_untouched() {
    let harness = Harness::new();

    let messages = vec![
        payloads::purchase_message(0, "u1", 10.0),
        payloads::purchase_message(1, "u2", 5.0),
        payloads::purchase_message_with_value(2, "u1", &serde_json::json!("free")),
        payloads::purchase_message(3, "u1", 7.0),
    ];
    let report = harness.run(messages, 10).await;

    assert_eq!(report.value_failures, 1);
    // Flush at stream end carries the surviving contributions.
    let totals = harness.aggregates.latest_totals();
    assert_eq!(totals["u1"], 17.0);
    assert_eq!(totals["u2"], 5.0);
}

#[tokio::test]
async fn stream_end_flushes_pending_aggregates() {
    let harness = Harness::new();

    let messages = vec![
        payloads::purchase_message(0, "u1", 4.0),
        payloads::purchase_message(1, "u2", 6.0),
        payloads::purchase_message(2, "u1", 1.0),
    ];
    let report = harness.run(messages, 10).await;

    // Below the trigger threshold, so the only emission is the flush.
    assert_eq!(report.firings, 1);
    let totals = harness.aggregates.latest_totals();
    assert_eq!(totals["u1"], 5.0);
    assert_eq!(totals["u2"], 6.0);
}

#[tokio::test]
async fn destinations_are_prepared_exactly_once() {
    let harness = Harness::new();
    let _ = harness.run(vec![payloads::view_message(0, "UID00001")], 10).await;

    assert_eq!(harness.views.ensure_calls(), 1);
    assert_eq!(harness.aggregates.ensure_calls(), 1);
}

#[tokio::test]
async fn shutdown_signal_stops_the_loop() {
    let harness = Harness::new();

    let messages = (0u64..1000)
        .map(|i| payloads::view_message(i, "UID00001"))
        .collect();
    let source = Arc::new(InMemoryEventSource::new(messages));

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let report = harness.pipeline(source, 10).run(rx).await.unwrap();
    assert!(report.messages < 1000);
}
