//! The deployable streaming job.
//!
//! Wires the pipeline to its production collaborators: a Kafka-compatible
//! event topic on the inbound side and two `PostgreSQL` tables on the
//! outbound side. Runs until SIGINT/SIGTERM, then drains gracefully:
//! pending trigger-eligible aggregates are flushed before exit, bounded by
//! the configured shutdown timeout.

mod config;

use anyhow::Result;
use config::Config;
use retailstream_engine::{AccumulationMode, Pipeline, PipelineReport, SinkRouter, WindowedAggregator};
use retailstream_kafka::KafkaEventSource;
use retailstream_postgres::{PostgresAggregateSink, PostgresViewSink};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(
        project = %config.project,
        region = %config.region,
        topic = %config.kafka.topic,
        threshold = config.engine.trigger_threshold,
        "starting retailstream job"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    let views = PostgresViewSink::new(pool.clone(), config.database.views_table.clone());
    let aggregates = PostgresAggregateSink::new(pool, config.database.totals_table.clone());
    let router = SinkRouter::new(Arc::new(views), Arc::new(aggregates));

    let source = KafkaEventSource::builder()
        .brokers(&config.kafka.brokers)
        .topic(&config.kafka.topic)
        .consumer_group(&config.kafka.consumer_group)
        .build()?;

    let aggregator = WindowedAggregator::new(
        config.engine.trigger_threshold,
        AccumulationMode::Accumulating,
    );
    let pipeline = Pipeline::new(Arc::new(source), router, aggregator);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handle = tokio::spawn(pipeline.run(shutdown_rx));

    tokio::select! {
        result = &mut handle => {
            // The source ended on its own; nothing left to drain.
            let report = result??;
            log_report(&report);
            return Ok(());
        }
        () = wait_for_signal() => {
            info!("shutdown signal received, draining");
            let _ = shutdown_tx.send(true);
        }
    }

    match tokio::time::timeout(Duration::from_secs(config.shutdown_timeout), handle).await {
        Ok(result) => log_report(&result??),
        Err(_) => warn!(
            timeout_secs = config.shutdown_timeout,
            "graceful shutdown timed out; unflushed counts are lost"
        ),
    }

    Ok(())
}

fn log_report(report: &PipelineReport) {
    info!(
        messages = report.messages,
        views = report.views,
        purchases = report.purchases,
        firings = report.firings,
        decode_failures = report.decode_failures,
        extract_failures = report.extract_failures,
        value_failures = report.value_failures,
        sink_failures = report.sink_failures,
        "job finished"
    );
}

/// Resolve on SIGINT (Ctrl+C) or, on unix, SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        () = terminate => {},
    }
}
