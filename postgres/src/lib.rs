//! `PostgreSQL` destination sinks for the retailstream pipeline.
//!
//! Two independently-addressed append-only tables:
//!
//! - **Destination A** ([`PostgresViewSink`]): flat `view_item` rows, one
//!   per event. All item fields are text; only the timestamp is typed.
//! - **Destination B** ([`PostgresAggregateSink`]): per-user purchase
//!   totals, one row per key per firing.
//!
//! Both sinks are **idempotent-on-create** (`ensure` issues
//! `CREATE TABLE IF NOT EXISTS`) and **append-only on write** (plain
//! `INSERT`s; nothing here ever updates or deletes a row). Each firing of
//! the aggregation engine appends a fresh set of restated totals, so the
//! table is a history of snapshots: consumers read the latest row per
//! key, and redelivered snapshots are harmless duplicates rather than
//! double-counts.

use retailstream_core::error::SinkError;
use retailstream_core::record::{PurchaseAggregate, ViewRecord};
use retailstream_core::sink::{AggregateSink, ViewSink};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::pin::Pin;

fn create_views_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            event_datetime TIMESTAMPTZ NOT NULL,
            event TEXT NOT NULL,
            user_id TEXT NOT NULL,
            client_id TEXT NOT NULL,
            page TEXT NOT NULL,
            page_previous TEXT NOT NULL,
            item_name TEXT,
            item_id TEXT,
            price TEXT,
            item_brand TEXT,
            item_category TEXT,
            item_category_2 TEXT,
            item_category_3 TEXT,
            item_category_4 TEXT,
            item_variant TEXT,
            item_list_name TEXT,
            item_list_id TEXT,
            quantity TEXT
        )"
    )
}

fn insert_view_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (
            event_datetime, event, user_id, client_id, page, page_previous,
            item_name, item_id, price, item_brand,
            item_category, item_category_2, item_category_3, item_category_4,
            item_variant, item_list_name, item_list_id, quantity
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
    )
}

fn create_totals_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            user_id TEXT NOT NULL,
            summed_value DOUBLE PRECISION NOT NULL
        )"
    )
}

fn insert_total_sql(table: &str) -> String {
    format!("INSERT INTO {table} (user_id, summed_value) VALUES ($1, $2)")
}

/// Destination A: append-only table of flat view rows.
#[derive(Clone)]
pub struct PostgresViewSink {
    pool: PgPool,
    table: String,
}

impl PostgresViewSink {
    /// Create a sink over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool, table: String) -> Self {
        Self { pool, table }
    }

    /// Create a sink with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::CreateFailed`] if the connection fails.
    pub async fn connect(database_url: &str, table: String) -> Result<Self, SinkError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| SinkError::CreateFailed {
                table: table.clone(),
                reason: format!("failed to connect: {e}"),
            })?;
        Ok(Self::new(pool, table))
    }

    /// The destination table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl ViewSink for PostgresViewSink {
    fn ensure(&self) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query(&create_views_sql(&self.table))
                .execute(&self.pool)
                .await
                .map_err(|e| SinkError::CreateFailed {
                    table: self.table.clone(),
                    reason: e.to_string(),
                })?;

            tracing::info!(table = %self.table, "view destination ready");
            Ok(())
        })
    }

    fn append(
        &self,
        rows: &[ViewRecord],
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
        let rows = rows.to_vec();
        Box::pin(async move {
            let sql = insert_view_sql(&self.table);
            for row in &rows {
                sqlx::query(&sql)
                    .bind(row.event_datetime)
                    .bind(&row.event)
                    .bind(&row.user_id)
                    .bind(&row.client_id)
                    .bind(&row.page)
                    .bind(&row.page_previous)
                    .bind(&row.item_name)
                    .bind(&row.item_id)
                    .bind(&row.price)
                    .bind(&row.item_brand)
                    .bind(&row.item_category)
                    .bind(&row.item_category_2)
                    .bind(&row.item_category_3)
                    .bind(&row.item_category_4)
                    .bind(&row.item_variant)
                    .bind(&row.item_list_name)
                    .bind(&row.item_list_id)
                    .bind(&row.quantity)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| SinkError::WriteFailed {
                        table: self.table.clone(),
                        reason: e.to_string(),
                    })?;
            }

            tracing::debug!(table = %self.table, rows = rows.len(), "appended view rows");
            Ok(())
        })
    }
}

/// Destination B: append-only table of per-user purchase totals.
#[derive(Clone)]
pub struct PostgresAggregateSink {
    pool: PgPool,
    table: String,
}

impl PostgresAggregateSink {
    /// Create a sink over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool, table: String) -> Self {
        Self { pool, table }
    }

    /// Create a sink with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::CreateFailed`] if the connection fails.
    pub async fn connect(database_url: &str, table: String) -> Result<Self, SinkError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| SinkError::CreateFailed {
                table: table.clone(),
                reason: format!("failed to connect: {e}"),
            })?;
        Ok(Self::new(pool, table))
    }

    /// The destination table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl AggregateSink for PostgresAggregateSink {
    fn ensure(&self) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query(&create_totals_sql(&self.table))
                .execute(&self.pool)
                .await
                .map_err(|e| SinkError::CreateFailed {
                    table: self.table.clone(),
                    reason: e.to_string(),
                })?;

            tracing::info!(table = %self.table, "aggregate destination ready");
            Ok(())
        })
    }

    fn append(
        &self,
        rows: &[PurchaseAggregate],
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + '_>> {
        let rows = rows.to_vec();
        Box::pin(async move {
            let sql = insert_total_sql(&self.table);
            for row in &rows {
                sqlx::query(&sql)
                    .bind(&row.user_id)
                    .bind(row.summed_value)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| SinkError::WriteFailed {
                        table: self.table.clone(),
                        reason: e.to_string(),
                    })?;
            }

            tracing::debug!(table = %self.table, rows = rows.len(), "appended snapshot rows");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Structural tests for the generated SQL; integration against a real
    // database happens in deployment smoke tests.

    #[test]
    fn view_ddl_is_create_if_not_exists_with_all_columns() {
        let sql = create_views_sql("item_views");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS item_views"));
        for column in [
            "event_datetime TIMESTAMPTZ",
            "item_name TEXT",
            "item_category_4 TEXT",
            "item_list_id TEXT",
            "quantity TEXT",
        ] {
            assert!(sql.contains(column), "missing column: {column}");
        }
        // Price and quantity are text in this destination, by design.
        assert!(!sql.contains("price NUMERIC"));
    }

    #[test]
    fn totals_ddl_matches_destination_schema() {
        let sql = create_totals_sql("purchase_totals");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS purchase_totals"));
        assert!(sql.contains("user_id TEXT NOT NULL"));
        assert!(sql.contains("summed_value DOUBLE PRECISION NOT NULL"));
    }

    #[test]
    fn inserts_are_plain_appends() {
        let views = insert_view_sql("item_views");
        assert!(views.starts_with("INSERT INTO item_views"));
        assert!(views.contains("$18"));
        assert!(!views.contains("ON CONFLICT"));

        let totals = insert_total_sql("purchase_totals");
        assert!(totals.starts_with("INSERT INTO purchase_totals"));
        assert!(!totals.contains("ON CONFLICT"));
        assert!(!totals.to_uppercase().contains("UPDATE"));
    }
}
