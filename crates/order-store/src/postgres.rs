use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{
    PgPool, Postgres, Row,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{
    DailySummary, OrderDocument, OrderId, OrderQuery, OrderSort, Result, StoreError, Version,
    store::{OrderStore, SaveOptions, SummaryStore},
};

const SELECT_COLUMNS: &str = "id, version, delivery_date, production_stage, dispatch_status, \
     delivery_type, branch, product_names, invoice_needed, invoice_status, created_at, \
     updated_at, body";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<OrderDocument> {
        Ok(OrderDocument {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            version: Version::new(row.try_get("version")?),
            delivery_date: row.try_get("delivery_date")?,
            production_stage: row.try_get("production_stage")?,
            dispatch_status: row.try_get("dispatch_status")?,
            delivery_type: row.try_get("delivery_type")?,
            branch: row.try_get("branch")?,
            product_names: row.try_get("product_names")?,
            invoice_needed: row.try_get("invoice_needed")?,
            invoice_status: row.try_get("invoice_status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }

    async fn current_version(&self, id: OrderId) -> Result<Option<Version>> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(version.map(Version::new))
    }
}

/// Appends a WHERE clause for every filter set on the query.
///
/// Placeholders are numbered in the same order [`bind_filters`] binds them.
fn push_filters(sql: &mut String, query: &OrderQuery) -> usize {
    let mut param_count = 0;

    if query.production_stages.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND production_stage = ANY(${param_count})"));
    }
    if query.excluded_dispatch_statuses.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND NOT (dispatch_status = ANY(${param_count}))"));
    }
    if query.product_name.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND ${param_count} = ANY(product_names)"));
    }
    if query.delivery_type.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND delivery_type = ${param_count}"));
    }
    if query.branch_contains.is_some() {
        param_count += 1;
        // Literal match; the fragment is already lowercased.
        sql.push_str(&format!(" AND strpos(lower(branch), ${param_count}) > 0"));
    }
    if query.delivery_from.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND delivery_date >= ${param_count}"));
    }
    if query.delivery_to.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND delivery_date <= ${param_count}"));
    }
    if query.created_from.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND created_at >= ${param_count}"));
    }
    if query.created_to.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND created_at <= ${param_count}"));
    }
    if query.updated_since.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND updated_at >= ${param_count}"));
    }
    if query.invoice_needed.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND invoice_needed = ${param_count}"));
    }
    if query.invoice_status.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND invoice_status = ${param_count}"));
    }

    param_count
}

fn bind_filters<'q>(
    mut sqlx_query: Query<'q, Postgres, PgArguments>,
    query: &OrderQuery,
) -> Query<'q, Postgres, PgArguments> {
    if let Some(ref stages) = query.production_stages {
        sqlx_query = sqlx_query.bind(stages.clone());
    }
    if let Some(ref excluded) = query.excluded_dispatch_statuses {
        sqlx_query = sqlx_query.bind(excluded.clone());
    }
    if let Some(ref name) = query.product_name {
        sqlx_query = sqlx_query.bind(name.clone());
    }
    if let Some(ref delivery_type) = query.delivery_type {
        sqlx_query = sqlx_query.bind(delivery_type.clone());
    }
    if let Some(ref fragment) = query.branch_contains {
        sqlx_query = sqlx_query.bind(fragment.clone());
    }
    if let Some(from) = query.delivery_from {
        sqlx_query = sqlx_query.bind(from);
    }
    if let Some(to) = query.delivery_to {
        sqlx_query = sqlx_query.bind(to);
    }
    if let Some(from) = query.created_from {
        sqlx_query = sqlx_query.bind(from);
    }
    if let Some(to) = query.created_to {
        sqlx_query = sqlx_query.bind(to);
    }
    if let Some(since) = query.updated_since {
        sqlx_query = sqlx_query.bind(since);
    }
    if let Some(needed) = query.invoice_needed {
        sqlx_query = sqlx_query.bind(needed);
    }
    if let Some(ref status) = query.invoice_status {
        sqlx_query = sqlx_query.bind(status.clone());
    }

    sqlx_query
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, document: OrderDocument) -> Result<Version> {
        let order_id = document.id;

        let result = sqlx::query(
            r#"
            INSERT INTO orders (id, version, delivery_date, production_stage, dispatch_status,
                                delivery_type, branch, product_names, invoice_needed,
                                invoice_status, created_at, updated_at, body)
            VALUES ($1, 1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(document.delivery_date)
        .bind(&document.production_stage)
        .bind(&document.dispatch_status)
        .bind(&document.delivery_type)
        .bind(&document.branch)
        .bind(&document.product_names)
        .bind(document.invoice_needed)
        .bind(&document.invoice_status)
        .bind(document.created_at)
        .bind(document.updated_at)
        .bind(&document.body)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Version::first()),
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                let actual = self
                    .current_version(order_id)
                    .await?
                    .unwrap_or(Version::first());
                Err(StoreError::ConcurrencyConflict {
                    order_id,
                    expected: Version::initial(),
                    actual,
                })
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn save(&self, document: OrderDocument, options: SaveOptions) -> Result<Version> {
        let order_id = document.id;

        let mut sql = String::from(
            r#"
            UPDATE orders SET
                version = version + 1,
                delivery_date = $2,
                production_stage = $3,
                dispatch_status = $4,
                delivery_type = $5,
                branch = $6,
                product_names = $7,
                invoice_needed = $8,
                invoice_status = $9,
                updated_at = $10,
                body = $11
            WHERE id = $1
            "#,
        );
        if options.expected_version.is_some() {
            sql.push_str(" AND version = $12");
        }
        sql.push_str(" RETURNING version");

        let mut sqlx_query = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .bind(document.delivery_date)
            .bind(&document.production_stage)
            .bind(&document.dispatch_status)
            .bind(&document.delivery_type)
            .bind(&document.branch)
            .bind(&document.product_names)
            .bind(document.invoice_needed)
            .bind(&document.invoice_status)
            .bind(document.updated_at)
            .bind(&document.body);
        if let Some(expected) = options.expected_version {
            sqlx_query = sqlx_query.bind(expected.as_i64());
        }

        let row = sqlx_query.fetch_optional(&self.pool).await?;
        if let Some(row) = row {
            return Ok(Version::new(row.try_get("version")?));
        }

        // No row updated: either the order is gone or the version moved
        match self.current_version(order_id).await? {
            None => Err(StoreError::NotFound(order_id)),
            Some(actual) => {
                tracing::debug!(%order_id, %actual, "Order save lost a version race");
                Err(StoreError::ConcurrencyConflict {
                    order_id,
                    expected: options.expected_version.unwrap_or(Version::initial()),
                    actual,
                })
            }
        }
    }

    async fn get(&self, id: OrderId) -> Result<Option<OrderDocument>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn find(&self, query: OrderQuery) -> Result<Vec<OrderDocument>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = push_filters(&mut sql, &query);

        match query.sort {
            OrderSort::DeliveryDateAsc => {
                sql.push_str(" ORDER BY delivery_date ASC, created_at ASC, id ASC")
            }
            OrderSort::CreatedAtDesc => sql.push_str(" ORDER BY created_at DESC, id ASC"),
        }

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = bind_filters(sqlx::query(&sql), &query);
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn count(&self, query: OrderQuery) -> Result<usize> {
        let mut sql = String::from("SELECT COUNT(*) AS count FROM orders WHERE 1=1");
        push_filters(&mut sql, &query);

        let row = bind_filters(sqlx::query(&sql), &query)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;

        Ok(count as usize)
    }
}

#[async_trait]
impl SummaryStore for PostgresOrderStore {
    async fn upsert_summary(&self, summary: DailySummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_summaries (date, total_sales_cents, transaction_count, last_updated)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (date) DO UPDATE SET
                total_sales_cents = EXCLUDED.total_sales_cents,
                transaction_count = EXCLUDED.transaction_count,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(summary.date)
        .bind(summary.total_sales_cents)
        .bind(summary.transaction_count)
        .bind(summary.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn summaries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailySummary>> {
        let rows = sqlx::query(
            r#"
            SELECT date, total_sales_cents, transaction_count, last_updated
            FROM daily_summaries
            WHERE date >= $1 AND date <= $2
            ORDER BY date ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(DailySummary {
                    date: row.try_get("date")?,
                    total_sales_cents: row.try_get("total_sales_cents")?,
                    transaction_count: row.try_get("transaction_count")?,
                    last_updated: row.try_get("last_updated")?,
                })
            })
            .collect()
    }
}
