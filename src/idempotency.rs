use crate::db_types::IdempotencyRecord;
use crate::error::StoreError;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persistent record of which calls already produced a ticket.
///
/// `check` and `record` are independent calls, so two concurrent deliveries of one call can
/// both miss in `check`. `record` is insert-if-absent in every implementation: an existing
/// record is never replaced, and the return value tells the caller whether it won.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn check(&self, call_id: &str) -> Result<Option<IdempotencyRecord>, StoreError>;

    /// Returns `false` when a record for `call_id` already existed.
    async fn record(&self, call_id: &str, ticket_id: i64) -> Result<bool, StoreError>;
}

pub struct PgIdempotencyStore {
    db_pool: Pool<Postgres>,
}

impl PgIdempotencyStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        info!("connected to idempotency database");
        Ok(Self { db_pool })
    }
}

#[async_trait]
impl IdempotencyStore for PgIdempotencyStore {
    async fn check(&self, call_id: &str) -> Result<Option<IdempotencyRecord>, StoreError> {
        let record = sqlx::query_as::<_, IdempotencyRecord>(
            "SELECT call_id, ticket_id, processed_at FROM processed_calls WHERE call_id = $1",
        )
        .bind(call_id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(record)
    }

    async fn record(&self, call_id: &str, ticket_id: i64) -> Result<bool, StoreError> {
        let record = IdempotencyRecord::new(call_id, ticket_id);
        let result = sqlx::query(
            "INSERT INTO processed_calls (call_id, ticket_id, processed_at)
             VALUES ($1, $2, $3) ON CONFLICT (call_id) DO NOTHING",
        )
        .bind(&record.call_id)
        .bind(record.ticket_id)
        .bind(record.processed_at)
        .execute(&self.db_pool)
        .await?;
        debug!(call_id, ticket_id, rows = result.rows_affected(), "recorded processed call");
        Ok(result.rows_affected() == 1)
    }
}

/// Process-local store, used when no database is configured.
#[derive(Default)]
pub struct MemoryIdempotencyStore {
    records: RwLock<HashMap<String, IdempotencyRecord>>,
}

impl MemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for MemoryIdempotencyStore {
    async fn check(&self, call_id: &str) -> Result<Option<IdempotencyRecord>, StoreError> {
        Ok(self.records.read().await.get(call_id).cloned())
    }

    async fn record(&self, call_id: &str, ticket_id: i64) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(call_id) {
            return Ok(false);
        }
        records.insert(
            call_id.to_string(),
            IdempotencyRecord::new(call_id, ticket_id),
        );
        Ok(true)
    }
}
