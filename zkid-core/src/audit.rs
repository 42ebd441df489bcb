//! Audit log: append-only records for issuer and
//! revocation administrative actions. An in-memory reference implementation
//! plus a `sqlx`-backed variant, modeled after the same auto-increment,
//! range-scan discipline `IndexedTree` uses for its leaves table.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::{PgPool, Row};

use zkid_types::{AuditRecord, ZkIdError, ZkIdResult};

use crate::revocation::is_valid_sql_identifier;

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append a record. Never fails the calling operation on the caller's
    /// behalf — implementations that can fail (e.g. a DB write) should log
    /// the failure internally rather than propagate it into request paths
    /// that would otherwise have already succeeded.
    async fn append(&self, record: AuditRecord);

    /// Most recent `limit` records, newest first.
    async fn recent(&self, limit: usize) -> Vec<AuditRecord>;
}

#[derive(Default)]
pub struct InMemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }

    async fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        let records = self.records.lock();
        records.iter().rev().take(limit).cloned().collect()
    }
}

/// Postgres-backed audit log sharing the pool an `IndexedTree` is opened
/// against. The table uses a `BIGSERIAL` id as its monotonic range-scan key.
pub struct PgAuditLog {
    pool: PgPool,
    table: String,
}

impl PgAuditLog {
    pub async fn open(pool: PgPool, table_name: &str) -> ZkIdResult<Self> {
        if !is_valid_sql_identifier(table_name) {
            return Err(ZkIdError::Config(format!("invalid audit table name '{table_name}'")));
        }

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table_name} (
                id BIGSERIAL PRIMARY KEY,
                timestamp TIMESTAMPTZ NOT NULL,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                subject TEXT NOT NULL,
                detail TEXT
            )"
        ))
        .execute(&pool)
        .await
        .map_err(|e| ZkIdError::Config(format!("failed to create audit table: {e}")))?;

        Ok(Self {
            pool,
            table: table_name.to_string(),
        })
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn append(&self, record: AuditRecord) {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (timestamp, actor, action, subject, detail) VALUES ($1, $2, $3, $4, $5)",
            self.table
        ))
        .bind(record.timestamp)
        .bind(&record.actor)
        .bind(&record.action)
        .bind(&record.subject)
        .bind(&record.detail)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!(error = %e, "failed to append audit record");
        }
    }

    async fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        let rows = sqlx::query(&format!(
            "SELECT timestamp, actor, action, subject, detail FROM {} ORDER BY id DESC LIMIT $1",
            self.table
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(|row| AuditRecord {
                    timestamp: row.try_get("timestamp").unwrap_or_else(|_| Utc::now()),
                    actor: row.try_get("actor").unwrap_or_default(),
                    action: row.try_get("action").unwrap_or_default(),
                    subject: row.try_get("subject").unwrap_or_default(),
                    detail: row.try_get("detail").ok(),
                })
                .collect(),
            Err(e) => {
                tracing::error!(error = %e, "failed to scan audit records");
                Vec::new()
            }
        }
    }
}
