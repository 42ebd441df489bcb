//! Issuer registry: issuer key records with status and
//! validity windows, key rotation modeled as multiple records per issuer
//! name. An in-memory reference implementation, plus a TOML-file-backed
//! variant loaded once at startup.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Deserialize;

use zkid_types::{IssuerRecord, ZkIdError, ZkIdResult};

#[async_trait]
pub trait IssuerRegistry: Send + Sync {
    /// The record for `name` that is valid right now, if any.
    async fn get_issuer(&self, name: &str) -> Option<IssuerRecord>;

    /// Upsert a record: inserted records for a new `(issuer, valid_from)`
    /// pair are appended; a record matching an existing one by position is
    /// unsupported — callers model rotation via distinct, non-overlapping
    /// validity windows.
    async fn upsert(&self, record: IssuerRecord);

    /// All records ever registered for `name`, for dashboard display.
    async fn list_records(&self, name: &str) -> Vec<IssuerRecord>;
}

#[derive(Default)]
pub struct InMemoryIssuerRegistry {
    records: RwLock<HashMap<String, Vec<IssuerRecord>>>,
}

impl InMemoryIssuerRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssuerRegistry for InMemoryIssuerRegistry {
    async fn get_issuer(&self, name: &str) -> Option<IssuerRecord> {
        let now = Utc::now();
        self.records
            .read()
            .get(name)
            .and_then(|records| records.iter().find(|r| r.is_valid_at(now)).cloned())
    }

    async fn upsert(&self, record: IssuerRecord) {
        self.records.write().entry(record.issuer.clone()).or_default().push(record);
    }

    async fn list_records(&self, name: &str) -> Vec<IssuerRecord> {
        self.records.read().get(name).cloned().unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct IssuerRegistryFile {
    #[serde(default)]
    issuer: Vec<IssuerRecord>,
}

/// Load a registry from a TOML file at startup: a `[[issuer]]` array of
/// tables.
pub fn load_from_toml_file(path: impl AsRef<Path>) -> ZkIdResult<InMemoryIssuerRegistry> {
    let contents = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ZkIdError::Config(format!("failed to read issuer registry file: {e}")))?;
    let parsed: IssuerRegistryFile =
        toml::from_str(&contents).map_err(|e| ZkIdError::Config(format!("failed to parse issuer registry TOML: {e}")))?;

    let registry = InMemoryIssuerRegistry::new();
    {
        let mut records = registry.records.write();
        for record in parsed.issuer {
            records.entry(record.issuer.clone()).or_default().push(record);
        }
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkid_types::IssuerStatus;

    fn record(issuer: &str) -> IssuerRecord {
        IssuerRecord {
            issuer: issuer.to_string(),
            public_key: "aa".repeat(32),
            status: IssuerStatus::Active,
            valid_from: None,
            valid_to: None,
            jurisdiction: None,
        }
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let registry = InMemoryIssuerRegistry::new();
        registry.upsert(record("issuer-a")).await;
        assert!(registry.get_issuer("issuer-a").await.is_some());
        assert!(registry.get_issuer("issuer-b").await.is_none());
    }

    #[tokio::test]
    async fn revoked_issuer_is_not_returned_as_currently_valid() {
        let registry = InMemoryIssuerRegistry::new();
        let mut rec = record("issuer-a");
        rec.status = IssuerStatus::Revoked;
        registry.upsert(rec).await;
        assert!(registry.get_issuer("issuer-a").await.is_none());
        assert_eq!(registry.list_records("issuer-a").await.len(), 1);
    }

    #[tokio::test]
    async fn list_records_exposes_rotation_history() {
        let registry = InMemoryIssuerRegistry::new();
        registry.upsert(record("issuer-a")).await;
        registry.upsert(record("issuer-a")).await;
        assert_eq!(registry.list_records("issuer-a").await.len(), 2);
    }
}
