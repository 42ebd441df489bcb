//! Verifying-key cache behind a pluggable `VerifyingKeyStore`. Generalizes
//! a single cached `PreparedVerifyingKey<Bn254>` to one key per proof
//! variant behind a trait, so callers can swap a file-backed or
//! registry-backed implementation in.

use std::collections::HashMap;
use std::sync::Arc;

use ark_bn254::Bn254;
use ark_groth16::PreparedVerifyingKey;
use async_trait::async_trait;
use parking_lot::RwLock;

use zkid_crypto::{load_verifying_key, prepare_verifying_key};
use zkid_types::{ZkIdError, ZkIdResult};

#[async_trait]
pub trait VerifyingKeyStore: Send + Sync {
    async fn get(&self, variant: &str) -> ZkIdResult<Arc<PreparedVerifyingKey<Bn254>>>;
}

/// In-memory store loaded once at startup from compressed `ark-serialize`
/// bytes, one per variant. Preparation happens eagerly on `insert` so the
/// hot verify path never blocks on it.
#[derive(Default)]
pub struct StaticVerifyingKeyStore {
    keys: RwLock<HashMap<String, Arc<PreparedVerifyingKey<Bn254>>>>,
}

impl StaticVerifyingKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, variant: impl Into<String>, vk_bytes: &[u8]) -> ZkIdResult<()> {
        let vk = load_verifying_key(vk_bytes)?;
        let prepared = prepare_verifying_key(&vk)?;
        self.keys.write().insert(variant.into(), Arc::new(prepared));
        Ok(())
    }
}

#[async_trait]
impl VerifyingKeyStore for StaticVerifyingKeyStore {
    async fn get(&self, variant: &str) -> ZkIdResult<Arc<PreparedVerifyingKey<Bn254>>> {
        self.keys
            .read()
            .get(variant)
            .cloned()
            .ok_or_else(|| ZkIdError::Config(format!("no verifying key configured for proof variant '{variant}'")))
    }
}
