//! Deployment configuration for the `zkid-server` binary: where to bind, which verifying keys to load, how to
//! reach Postgres for the indexed revocation tree and audit log, and the
//! named scenarios the `/verify/scenario` route accepts. Loadable from a
//! TOML file, in the style of `zkid-core::config::VerifierConfig` and the
//! teacher's `NodeConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use zkid_core::VerifierConfig;
use zkid_types::{ClaimSpec, Scenario, ZkIdError, ZkIdResult};

fn default_bind_addr() -> String {
    "127.0.0.1:8420".to_string()
}

/// Which revocation backend to run. `None` disables gate (10) entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RevocationBackendConfig {
    #[default]
    None,
    /// In-memory sparse Merkle tree, depth from `verifier.revocation_tree.depth`.
    Sparse,
    /// Postgres-backed dense indexed tree.
    Indexed { database_url: String, table_prefix: String },
}

/// One verifying key to load at startup, keyed by proof variant
/// (`age`, `nationality`, `age-revocable`, `age-signed`,
/// `nationality-signed`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyingKeyEntry {
    pub variant: String,
    pub path: PathBuf,
}

/// A scenario definition as loaded from config, before the claims inside
/// it are validated into `zkid_types::ClaimSpec`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub claims: Vec<ClaimSpec>,
}

impl ScenarioConfig {
    fn into_scenario(self) -> ZkIdResult<Scenario> {
        for claim in &self.claims {
            claim.validate()?;
        }
        Ok(Scenario {
            id: self.id,
            name: self.name,
            description: self.description,
            claims: self.claims,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub verifying_keys: Vec<VerifyingKeyEntry>,
    #[serde(default)]
    pub issuer_registry_path: Option<PathBuf>,
    #[serde(default)]
    pub revocation_backend: RevocationBackendConfig,
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            verifier: VerifierConfig::default(),
            verifying_keys: Vec::new(),
            issuer_registry_path: None,
            revocation_backend: RevocationBackendConfig::default(),
            scenarios: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> ZkIdResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ZkIdError::Config(format!("failed to read server config: {e}")))?;
        toml::from_str(&contents).map_err(|e| ZkIdError::Config(format!("failed to parse server config TOML: {e}")))
    }

    /// Named scenarios, validated and ready to verify against.
    pub fn scenario_map(&self) -> ZkIdResult<HashMap<String, Scenario>> {
        let mut map = HashMap::with_capacity(self.scenarios.len());
        for entry in self.scenarios.clone() {
            let id = entry.id.clone();
            if map.insert(id.clone(), entry.into_scenario()?).is_some() {
                return Err(ZkIdError::Config(format!("duplicate scenario id {id:?}")));
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_to_loopback() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8420");
        assert!(config.scenarios.is_empty());
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = ServerConfig::default();
        config.bind_addr = "0.0.0.0:9000".to_string();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: ServerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.bind_addr, "0.0.0.0:9000");
    }
}
