//! Direct-to-storage CLI administration (`issuer add/list/suspend`,
//! `revoke`, `revocation-root`): reads/rewrites the same TOML issuer file
//! the server loads at startup, and opens the revocation backend
//! out-of-process to mutate it. No HTTP round-trip.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zkid_core::revocation::RevocationBackend;
use zkid_types::{FieldElement, IssuerRecord, IssuerStatus, ZkIdError, ZkIdResult};

#[derive(Default, Serialize, Deserialize)]
struct IssuerFile {
    #[serde(default)]
    issuer: Vec<IssuerRecord>,
}

fn load(path: &Path) -> ZkIdResult<IssuerFile> {
    if !path.exists() {
        return Ok(IssuerFile::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ZkIdError::Config(format!("reading issuer file: {e}")))?;
    toml::from_str(&contents).map_err(|e| ZkIdError::Config(format!("parsing issuer file: {e}")))
}

fn save(path: &Path, file: &IssuerFile) -> ZkIdResult<()> {
    let serialized = toml::to_string_pretty(file).map_err(|e| ZkIdError::Config(format!("serializing issuer file: {e}")))?;
    std::fs::write(path, serialized).map_err(|e| ZkIdError::Config(format!("writing issuer file: {e}")))
}

#[allow(clippy::too_many_arguments)]
pub fn add_issuer(
    path: &Path,
    issuer: String,
    public_key: String,
    jurisdiction: String,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
) -> ZkIdResult<()> {
    let mut file = load(path)?;
    file.issuer.push(IssuerRecord {
        issuer,
        public_key,
        status: IssuerStatus::Active,
        valid_from,
        valid_to,
        jurisdiction: Some(jurisdiction).filter(|j| !j.is_empty()),
    });
    save(path, &file)
}

pub fn list_issuers(path: &Path) -> ZkIdResult<Vec<IssuerRecord>> {
    Ok(load(path)?.issuer)
}

pub fn suspend_issuer(path: &Path, issuer: &str) -> ZkIdResult<()> {
    let mut file = load(path)?;
    let now = Utc::now();
    let record = file
        .issuer
        .iter_mut()
        .find(|r| r.issuer == issuer && r.is_valid_at(now))
        .ok_or_else(|| ZkIdError::Config(format!("no active record found for issuer {issuer:?}")))?;

    if !record.status.can_transition_to(IssuerStatus::Suspended) {
        return Err(ZkIdError::Config(format!(
            "issuer {issuer:?} cannot transition from {:?} to suspended",
            record.status
        )));
    }
    record.status = IssuerStatus::Suspended;
    save(path, &file)
}

pub async fn revoke_commitment(backend: &dyn RevocationBackend, commitment: &str) -> ZkIdResult<FieldElement> {
    let field = FieldElement::from_decimal(commitment)?;
    backend.add(&field).await?;
    backend.get_root().await
}
