use serde::{Deserialize, Serialize};

use crate::error::{ZkIdError, ZkIdResult};

/// The kind of predicate a single claim in a bundle proves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimType {
    Age,
    AgeRevocable,
    Nationality,
}

/// One claim within a `MultiClaimRequest`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimSpec {
    pub label: String,
    pub claim_type: ClaimType,
    pub min_age: Option<u8>,
    pub target_nationality: Option<u16>,
}

impl ClaimSpec {
    pub fn validate(&self) -> ZkIdResult<()> {
        if self.label.is_empty() {
            return Err(ZkIdError::Validation("claim label must not be empty".into()));
        }
        match self.claim_type {
            ClaimType::Age | ClaimType::AgeRevocable => match self.min_age {
                Some(age) if age <= 150 => {}
                _ => {
                    return Err(ZkIdError::Validation(format!(
                        "claim {:?} requires min_age in [0,150]",
                        self.label
                    )))
                }
            },
            ClaimType::Nationality => match self.target_nationality {
                Some(n) if (1..=999).contains(&n) => {}
                _ => {
                    return Err(ZkIdError::Validation(format!(
                        "claim {:?} requires target_nationality in [1,999]",
                        self.label
                    )))
                }
            },
        }
        Ok(())
    }
}

/// A bundle of claims proved together under one shared nonce/timestamp.
/// Construction enforces non-empty, uniquely-labeled claims.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiClaimRequest {
    pub claims: Vec<ClaimSpec>,
    pub nonce: String,
    pub request_timestamp_ms: i64,
}

impl MultiClaimRequest {
    pub fn new(claims: Vec<ClaimSpec>, nonce: String, request_timestamp_ms: i64) -> ZkIdResult<Self> {
        if claims.is_empty() {
            return Err(ZkIdError::Validation("claim list must not be empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for claim in &claims {
            claim.validate()?;
            if !seen.insert(claim.label.clone()) {
                return Err(ZkIdError::Validation(format!(
                    "duplicate claim label {:?}",
                    claim.label
                )));
            }
        }
        Ok(Self {
            claims,
            nonce,
            request_timestamp_ms,
        })
    }
}

/// A named, reusable bundle of claims.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub description: String,
    pub claims: Vec<ClaimSpec>,
}

/// Per-claim verification outcome inside an aggregated bundle result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimResult {
    pub label: String,
    pub verified: bool,
    pub error: Option<String>,
}

/// Aggregated result of verifying a `MultiClaimRequest` or `Scenario`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub all_verified: bool,
    pub verified_count: usize,
    pub total_count: usize,
    pub results: Vec<ClaimResult>,
}

impl AggregatedResult {
    pub fn from_results(results: Vec<ClaimResult>) -> Self {
        let total_count = results.len();
        let verified_count = results.iter().filter(|r| r.verified).count();
        Self {
            all_verified: verified_count == total_count,
            verified_count,
            total_count,
            results,
        }
    }

    pub fn failed_labels(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.verified)
            .map(|r| r.label.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_claim_list() {
        assert!(MultiClaimRequest::new(vec![], "n".into(), 0).is_err());
    }

    #[test]
    fn rejects_duplicate_labels() {
        let claims = vec![
            ClaimSpec {
                label: "a".into(),
                claim_type: ClaimType::Age,
                min_age: Some(18),
                target_nationality: None,
            },
            ClaimSpec {
                label: "a".into(),
                claim_type: ClaimType::Age,
                min_age: Some(21),
                target_nationality: None,
            },
        ];
        assert!(MultiClaimRequest::new(claims, "n".into(), 0).is_err());
    }

    #[test]
    fn aggregation_all_verified_iff_counts_match() {
        let results = vec![
            ClaimResult { label: "a".into(), verified: true, error: None },
            ClaimResult { label: "b".into(), verified: false, error: Some("x".into()) },
        ];
        let agg = AggregatedResult::from_results(results);
        assert!(!agg.all_verified);
        assert_eq!(agg.verified_count, 1);
        assert_eq!(agg.total_count, 2);
        assert_eq!(agg.failed_labels(), vec!["b"]);
    }
}
