use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issuer key record status. Transitions: `Active <-> Suspended`,
/// `Active|Suspended -> Revoked` (terminal); see `can_transition_to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuerStatus {
    Active,
    Suspended,
    Revoked,
}

impl IssuerStatus {
    /// Whether `self -> next` is an allowed transition.
    pub fn can_transition_to(self, next: IssuerStatus) -> bool {
        use IssuerStatus::*;
        matches!(
            (self, next),
            (Active, Suspended) | (Suspended, Active) | (Active, Revoked) | (Suspended, Revoked)
        )
    }
}

/// An issuer's public key and validity window. Key rotation is modeled as
/// multiple records sharing `issuer` with non-overlapping `valid_from`/
/// `valid_to` windows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuerRecord {
    pub issuer: String,
    /// Hex-encoded 32-byte Ed25519 public key.
    pub public_key: String,
    pub status: IssuerStatus,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub jurisdiction: Option<String>,
}

impl IssuerRecord {
    /// Whether the record is usable at `at`: status active and within its
    /// (independent) validity window.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        if self.status != IssuerStatus::Active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if at < from {
                return false;
            }
        }
        if let Some(to) = self.valid_to {
            if at > to {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_is_terminal() {
        assert!(!IssuerStatus::Revoked.can_transition_to(IssuerStatus::Active));
        assert!(!IssuerStatus::Revoked.can_transition_to(IssuerStatus::Suspended));
    }

    #[test]
    fn active_suspended_toggle() {
        assert!(IssuerStatus::Active.can_transition_to(IssuerStatus::Suspended));
        assert!(IssuerStatus::Suspended.can_transition_to(IssuerStatus::Active));
    }
}
