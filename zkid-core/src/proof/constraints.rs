//! Local sanity checks on a proof envelope before it ever reaches
//! `snark_verify`. All violations are
//! accumulated and reported together, never just the first.

use chrono::{Datelike, Utc};

use zkid_crypto::field_to_fr;
use zkid_types::{FieldElement, ProofEnvelope};

const MIN_CURRENT_YEAR: u32 = 2020;
const TIMESTAMP_WINDOW_MS: i64 = 5 * 60 * 1000;

fn is_parseable_field(field: &FieldElement) -> bool {
    field_to_fr(field).is_ok()
}

/// Run every local constraint against `envelope`, returning the (possibly
/// empty) list of violations. Empty means "ok".
pub fn validate_constraints(envelope: &ProofEnvelope) -> Vec<String> {
    let mut errors = Vec::new();
    let now_ms = Utc::now().timestamp_millis();

    if let Some(current_year) = current_year_signal(envelope) {
        let max_year = Utc::now().year() as u32 + 1;
        if !(MIN_CURRENT_YEAR..=max_year).contains(&current_year) {
            errors.push(format!(
                "current_year {current_year} out of range [{MIN_CURRENT_YEAR}, now+1]"
            ));
        }
    }

    if let Some(min_age) = envelope.min_age() {
        if min_age > 150 {
            errors.push(format!("min_age {min_age} out of range [0, 150]"));
        }
    }

    if let Some(target_nationality) = envelope.target_nationality() {
        if target_nationality < 1 || target_nationality > 999 {
            errors.push(format!("target_nationality {target_nationality} out of range [1, 999]"));
        }
    }

    let credential_hash = envelope.credential_hash();
    if credential_hash.is_zero() || !is_parseable_field(credential_hash) {
        errors.push("credential_hash must be a non-zero, parseable field element".to_string());
    }

    if let Some(merkle_root) = envelope.merkle_root() {
        if merkle_root.is_zero() || !is_parseable_field(merkle_root) {
            errors.push("merkle_root must be a non-zero, parseable field element".to_string());
        }
    }

    if envelope.nonce().is_empty() {
        errors.push("nonce must not be empty".to_string());
    }

    let ts = envelope.request_timestamp_ms();
    if ts <= 0 {
        errors.push("request_timestamp_ms must be positive".to_string());
    } else if (now_ms - ts).abs() > TIMESTAMP_WINDOW_MS {
        errors.push(format!(
            "request_timestamp_ms {ts} is outside the {TIMESTAMP_WINDOW_MS}ms wall-clock window"
        ));
    }

    errors
}

fn current_year_signal(envelope: &ProofEnvelope) -> Option<u32> {
    match envelope {
        ProofEnvelope::Age { public_signals, .. } => Some(public_signals.current_year),
        ProofEnvelope::AgeRevocable { public_signals, .. } => Some(public_signals.current_year),
        ProofEnvelope::AgeSigned { public_signals, .. } => Some(public_signals.current_year),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkid_types::{Groth16ProofData, NationalitySignals};

    fn proof() -> Groth16ProofData {
        Groth16ProofData::new(
            [FieldElement::zero(), FieldElement::zero()],
            [[FieldElement::zero(), FieldElement::zero()], [FieldElement::zero(), FieldElement::zero()]],
            [FieldElement::zero(), FieldElement::zero()],
        )
    }

    #[test]
    fn accumulates_multiple_violations() {
        let envelope = ProofEnvelope::Nationality {
            proof: proof(),
            public_signals: NationalitySignals {
                target_nationality: 0,
                credential_hash: FieldElement::zero(),
                nonce: String::new(),
                request_timestamp_ms: -1,
            },
        };
        let errors = validate_constraints(&envelope);
        assert!(errors.len() >= 4, "expected multiple violations, got {errors:?}");
    }

    #[test]
    fn accepts_well_formed_signals() {
        let envelope = ProofEnvelope::Nationality {
            proof: proof(),
            public_signals: NationalitySignals {
                target_nationality: 840,
                credential_hash: FieldElement::from_decimal("12345").unwrap(),
                nonce: "abc".into(),
                request_timestamp_ms: Utc::now().timestamp_millis(),
            },
        };
        assert!(validate_constraints(&envelope).is_empty());
    }
}
