use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ZkIdError, ZkIdResult};

/// A BN254 scalar field element, exchanged on the wire as a base-10 decimal
/// string. This crate never performs field arithmetic — that
/// lives in `zkid-crypto`, which parses/prints through `ark_bn254::Fr`'s
/// `Display`/`FromStr`. Keeping the type here as a validated decimal string
/// lets the data-model crate stay free of the `ark-*` dependency stack.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldElement(String);

impl FieldElement {
    /// Build from a decimal string, validating it is non-empty ASCII
    /// digits with no redundant leading zero (other than the literal "0").
    pub fn from_decimal(s: impl Into<String>) -> ZkIdResult<Self> {
        let s = s.into();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ZkIdError::Validation(format!(
                "field element must be a non-empty decimal string, got {:?}",
                s
            )));
        }
        if s.len() > 1 && s.starts_with('0') {
            return Err(ZkIdError::Validation(
                "field element decimal string has a redundant leading zero".into(),
            ));
        }
        Ok(Self(s))
    }

    /// The zero element.
    pub fn zero() -> Self {
        Self("0".to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    pub fn as_decimal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.0)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
