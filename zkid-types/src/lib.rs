//! zk-id — shared data model and error taxonomy for the privacy-preserving
//! identity verification engine. No cryptographic operations live here;
//! see `zkid-crypto` for Poseidon/Ed25519/Groth16 adapters and `zkid-core`
//! for the protocol logic built on top of these types.

pub mod challenge;
pub mod claim;
pub mod credential;
pub mod error;
pub mod field;
pub mod issuer;
pub mod proof;
pub mod revocation;
pub mod telemetry;

pub use challenge::Challenge;
pub use claim::{AggregatedResult, ClaimResult, ClaimSpec, ClaimType, MultiClaimRequest, Scenario};
pub use credential::{Credential, ExternalCredential, SignedCredential};
pub use error::{ZkIdError, ZkIdResult};
pub use field::FieldElement;
pub use issuer::{IssuerRecord, IssuerStatus};
pub use proof::{
    AgeRevocableSignals, AgeSignals, AgeSignedSignals, Groth16ProofData, NationalitySignals,
    NationalitySignedSignals, ProofEnvelope, ProofResponse,
};
pub use revocation::{
    RevocationRootInfo, RevocationWitness, DEFAULT_SMT_DEPTH, MAX_INDEXED_DEPTH, MAX_SMT_DEPTH,
};
pub use telemetry::{AuditRecord, VerificationEvent};
