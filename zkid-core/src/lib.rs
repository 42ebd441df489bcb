//! zk-id — credential issuance, proof codec/verification, revocation
//! trees, and the verifier state machine built on top of `zkid-types` and
//! `zkid-crypto`. `zkid-server` is the only crate that talks HTTP; this
//! crate is pure business logic plus pluggable storage/telemetry traits.

pub mod audit;
pub mod config;
pub mod credential;
pub mod proof;
pub mod registry;
pub mod revocation;
pub mod scenario;
pub mod stores;
pub mod telemetry;
pub mod verifier;

pub use config::{ProtocolVersionPolicy, RateLimitConfig, RequiredPolicy, RevocationTreeConfig, VerifierConfig};
pub use verifier::{BundleEntry, Verifier, VerifierBuilder, VerifyOutcome, PROTOCOL_VERSION};
