use thiserror::Error;

/// The full error taxonomy surfaced by the verification engine.
///
/// Variants group by the gate or component that raised them.
/// At the verifier boundary every `ZkIdError` collapses to
/// `{verified: false, error: <short string>}`; `kind()` exposes the taxonomy
/// label for callers that opt into `verbose_errors`.
#[derive(Error, Debug)]
pub enum ZkIdError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("proof error: {0}")]
    Proof(String),

    #[error("replay detected")]
    Replay,

    #[error("challenge error: {0}")]
    Challenge(String),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("revocation error: {0}")]
    Revocation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ZkIdResult<T> = Result<T, ZkIdError>;

impl ZkIdError {
    /// The taxonomy kind, for `verbose_errors` consumers. Never includes
    /// the message payload — callers that want detail use `Display`.
    pub fn kind(&self) -> &'static str {
        match self {
            ZkIdError::Validation(_) => "ValidationError",
            ZkIdError::Config(_) => "ConfigError",
            ZkIdError::Credential(_) => "CredentialError",
            ZkIdError::Crypto(_) => "CryptoError",
            ZkIdError::Proof(_) => "ProofError",
            ZkIdError::Replay => "ReplayError",
            ZkIdError::Challenge(_) => "ChallengeError",
            ZkIdError::RateLimit => "RateLimitError",
            ZkIdError::Revocation(_) => "RevocationError",
            ZkIdError::Internal(_) => "InternalError",
        }
    }

    /// Short, caller-safe string for the public `{verified:false, error}` envelope.
    /// Never leaks cryptographic secrets or stack traces.
    pub fn public_message(&self) -> String {
        self.to_string()
    }
}
