//! Error type shared by the signing, verification and certificate helpers.

use thiserror::Error;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification could not be performed.
    #[error("signature verification failed: {0}")]
    Verification(String),

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Certificate could not be decoded or used.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Algorithm not supported.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}
