//! Crypto error types.

use thiserror::Error;

/// Errors from hashing and signing operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A key had the wrong number of bytes.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// A signature had the wrong number of bytes.
    #[error("invalid signature length: expected {expected} bytes, got {actual}")]
    InvalidSignatureLength {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// A hex-encoded value could not be decoded.
    #[error("invalid hex encoding")]
    InvalidHex,

    /// A base64-encoded value could not be decoded.
    #[error("invalid base64 encoding")]
    InvalidBase64,

    /// The public key bytes do not form a valid Ed25519 point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    VerificationFailed,

    /// Key file I/O failed.
    #[error("key file error: {0}")]
    Io(String),
}

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
