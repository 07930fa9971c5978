//! Detached Ed25519 signatures.

use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::PublicKey;

/// A detached Ed25519 signature (64 bytes).
///
/// Serializes as base64 to keep signed event records compact.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Wrap raw signature bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// The raw signature bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Standard base64 encoding.
    #[must_use]
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }

    /// Decode from standard base64.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidBase64`] on malformed input or
    /// [`CryptoError::InvalidSignatureLength`] for wrong lengths.
    pub fn from_base64(s: &str) -> CryptoResult<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|_| CryptoError::InvalidBase64)?;
        let arr: [u8; 64] =
            bytes
                .try_into()
                .map_err(|v: Vec<u8>| CryptoError::InvalidSignatureLength {
                    expected: 64,
                    actual: v.len(),
                })?;
        Ok(Self(arr))
    }

    /// Verify this signature over `message` with `public_key`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::VerificationFailed`] on mismatch or
    /// [`CryptoError::InvalidPublicKey`] if the key bytes are not a valid
    /// Ed25519 point.
    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> CryptoResult<()> {
        let verifying_key = VerifyingKey::from_bytes(public_key.as_bytes())
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        let sig = DalekSignature::from_bytes(&self.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &self.to_base64()[..12])
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}
