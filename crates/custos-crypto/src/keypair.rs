//! Ed25519 key pairs for event and payload signing.
//!
//! The appender signs each committed event's hash so a chain exported to an
//! external auditor stays attributable; the webhook sink signs outbound
//! notification bodies the same way.

use std::io::Write;
use std::path::Path;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::signature::Signature;

/// An Ed25519 key pair. The secret half is zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct KeyPair {
    #[zeroize(skip)] // VerifyingKey doesn't implement Zeroize
    verifying_key: VerifyingKey,
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            verifying_key,
            signing_key,
        }
    }

    /// Reconstruct a key pair from 32 secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not exactly
    /// 32 bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            });
        }

        let mut secret = [0u8; 32];
        secret.copy_from_slice(bytes);
        let signing_key = SigningKey::from_bytes(&secret);
        let verifying_key = signing_key.verifying_key();
        secret.zeroize();

        Ok(Self {
            verifying_key,
            signing_key,
        })
    }

    /// The public half of this key pair.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.verifying_key.to_bytes())
    }

    /// Short hex identifier for log lines (first 8 bytes of the public key).
    #[must_use]
    pub fn key_id_hex(&self) -> String {
        hex::encode(&self.verifying_key.to_bytes()[..8])
    }

    /// Sign a message.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::from_bytes(self.signing_key.sign(message).to_bytes())
    }

    /// Export the secret key bytes for storage. Sensitive.
    #[must_use]
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Load a key from `path`, or generate and persist a new one.
    ///
    /// New key files are created atomically with mode `0o600` on Unix.
    /// Existing files must hold exactly 32 bytes and must not be symlinks.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Io`] on filesystem failures or symlinked key
    /// files, and [`CryptoError::InvalidKeyLength`] for truncated files.
    pub fn load_or_generate(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CryptoError::Io(e.to_string()))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(path)
            {
                Ok(mut file) => {
                    let keypair = Self::generate();
                    file.write_all(&keypair.secret_bytes())
                        .map_err(|e| CryptoError::Io(e.to_string()))?;
                    return Ok(keypair);
                },
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    // Fall through to the read path.
                },
                Err(e) => return Err(CryptoError::Io(e.to_string())),
            }
        }

        #[cfg(not(unix))]
        if !path.exists() {
            let keypair = Self::generate();
            let mut file =
                std::fs::File::create(path).map_err(|e| CryptoError::Io(e.to_string()))?;
            file.write_all(&keypair.secret_bytes())
                .map_err(|e| CryptoError::Io(e.to_string()))?;
            return Ok(keypair);
        }

        let meta =
            std::fs::symlink_metadata(path).map_err(|e| CryptoError::Io(e.to_string()))?;
        if meta.file_type().is_symlink() {
            return Err(CryptoError::Io(
                "refusing to read key file: path is a symlink".into(),
            ));
        }

        let bytes =
            Zeroizing::new(std::fs::read(path).map_err(|e| CryptoError::Io(e.to_string()))?);
        Self::from_secret_bytes(&bytes)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_id", &self.key_id_hex())
            .finish_non_exhaustive()
    }
}

/// The shareable public half of a [`KeyPair`].
///
/// Serializes as a hex string, matching [`crate::EventHash`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Wrap raw public key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw public key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from a 64-character hex string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHex`] on malformed input.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidHex)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidHex)?;
        Ok(Self(arr))
    }

    /// Verify a signature made by the matching secret key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::VerificationFailed`] if the signature does not
    /// match, or [`CryptoError::InvalidPublicKey`] if these bytes are not a
    /// valid Ed25519 point.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        signature.verify(message, self)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
