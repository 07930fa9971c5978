//! Prelude module - commonly used types for convenient import.
//!
//! Use `use custos_crypto::prelude::*;` to import all essential types.

pub use crate::{CryptoError, CryptoResult, EventHash, KeyPair, PublicKey, Signature};
