//! Custos Crypto - hashing and signing primitives for the event ledger.
//!
//! This crate provides:
//! - [`EventHash`]: the SHA-256 digest linking events into per-tenant chains
//! - [`KeyPair`] / [`Signature`]: Ed25519 signing of committed events and
//!   outbound notification payloads
//!
//! # Example
//!
//! ```rust
//! use custos_crypto::{EventHash, KeyPair};
//!
//! // Chain digest: payload bytes linked to the previous hash.
//! let genesis = EventHash::zero();
//! let first = EventHash::digest_parts(&[b"payload", genesis.as_bytes()]);
//! assert!(!first.is_zero());
//!
//! // Detached signature over the digest.
//! let keypair = KeyPair::generate();
//! let sig = keypair.sign(first.as_bytes());
//! assert!(keypair.public_key().verify(first.as_bytes(), &sig).is_ok());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod hash;
mod keypair;
mod signature;

pub use error::{CryptoError, CryptoResult};
pub use hash::EventHash;
pub use keypair::{KeyPair, PublicKey};
pub use signature::Signature;
