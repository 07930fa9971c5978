//! Custos Test — shared test utilities for the Custos workspace.
//!
//! Fixtures (valid drafts, rules, notifications) and mock sinks used
//! across crate tests and the integration suite as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! custos-test = { workspace = true }
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use custos_test::{CapturingSink, failed_login_draft, test_tenant};
//!
//! #[tokio::test]
//! async fn alerts_reach_the_sink() {
//!     let tenant = test_tenant();
//!     let draft = failed_login_draft(&tenant, "u1");
//!     // ... feed the draft through the pipeline under test
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;
pub mod prelude;

pub use fixtures::*;
pub use mocks::*;
