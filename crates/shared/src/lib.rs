//! # confmat-shared
//!
//! Foundational types used by the other confmat crates:
//!
//! - the [`EnvBind`] field-table trait implemented by `#[derive(EnvBind)]`
//! - the [`ErrorEnvelope`] returned by the layered loaders
//! - secret detection for logs and error metadata
//!
//! This crate has no workspace dependencies.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod binding;
pub mod errors;
pub mod redaction;

pub use binding::{EnvBind, EnvField, FieldKind, FieldSlot, IntegerField};
pub use errors::{ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, REDACTED_VALUE};
pub use redaction::{is_secret_key, redact_if_secret};

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
