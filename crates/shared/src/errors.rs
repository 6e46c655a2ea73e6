//! Caller-facing error envelope returned by the config loaders.
//!
//! Binder and decoder failures keep their own `thiserror` enums; the loaders
//! flatten them into an [`ErrorEnvelope`] with a stable, namespaced code so
//! callers can branch on `config:invalid_env_int` without matching variants.

use crate::redaction::redact_if_secret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// String metadata carried by an envelope, sorted by key.
pub type ErrorMetadata = BTreeMap<String, String>;

/// Placeholder written instead of a secret value.
pub const REDACTED_VALUE: &str = "<redacted>";

/// Whether the failure came from the caller's input or from inside the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad input: malformed env values, missing files, invalid JSON.
    Expected,
    /// Broken invariant, such as a field table without a matching slot.
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Expected => "expected",
            Self::Unexpected => "unexpected",
        })
    }
}

/// Namespaced error identifier, rendered as `namespace:code`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode {
    namespace: String,
    code: String,
}

impl ErrorCode {
    /// Code in an arbitrary namespace.
    pub fn new(namespace: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            code: code.into(),
        }
    }

    /// Code in the `config` namespace.
    pub fn config(code: impl Into<String>) -> Self {
        Self::new("config", code)
    }

    /// Namespace part.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Identifier part.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.namespace, self.code)
    }
}

/// Flattened config error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Origin of the failure.
    pub kind: ErrorKind,
    /// Stable code.
    pub code: ErrorCode,
    /// Rendered message of the underlying error.
    pub message: String,
    /// Context such as `env_var`, `field` or `path`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: ErrorMetadata,
}

impl ErrorEnvelope {
    fn with_kind(kind: ErrorKind, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            metadata: ErrorMetadata::new(),
        }
    }

    /// Envelope for bad caller input.
    pub fn expected(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Expected, code, message)
    }

    /// Envelope for an internal inconsistency.
    pub fn unexpected(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Unexpected, code, message)
    }

    /// Add one metadata entry, replacing any previous value for `key`.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Record the offending env var and its value, redacting the value when
    /// the variable name looks secret.
    #[must_use]
    pub fn with_env_value(self, var: &str, value: &str) -> Self {
        let value = redact_if_secret(var, value);
        self.with_metadata("env_var", var).with_metadata("value", value)
    }

    /// Metadata value for `key`.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// `true` for [`ErrorKind::Expected`].
    #[must_use]
    pub fn is_expected(&self) -> bool {
        self.kind == ErrorKind::Expected
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {}: {}", self.kind, self.code, self.message)
    }
}

impl std::error::Error for ErrorEnvelope {}
