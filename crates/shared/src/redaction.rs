//! Secret detection for env var names.
//!
//! The binder logs applied overrides and echoes bad values in error
//! metadata. Both go through [`redact_if_secret`] first.

use crate::errors::REDACTED_VALUE;

const SECRET_MARKERS: [&str; 6] = ["KEY", "TOKEN", "SECRET", "PASSWORD", "CREDENTIAL", "AUTH"];

/// `true` when `name` contains a secret marker, ignoring ASCII case.
///
/// ```
/// use confmat_shared::is_secret_key;
///
/// assert!(is_secret_key("APP_API_KEY"));
/// assert!(is_secret_key("db_password"));
/// assert!(!is_secret_key("APP_PORT"));
/// ```
pub fn is_secret_key(name: &str) -> bool {
    let name = name.to_ascii_uppercase();
    SECRET_MARKERS.iter().any(|marker| name.contains(marker))
}

/// `value`, or [`REDACTED_VALUE`] when `name` looks secret.
///
/// ```
/// use confmat_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("APP_TOKEN", "abc"), "<redacted>");
/// assert_eq!(redact_if_secret("APP_PORT", "8080"), "8080");
/// ```
pub fn redact_if_secret(name: &str, value: &str) -> String {
    if is_secret_key(name) {
        REDACTED_VALUE.to_owned()
    } else {
        value.to_owned()
    }
}
