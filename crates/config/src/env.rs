//! Environment variable binding into annotated structs.
//!
//! The binder walks a struct's [`EnvBind`] field table in declaration order.
//! A field is only ever set, never cleared:
//! - no binding key, unset variable or blank value: field left as is
//! - malformed value or unsupported kind: stop and return the error
//!
//! Fields assigned before a failing field stay assigned.

use confmat_shared::{EnvBind, EnvField, ErrorCode, ErrorEnvelope, FieldSlot, redact_if_secret};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::num::ParseIntError;

/// Lookup of environment values by variable name.
pub trait EnvSource {
    /// Current value of `name`, if set.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The live process environment, read on every lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        // Non-UTF-8 values are converted lossily rather than treated as unset.
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<S: BuildHasher> EnvSource for HashMap<String, String, S> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Failures while binding env values into a struct.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// The target's field table names a field it exposes no slot for.
    #[error("{type_name} exposes no field slot for {field}")]
    NotAStruct {
        /// Rust type name of the target.
        type_name: &'static str,
        /// Field without a slot.
        field: &'static str,
    },
    /// Boolean env var had a value other than `true`, `false`, `1` or `0`.
    #[error("invalid boolean format for environment variable {var}")]
    InvalidBoolean {
        /// Env var name.
        var: &'static str,
        /// Trimmed input value.
        value: String,
    },
    /// Integer env var did not parse into the field's width.
    #[error("invalid integer for environment variable {var}: {source}")]
    InvalidInteger {
        /// Env var name.
        var: &'static str,
        /// Trimmed input value.
        value: String,
        /// Underlying parse failure.
        source: ParseIntError,
    },
    /// The annotated field has a type the binder cannot assign.
    #[error("unsupported type in struct at {field}")]
    UnsupportedFieldType {
        /// Rust field name.
        field: &'static str,
        /// Env var that was set for it.
        var: &'static str,
    },
}

impl BindError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotAStruct { .. } => ErrorCode::config("env_target_not_struct"),
            Self::InvalidBoolean { .. } => ErrorCode::config("invalid_env_bool"),
            Self::InvalidInteger { .. } => ErrorCode::config("invalid_env_int"),
            Self::UnsupportedFieldType { .. } => ErrorCode::config("unsupported_env_field"),
        }
    }
}

impl From<BindError> for ErrorEnvelope {
    fn from(error: BindError) -> Self {
        let code = error.error_code();
        let message = error.to_string();

        match error {
            BindError::NotAStruct { type_name, field } => Self::unexpected(code, message)
                .with_metadata("type", type_name)
                .with_metadata("field", field),
            BindError::InvalidBoolean { var, value }
            | BindError::InvalidInteger { var, value, .. } => {
                Self::expected(code, message).with_env_value(var, &value)
            },
            BindError::UnsupportedFieldType { field, var } => Self::expected(code, message)
                .with_metadata("env_var", var)
                .with_metadata("field", field),
        }
    }
}

/// Bind annotated fields of `target` from the process environment.
pub fn bind_env<T: EnvBind>(target: &mut T) -> Result<(), BindError> {
    bind_env_from(target, &ProcessEnv)
}

/// Bind annotated fields of `target` from an explicit env source.
pub fn bind_env_from<T, S>(target: &mut T, source: &S) -> Result<(), BindError>
where
    T: EnvBind,
    S: EnvSource + ?Sized,
{
    for (index, field) in T::env_fields().iter().enumerate() {
        let Some(var) = field.binding_key() else {
            continue;
        };
        let Some(raw) = source.lookup(var) else {
            tracing::trace!(field = field.name, env_var = var, "env var not set");
            continue;
        };
        let value = raw.trim();
        if value.is_empty() {
            tracing::trace!(field = field.name, env_var = var, "env var blank");
            continue;
        }

        let slot = target
            .env_slot(index)
            .ok_or_else(|| BindError::NotAStruct {
                type_name: std::any::type_name::<T>(),
                field: field.name,
            })?;
        assign(slot, field, var, value)?;

        tracing::debug!(
            field = field.name,
            env_var = var,
            value = %redact_if_secret(var, value),
            "applied env override"
        );
    }

    Ok(())
}

/// `(field, env var)` pairs a struct reads, in declaration order.
pub fn env_bindings<T: EnvBind>() -> impl Iterator<Item = (&'static str, &'static str)> {
    T::env_fields()
        .iter()
        .filter_map(|field| field.binding_key().map(|var| (field.name, var)))
}

fn assign(
    slot: FieldSlot<'_>,
    field: &EnvField,
    var: &'static str,
    value: &str,
) -> Result<(), BindError> {
    match slot {
        FieldSlot::StringList(target) => *target = split_list(value),
        FieldSlot::String(target) => value.clone_into(target),
        FieldSlot::Bool(target) => *target = parse_bool(var, value)?,
        FieldSlot::Integer(target) => {
            target
                .set_parsed(value)
                .map_err(|source| BindError::InvalidInteger {
                    var,
                    value: value.to_owned(),
                    source,
                })?;
        },
        FieldSlot::Unsupported => {
            return Err(BindError::UnsupportedFieldType {
                field: field.name,
                var,
            });
        },
    }
    Ok(())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, BindError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(BindError::InvalidBoolean {
            var,
            value: value.to_owned(),
        }),
    }
}

/// Split on commas and trim each item. Empty items are kept.
fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).map(ToOwned::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmat_shared::{ErrorKind, FieldKind, REDACTED_VALUE};
    use std::error::Error;

    #[derive(Debug, Default)]
    struct Manual {
        name: String,
        retries: u8,
    }

    impl EnvBind for Manual {
        fn env_fields() -> &'static [EnvField] {
            const FIELDS: &[EnvField] = &[
                EnvField::new("name", Some("MANUAL_NAME"), FieldKind::String),
                EnvField::new("retries", Some("MANUAL_RETRIES"), FieldKind::Integer),
                EnvField::new("ratio", Some("MANUAL_RATIO"), FieldKind::Unsupported),
                EnvField::new("ghost", Some("MANUAL_GHOST"), FieldKind::String),
                EnvField::new("note", None, FieldKind::String),
            ];
            FIELDS
        }

        fn env_slot(&mut self, index: usize) -> Option<FieldSlot<'_>> {
            match index {
                0 => Some(FieldSlot::String(&mut self.name)),
                1 => Some(FieldSlot::Integer(&mut self.retries)),
                2 => Some(FieldSlot::Unsupported),
                _ => None,
            }
        }
    }

    fn env_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn list_split_keeps_empty_items() {
        assert_eq!(split_list(" a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(split_list("a,,b,"), vec!["a", "", "b", ""]);
        assert_eq!(split_list("solo"), vec!["solo"]);
    }

    #[test]
    fn bool_literals_are_case_sensitive() {
        assert_eq!(parse_bool("FLAG", "true"), Ok(true));
        assert_eq!(parse_bool("FLAG", "1"), Ok(true));
        assert_eq!(parse_bool("FLAG", "false"), Ok(false));
        assert_eq!(parse_bool("FLAG", "0"), Ok(false));
        assert!(matches!(
            parse_bool("FLAG", "TRUE"),
            Err(BindError::InvalidBoolean { var: "FLAG", .. })
        ));
        assert!(parse_bool("FLAG", "yes").is_err());
    }

    #[test]
    fn manual_table_binds_registered_fields() -> Result<(), Box<dyn Error>> {
        let mut target = Manual::default();
        bind_env_from(
            &mut target,
            &env_map(&[("MANUAL_NAME", " svc "), ("MANUAL_RETRIES", "3")]),
        )?;
        assert_eq!(target.name, "svc");
        assert_eq!(target.retries, 3);
        Ok(())
    }

    #[test]
    fn unsupported_kind_aborts_after_earlier_fields_are_set() {
        let mut target = Manual::default();
        let error = bind_env_from(
            &mut target,
            &env_map(&[
                ("MANUAL_NAME", "svc"),
                ("MANUAL_RATIO", "0.5"),
                ("MANUAL_GHOST", "later"),
            ]),
        )
        .err();

        assert_eq!(
            error,
            Some(BindError::UnsupportedFieldType {
                field: "ratio",
                var: "MANUAL_RATIO",
            })
        );
        assert_eq!(target.name, "svc", "no rollback of earlier fields");
    }

    #[test]
    fn unsupported_kind_is_ignored_when_unset() -> Result<(), Box<dyn Error>> {
        let mut target = Manual::default();
        bind_env_from(&mut target, &env_map(&[("MANUAL_RATIO", "   ")]))?;
        Ok(())
    }

    #[test]
    fn missing_slot_is_reported() {
        let mut target = Manual::default();
        let error = bind_env_from(&mut target, &env_map(&[("MANUAL_GHOST", "x")])).err();
        assert!(matches!(
            error,
            Some(BindError::NotAStruct { field: "ghost", .. })
        ));
    }

    #[test]
    fn overflow_is_an_integer_error() {
        let mut target = Manual {
            retries: 9,
            ..Manual::default()
        };
        let error = bind_env_from(&mut target, &env_map(&[("MANUAL_RETRIES", "300")])).err();
        assert!(matches!(
            error,
            Some(BindError::InvalidInteger { var: "MANUAL_RETRIES", .. })
        ));
        assert_eq!(target.retries, 9);
    }

    #[test]
    fn bindings_list_only_annotated_fields() {
        let bindings: Vec<_> = env_bindings::<Manual>().collect();
        assert_eq!(
            bindings,
            vec![
                ("name", "MANUAL_NAME"),
                ("retries", "MANUAL_RETRIES"),
                ("ratio", "MANUAL_RATIO"),
                ("ghost", "MANUAL_GHOST"),
            ]
        );
    }

    #[test]
    fn secret_values_are_redacted_in_error_metadata() {
        let envelope: ErrorEnvelope = BindError::InvalidBoolean {
            var: "APP_SECRET_FLAG",
            value: "hunter2".to_string(),
        }
        .into();

        assert_eq!(envelope.kind, ErrorKind::Expected);
        assert_eq!(envelope.code, ErrorCode::config("invalid_env_bool"));
        assert_eq!(envelope.metadata_value("value"), Some(REDACTED_VALUE));
        assert!(!envelope.message.contains("hunter2"));
    }

    #[test]
    fn integer_errors_keep_their_source() {
        let mut target = Manual::default();
        let error = bind_env_from(&mut target, &env_map(&[("MANUAL_RETRIES", "abc")])).err();
        let source = error.as_ref().and_then(Error::source);
        assert!(source.is_some());

        let envelope: Option<ErrorEnvelope> = error.map(Into::into);
        assert_eq!(
            envelope.map(|envelope| envelope.code),
            Some(ErrorCode::config("invalid_env_int"))
        );
    }
}
