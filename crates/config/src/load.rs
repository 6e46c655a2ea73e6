//! JSON decoding and layered config loading.
//!
//! [`decode_bytes`] and [`decode_file`] assign into an existing value, so
//! fields missing from the document keep whatever the caller put there. The
//! `load_config_*` helpers compose that with the env binder using a fixed
//! precedence; callers wanting another order use the primitives directly.

use crate::env::{EnvSource, ProcessEnv, bind_env_from};
use crate::merge::decode_onto;
use confmat_shared::{EnvBind, ErrorCode, ErrorEnvelope};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};

/// Failures while decoding a JSON config document.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The config file could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The document is not valid JSON or does not fit the target type.
    #[error("invalid config JSON: {source}")]
    Parse {
        /// Underlying JSON failure.
        source: serde_json::Error,
    },
}

impl DecodeError {
    fn parse(source: serde_json::Error) -> Self {
        Self::Parse { source }
    }

    fn error_code(&self) -> ErrorCode {
        match self {
            Self::Io { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => ErrorCode::config("config_file_not_found"),
                io::ErrorKind::PermissionDenied => {
                    ErrorCode::config("config_file_permission_denied")
                },
                _ => ErrorCode::config("config_file_io"),
            },
            Self::Parse { .. } => ErrorCode::config("invalid_json"),
        }
    }
}

impl From<DecodeError> for ErrorEnvelope {
    fn from(error: DecodeError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        match error {
            DecodeError::Io { path, .. } => Self::expected(code, message)
                .with_metadata("path", path.to_string_lossy().to_string()),
            // Shape mismatches found after parsing carry no position.
            DecodeError::Parse { source } if source.line() == 0 => {
                Self::expected(code, message)
            },
            DecodeError::Parse { source } => Self::expected(code, message)
                .with_metadata("line", source.line().to_string())
                .with_metadata("column", source.column().to_string()),
        }
    }
}

/// Decode the JSON file at `path` into `output`.
///
/// Nothing is parsed when the file cannot be read.
pub fn decode_file<T>(path: impl AsRef<Path>, output: &mut T) -> Result<(), DecodeError>
where
    T: Serialize + DeserializeOwned,
{
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "read config file");
    decode_bytes(&data, output)
}

/// Decode a JSON document into `output`.
///
/// Object keys match the struct's field names (after `#[serde(rename)]`),
/// exact first, then case-insensitively. Nested structs merge, maps gain or
/// replace entries by exact key, and enums, sequences and scalars are
/// replaced. On error `output` is unchanged.
pub fn decode_bytes<T>(data: &[u8], output: &mut T) -> Result<(), DecodeError>
where
    T: Serialize + DeserializeOwned,
{
    let document: serde_json::Value = serde_json::from_slice(data).map_err(DecodeError::parse)?;
    let current = serde_json::to_value(&*output).map_err(DecodeError::parse)?;
    *output = decode_onto(current, document).map_err(DecodeError::parse)?;
    Ok(())
}

/// Build a config from defaults, an optional JSON document and env overrides.
///
/// Precedence (highest wins):
/// - env overrides
/// - config JSON
/// - defaults (`T::default()`)
pub fn load_config_from_sources<T, S>(
    config_json: Option<&[u8]>,
    env: &S,
) -> Result<T, ErrorEnvelope>
where
    T: Default + Serialize + DeserializeOwned + EnvBind,
    S: EnvSource + ?Sized,
{
    let mut config = T::default();
    if let Some(input) = config_json {
        decode_bytes(input, &mut config)?;
    }
    bind_env_from(&mut config, env).map_err(ErrorEnvelope::from)?;
    Ok(config)
}

/// Same as [`load_config_from_sources`], reading the document from a file.
pub fn load_config_from_path<T, S>(
    config_path: Option<&Path>,
    env: &S,
) -> Result<T, ErrorEnvelope>
where
    T: Default + Serialize + DeserializeOwned + EnvBind,
    S: EnvSource + ?Sized,
{
    let mut config = T::default();
    if let Some(path) = config_path {
        decode_file(path, &mut config)?;
    }
    bind_env_from(&mut config, env).map_err(ErrorEnvelope::from)?;
    Ok(config)
}

/// Load from an optional file path and the process environment.
pub fn load_config_std_env<T>(config_path: Option<&Path>) -> Result<T, ErrorEnvelope>
where
    T: Default + Serialize + DeserializeOwned + EnvBind,
{
    load_config_from_path(config_path, &ProcessEnv)
}

/// Serialize a config as pretty JSON (with trailing newline).
pub fn to_pretty_json<T: Serialize>(config: &T) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("core", "internal"),
            format!("failed to serialize config: {error}"),
        )
    })?;
    output.push('\n');
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use std::error::Error;

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, crate::EnvBind)]
    #[env(prefix = "SVC_")]
    struct ServiceConfig {
        #[env(var = "NAME")]
        name: String,
        #[env(var = "PORT")]
        port: u16,
        #[serde(rename = "debugMode")]
        #[env(var = "DEBUG")]
        debug: bool,
    }

    #[test]
    fn decode_bytes_matches_keys_case_insensitively() -> Result<(), Box<dyn Error>> {
        let mut config = ServiceConfig::default();
        decode_bytes(br#"{"Name":"x","Port":8080}"#, &mut config)?;
        assert_eq!(config.name, "x");
        assert_eq!(config.port, 8080);
        Ok(())
    }

    #[test]
    fn decode_bytes_uses_serde_rename() -> Result<(), Box<dyn Error>> {
        let mut config = ServiceConfig::default();
        decode_bytes(br#"{"DebugMode":true}"#, &mut config)?;
        assert!(config.debug);
        Ok(())
    }

    #[test]
    fn malformed_json_leaves_output_untouched() {
        let mut config = ServiceConfig {
            name: "before".to_string(),
            port: 1,
            debug: false,
        };
        let error = decode_bytes(br#"{"Name":"#, &mut config).err();
        assert!(matches!(error, Some(DecodeError::Parse { .. })));
        assert_eq!(config.name, "before");
        assert_eq!(config.port, 1);
    }

    #[test]
    fn shape_mismatch_is_a_parse_error() {
        let mut config = ServiceConfig::default();
        let error = decode_bytes(br#"{"name":"ok","port":"eighty"}"#, &mut config).err();
        assert!(matches!(error, Some(DecodeError::Parse { .. })));
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn layered_sources_apply_env_last() -> Result<(), Box<dyn Error>> {
        let mut env = BTreeMap::new();
        env.insert("SVC_PORT".to_string(), "9090".to_string());
        env.insert("SVC_NAME".to_string(), "  ".to_string());

        let config: ServiceConfig =
            load_config_from_sources(Some(br#"{"name":"file","port":8080}"#.as_slice()), &env)?;
        assert_eq!(config.name, "file");
        assert_eq!(config.port, 9090);
        assert!(!config.debug);
        Ok(())
    }

    #[test]
    fn layered_sources_surface_env_errors_as_envelopes() {
        let mut env = BTreeMap::new();
        env.insert("SVC_DEBUG".to_string(), "maybe".to_string());

        let error = load_config_from_sources::<ServiceConfig, _>(None, &env).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::config("invalid_env_bool"))
        );
    }

    #[test]
    fn parse_errors_carry_position_metadata() -> Result<(), Box<dyn Error>> {
        let mut config = ServiceConfig::default();
        let envelope: ErrorEnvelope = decode_bytes(b"{\n  \"name\": }", &mut config)
            .err()
            .ok_or("malformed JSON decoded without error")?
            .into();
        assert_eq!(envelope.code, ErrorCode::config("invalid_json"));
        assert_eq!(envelope.metadata_value("line"), Some("2"));
        Ok(())
    }

    #[test]
    fn shape_errors_carry_no_position_metadata() -> Result<(), Box<dyn Error>> {
        let mut config = ServiceConfig::default();
        let envelope: ErrorEnvelope = decode_bytes(br#"{"port":"eighty"}"#, &mut config)
            .err()
            .ok_or("mistyped port decoded without error")?
            .into();
        assert_eq!(envelope.code, ErrorCode::config("invalid_json"));
        assert_eq!(envelope.metadata_value("line"), None);
        Ok(())
    }

    #[test]
    fn pretty_json_ends_with_newline() -> Result<(), Box<dyn Error>> {
        let output = to_pretty_json(&ServiceConfig::default())?;
        assert!(output.ends_with("}\n"));
        Ok(())
    }
}
