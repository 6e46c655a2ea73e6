//! # confmat-config
//!
//! Populate typed configuration structs from two sources:
//!
//! - a JSON document ([`decode_file`], [`decode_bytes`])
//! - environment variables named by `#[env(var = "...")]` annotations
//!   ([`bind_env`], [`bind_env_from`])
//!
//! The two are independent; [`load_config_from_path`] and friends compose
//! them as defaults, then document, then env.
//!
//! ```ignore
//! use confmat_config::{EnvBind, load_config_std_env};
//!
//! #[derive(Default, serde::Serialize, serde::Deserialize, EnvBind)]
//! #[env(prefix = "APP_")]
//! struct AppConfig {
//!     #[env(var = "PORT")]
//!     port: u16,
//! }
//!
//! let config: AppConfig = load_config_std_env(Some("app.json".as_ref()))?;
//! ```
//!
//! Generated impls refer to `::confmat_shared`, so crates deriving
//! `EnvBind` depend on `confmat-shared` as well.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Environment variable binding.
pub mod env;
/// JSON decoding and layered loading.
pub mod load;
mod merge;

pub use confmat_derive::EnvBind;
pub use confmat_shared::{
    EnvBind, EnvField, ErrorCode, ErrorEnvelope, FieldKind, FieldSlot, IntegerField,
};

pub use env::{BindError, EnvSource, ProcessEnv, bind_env, bind_env_from, env_bindings};
pub use load::{
    DecodeError, decode_bytes, decode_file, load_config_from_path, load_config_from_sources,
    load_config_std_env, to_pretty_json,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
