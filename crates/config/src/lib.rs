//! Configuration loading and env substitution.
//!
//! Config files: `folio.toml`, `folio.yaml`, or `folio.json`
//! Searched in `./` then `~/.config/folio/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{API_KEY_ENV, apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{ChannelsConfig, EvaluatorConfig, FolioConfig, ReviewConfig},
    validate::{ValidationResult, validate},
};
