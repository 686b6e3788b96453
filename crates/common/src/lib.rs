//! Shared types and error definitions used across all folio crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    types::Mode,
};
