//! Outbound messaging seam between the review flow and chat platforms.
//!
//! A platform (Telegram today) implements [`ChannelOutbound`]; the review
//! pipeline only ever talks to that trait.

pub mod error;
pub mod outbound;

pub use {
    error::{Error, Result},
    outbound::{ChannelOutbound, Choice},
};
