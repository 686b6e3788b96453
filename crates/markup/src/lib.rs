//! Outbound text shaping: markdown-ish feedback to Telegram HTML, split into
//! messages that fit the platform's size limit.

pub mod chunk;
pub mod html;
pub mod render;

pub use {
    chunk::to_safe_fragments,
    html::{escape_html, to_rich_markup},
    render::{number_fragments, render_fragments},
};

/// Telegram message size limit.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Default fragment limit, kept below [`TELEGRAM_MAX_MESSAGE_LEN`] so a
/// position tag and entity expansion never push a message over.
pub const DEFAULT_FRAGMENT_LIMIT: usize = 4000;
