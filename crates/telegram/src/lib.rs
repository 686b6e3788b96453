//! Telegram transport for the portfolio review bot.
//!
//! Receives photos, image documents, Behance links and commands over long
//! polling via teloxide, handles each chat on its own worker task, and
//! delivers review feedback through [`TelegramOutbound`].

pub mod access;
pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod state;
pub mod workers;

pub use {
    bot::{connect, start_polling},
    config::{TOKEN_ENV, TelegramConfig},
    error::{Error, Result},
    outbound::TelegramOutbound,
    state::BotContext,
};
