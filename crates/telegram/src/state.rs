use std::sync::Arc;

use {folio_review::{BehanceImporter, ReviewService}, teloxide::Bot};

use crate::{config::TelegramConfig, outbound::TelegramOutbound};

/// Everything the update handlers need, shared by the polling loop.
pub struct BotContext {
    pub bot: Bot,
    pub bot_username: Option<String>,
    pub config: TelegramConfig,
    pub outbound: Arc<TelegramOutbound>,
    pub review: Arc<ReviewService>,
    pub behance: BehanceImporter,
}
