use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    folio_channels::{ChannelOutbound, Choice, Result},
    teloxide::{
        RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatAction, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
    },
    tracing::{debug, warn},
};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Outbound message sender for Telegram.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        to: &str,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = to,
                            operation,
                            retries,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = to,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }

    async fn send_plain(&self, to: &str, chat_id: ChatId, text: &str) -> Result<()> {
        self.run_telegram_request_with_retry(to, "send message (plain)", || {
            let req = self.bot.send_message(chat_id, text);
            async move { req.await }
        })
        .await
        .map_err(|e| folio_channels::Error::external("telegram send message", e))?;
        Ok(())
    }
}

fn parse_chat_id(to: &str) -> Result<ChatId> {
    to.parse::<i64>()
        .map(ChatId)
        .map_err(|e| folio_channels::Error::invalid_input(format!("chat id {to:?}: {e}")))
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

/// Reduce Telegram HTML to readable plain text.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {},
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[async_trait]
impl ChannelOutbound for TelegramOutbound {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        self.send_plain(to, chat_id, text).await?;
        debug!(chat_id = to, text_len = text.len(), "telegram text sent");
        Ok(())
    }

    async fn send_html(&self, to: &str, html: &str) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        let sent = self
            .run_telegram_request_with_retry(to, "send message (html)", || {
                let req = self
                    .bot
                    .send_message(chat_id, html)
                    .parse_mode(ParseMode::Html);
                async move { req.await }
            })
            .await;
        match sent {
            Ok(_) => {
                debug!(chat_id = to, text_len = html.len(), "telegram html sent");
                Ok(())
            },
            Err(e) => {
                warn!(
                    chat_id = to,
                    error = %e,
                    "telegram HTML send failed, retrying as plain text"
                );
                self.send_plain(to, chat_id, &strip_html(html)).await
            },
        }
    }

    async fn send_choices(&self, to: &str, text: &str, choices: &[Choice]) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        let keyboard = InlineKeyboardMarkup::new(choices.iter().map(|choice| {
            vec![InlineKeyboardButton::callback(
                choice.label.clone(),
                choice.data.clone(),
            )]
        }));
        self.run_telegram_request_with_retry(to, "send keyboard", || {
            let req = self
                .bot
                .send_message(chat_id, text)
                .reply_markup(keyboard.clone());
            async move { req.await }
        })
        .await
        .map_err(|e| folio_channels::Error::external("telegram send keyboard", e))?;
        Ok(())
    }

    async fn send_typing(&self, to: &str) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        self.bot
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
            .map_err(|e| folio_channels::Error::external("telegram send typing", e))?;
        Ok(())
    }
}
