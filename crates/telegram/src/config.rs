use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// Environment variable consulted when the config carries no token.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Configuration for the Telegram bot.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// User ids or usernames allowed to talk to the bot. Empty means anyone.
    pub allowlist: Vec<String>,

    /// Long-polling timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,
}

impl TelegramConfig {
    /// Decode the raw `channels.telegram` section, falling back to
    /// [`TOKEN_ENV`] (via `lookup`) when no token is configured.
    pub fn resolve(
        raw: Option<&serde_json::Value>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = match raw {
            Some(value) => serde_json::from_value::<Self>(value.clone())?,
            None => Self::default(),
        };
        if config.token.expose_secret().trim().is_empty()
            && let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty())
        {
            config.token = Secret::new(token);
        }
        if config.token.expose_secret().trim().is_empty() {
            return Err(Error::message(format!(
                "no bot token: set channels.telegram.token or {TOKEN_ENV}"
            )));
        }
        Ok(config)
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("allowlist", &self.allowlist)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            allowlist: Vec::new(),
            poll_timeout_secs: 30,
        }
    }
}
