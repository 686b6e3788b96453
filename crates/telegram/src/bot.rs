use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    config::TelegramConfig,
    error::Result,
    handlers,
    state::BotContext,
    workers::{ChatHandler, ChatWorkers, WORKER_IDLE},
};

/// How long in-progress updates may run once polling stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Build the bot client, verify the token and prepare the bot for polling.
///
/// Returns the bot and its username.
pub async fn connect(config: &TelegramConfig) -> Result<(Bot, Option<String>)> {
    // Client timeout must outlive the long-polling timeout so the HTTP client
    // doesn't abort the request before Telegram responds.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs) + 15))
        .build()?;
    let bot = Bot::with_client(config.token.expose_secret(), client);

    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Long polling does not work while a webhook is set.
    bot.delete_webhook().send().await?;

    let commands = vec![
        BotCommand::new("start", "How to submit a portfolio"),
        BotCommand::new("mode", "Choose the review style"),
        BotCommand::new("cancel", "Drop images that are still waiting"),
        BotCommand::new("help", "Show available commands"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?bot_username, "telegram bot connected (webhook cleared)");
    Ok((bot, bot_username))
}

/// Spawn the long-polling loop. It runs until `cancel` is cancelled, or until
/// Telegram reports that another instance is polling with the same token.
///
/// Updates are handed to a worker per chat. The returned handle completes
/// once the workers have finished (or been aborted after a grace period).
pub fn start_polling(ctx: Arc<BotContext>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;
        let mut workers = ChatWorkers::new(Arc::clone(&ctx), WORKER_IDLE);

        loop {
            let request = ctx
                .bot
                .get_updates()
                .offset(offset)
                .timeout(ctx.config.poll_timeout_secs)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);

            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = request.send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match chat_of(&update.kind) {
                            Some(chat) => workers.dispatch(chat, update.kind),
                            None => debug!("ignoring update: {:?}", update.kind),
                        }
                    }
                },
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    warn!("telegram polling disabled: another instance is running with this token");
                    cancel.cancel();
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(Duration::from_secs(5)) => {},
                    }
                },
            }
        }
        info!(active_chats = workers.active(), "telegram polling stopped");
        workers.shutdown(SHUTDOWN_GRACE).await;
    })
}

/// Chat an update belongs to. Callback queries without a message (inline
/// mode) fall back to the sender's id.
fn chat_of(kind: &UpdateKind) -> Option<i64> {
    match kind {
        UpdateKind::Message(msg) => Some(msg.chat.id.0),
        UpdateKind::CallbackQuery(query) => Some(match &query.message {
            Some(message) => message.chat().id.0,
            None => i64::try_from(query.from.id.0).ok()?,
        }),
        _ => None,
    }
}

#[async_trait]
impl ChatHandler<UpdateKind> for BotContext {
    async fn handle(&self, _chat: i64, kind: UpdateKind) {
        dispatch_update(self, kind).await;
    }
}

async fn dispatch_update(ctx: &BotContext, kind: UpdateKind) {
    match kind {
        UpdateKind::Message(msg) => {
            let chat_id = msg.chat.id.0;
            debug!(chat_id, "received telegram message");
            if let Err(e) = handlers::handle_message(msg, ctx).await {
                error!(chat_id, error = %e, "error handling telegram message");
            }
        },
        UpdateKind::CallbackQuery(query) => {
            debug!(callback_data = ?query.data, "received telegram callback query");
            if let Err(e) = handlers::handle_callback_query(query, ctx).await {
                error!(error = %e, "error handling telegram callback query");
            }
        },
        other => {
            debug!("ignoring update: {other:?}");
        },
    }
}
