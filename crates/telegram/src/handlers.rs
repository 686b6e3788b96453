use std::time::Duration;

use {
    folio_album::SubmissionKey,
    folio_channels::{ChannelOutbound, Choice},
    folio_common::Mode,
    folio_review::{BehanceProject, ImageRef, find_project_link},
    teloxide::{
        payloads::AnswerCallbackQuerySetters,
        prelude::*,
        types::{CallbackQuery, MediaKind, MessageKind},
    },
    tracing::{debug, info, warn},
};

use crate::{
    access,
    error::{Error, Result},
    state::BotContext,
};

pub const GREETING: &str = "👋 Hi! Send me one or more images (an album works too) and I will \
                            review them as a single portfolio 🖼️\n\nYou can also send a link \
                            to a Behance project.\n\n/mode - choose the review style\n/cancel \
                            - drop images that are still waiting\n/help - show this message";
pub const FALLBACK_HINT: &str = "Please send one or more images.";
pub const DOWNLOAD_FAILED: &str = "⚠️ Could not download the image. Please send it again.";

/// Upper bound on fetching one file from Telegram's file server.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Callback data prefix of the mode selection keyboard.
pub const MODE_CALLBACK_PREFIX: &str = "mode:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Mode,
    Cancel,
}

/// Handle a single inbound Telegram message (called from the chat's worker).
pub async fn handle_message(msg: Message, ctx: &BotContext) -> Result<()> {
    let chat_id = msg.chat.id.0.to_string();
    let peer_id = msg.from.as_ref().map(|u| u.id.0.to_string());
    let username = msg.from.as_ref().and_then(|u| u.username.clone());

    let verdict = access::check_access(&ctx.config, peer_id.as_deref(), username.as_deref());
    if let Err(reason) = verdict {
        debug!(chat_id, ?peer_id, %reason, "ignoring message");
        return Ok(());
    }

    if let Some(file) = extract_image_file(&msg) {
        let key = SubmissionKey::for_message(
            chat_id.as_str(),
            msg.media_group_id().map(ToString::to_string),
        );
        return receive_image(ctx, key, file).await;
    }

    let text = extract_text(&msg).unwrap_or_default();
    if let Some((command, args)) = parse_command(&text, ctx.bot_username.as_deref()) {
        return handle_command(ctx, &chat_id, command, args).await;
    }
    if let Some(url) = find_project_link(&text) {
        return import_behance(ctx, &chat_id, &url).await;
    }

    ctx.outbound.send_text(&chat_id, FALLBACK_HINT).await?;
    Ok(())
}

async fn receive_image(ctx: &BotContext, key: SubmissionKey, file: ImageFileInfo) -> Result<()> {
    let chat_id = key.conversation.clone();
    // Keeps the album open even if this download outlasts the debounce.
    let slot = ctx.review.reserve(key);
    match fetch_image(ctx, &file).await {
        Ok(image) => {
            info!(key = %slot.key(), path = %image.path.display(), "image queued");
            slot.fill(image);
        },
        Err(e) => {
            drop(slot);
            warn!(chat_id, file_id = %file.file_id, error = %e, "failed to download image");
            ctx.outbound.send_text(&chat_id, DOWNLOAD_FAILED).await?;
        },
    }
    Ok(())
}

async fn fetch_image(ctx: &BotContext, file: &ImageFileInfo) -> Result<ImageRef> {
    let bytes = download_telegram_file(&ctx.bot, &file.file_id).await?;
    let image = ImageRef::store(ctx.review.download_dir(), "tg-", &file.mime_type, &bytes).await?;
    Ok(image)
}

async fn handle_command(
    ctx: &BotContext,
    chat_id: &str,
    command: Command,
    args: &str,
) -> Result<()> {
    debug!(chat_id, ?command, args, "telegram command");
    match command {
        Command::Start | Command::Help => {
            let mode = ctx.review.mode(chat_id).await;
            let text = format!("{GREETING}\n\nCurrent mode: {}", mode.label());
            ctx.outbound.send_text(chat_id, &text).await?;
        },
        Command::Mode if args.is_empty() => {
            let current = ctx.review.mode(chat_id).await;
            ctx.outbound
                .send_choices(
                    chat_id,
                    &format!("Choose a review mode (current: {}):", current.label()),
                    &mode_choices(),
                )
                .await?;
        },
        Command::Mode => match args.parse::<Mode>() {
            Ok(mode) => {
                ctx.review.set_mode(chat_id, mode).await;
                ctx.outbound.send_text(chat_id, &mode_confirmation(mode)).await?;
            },
            Err(e) => {
                let available = Mode::ALL.map(Mode::as_str).join(", ");
                ctx.outbound
                    .send_text(chat_id, &format!("{e}. Available: {available}."))
                    .await?;
            },
        },
        Command::Cancel => {
            let dropped = ctx.review.cancel_conversation(chat_id).await;
            let text = if dropped == 0 {
                "Nothing to cancel.".to_string()
            } else {
                format!("🗑 Discarded {dropped} pending image(s).")
            };
            ctx.outbound.send_text(chat_id, &text).await?;
        },
    }
    Ok(())
}

fn mode_choices() -> Vec<Choice> {
    Mode::ALL
        .into_iter()
        .map(|mode| Choice::new(mode.label(), format!("{MODE_CALLBACK_PREFIX}{mode}")))
        .collect()
}

fn mode_confirmation(mode: Mode) -> String {
    format!("✅ Review mode set to {}.", mode.label())
}

async fn import_behance(ctx: &BotContext, chat_id: &str, url: &str) -> Result<()> {
    let slot = ctx.review.reserve(SubmissionKey::solo(chat_id));
    match fetch_behance_cover(ctx, url).await {
        Ok((project, image)) => {
            info!(chat_id, url, title = %project.title, "behance project imported");
            slot.fill(image);
            ctx.outbound.send_text(chat_id, &project.summary()).await?;
        },
        Err(e) => {
            drop(slot);
            warn!(chat_id, url, error = %e, "behance import failed");
            ctx.outbound
                .send_text(
                    chat_id,
                    &format!("⚠️ Could not import the Behance project: {e}"),
                )
                .await?;
        },
    }
    Ok(())
}

async fn fetch_behance_cover(
    ctx: &BotContext,
    url: &str,
) -> folio_review::Result<(BehanceProject, ImageRef)> {
    let project = ctx.behance.fetch_project(url).await?;
    let image = ctx
        .behance
        .download_cover(&project, ctx.review.download_dir())
        .await?;
    Ok((project, image))
}

/// Handle a button press on an inline keyboard.
pub async fn handle_callback_query(query: CallbackQuery, ctx: &BotContext) -> Result<()> {
    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat().id.0.to_string())
        .unwrap_or_default();

    let allowed = access::check_access(
        &ctx.config,
        Some(&query.from.id.0.to_string()),
        query.from.username.as_deref(),
    )
    .is_ok();

    let Some(name) = data.strip_prefix(MODE_CALLBACK_PREFIX).filter(|_| allowed) else {
        ctx.bot.answer_callback_query(&query.id).await?;
        return Ok(());
    };

    match name.parse::<Mode>() {
        Ok(mode) if !chat_id.is_empty() => {
            ctx.review.set_mode(&chat_id, mode).await;
            let confirmation = mode_confirmation(mode);
            ctx.bot
                .answer_callback_query(&query.id)
                .text(&confirmation)
                .await?;
            ctx.outbound.send_text(&chat_id, &confirmation).await?;
        },
        Ok(_) => {
            ctx.bot.answer_callback_query(&query.id).await?;
        },
        Err(e) => {
            ctx.bot
                .answer_callback_query(&query.id)
                .text(e.to_string())
                .await?;
        },
    }
    Ok(())
}

/// Split `/name@bot args` into a known command and its arguments.
///
/// Commands addressed to a different bot are ignored.
fn parse_command<'a>(text: &'a str, bot_username: Option<&str>) -> Option<(Command, &'a str)> {
    let rest = text.trim().strip_prefix('/')?;
    let (head, args) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    let (name, target) = match head.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (head, None),
    };
    if let (Some(target), Some(ours)) = (target, bot_username)
        && !target.eq_ignore_ascii_case(ours)
    {
        return None;
    }
    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "mode" => Command::Mode,
        "cancel" => Command::Cancel,
        _ => return None,
    };
    Some((command, args.trim()))
}

/// Extract text content from a message.
fn extract_text(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.clone()),
            MediaKind::Photo(p) => p.caption.clone(),
            MediaKind::Document(d) => d.caption.clone(),
            _ => None,
        },
        _ => None,
    }
}

/// Downloadable image attached to a message.
#[derive(Debug, PartialEq, Eq)]
struct ImageFileInfo {
    file_id: String,
    mime_type: String,
}

/// Photos (largest size) and documents with an `image/*` mime type.
fn extract_image_file(msg: &Message) -> Option<ImageFileInfo> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            // Sizes are ordered smallest first.
            MediaKind::Photo(p) => p.photo.last().map(|ps| ImageFileInfo {
                file_id: ps.file.id.clone(),
                mime_type: "image/jpeg".to_string(),
            }),
            MediaKind::Document(d) => d
                .document
                .mime_type
                .as_ref()
                .map(|m| m.essence_str().to_string())
                .filter(|m| m.starts_with("image/"))
                .map(|mime_type| ImageFileInfo {
                    file_id: d.document.file.id.clone(),
                    mime_type,
                }),
            _ => None,
        },
        _ => None,
    }
}

/// Download a file from Telegram by file ID.
async fn download_telegram_file(bot: &Bot, file_id: &str) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;

    // Telegram file URL format: <api>/file/bot<token>/<file_path>
    let url = bot
        .api_url()
        .join(&format!("file/bot{}/{}", bot.token(), file.path))
        .map_err(|e| Error::message(format!("invalid file url: {e}")))?;

    let response = bot
        .client()
        .get(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(Error::message(format!(
            "failed to download file: HTTP {}",
            response.status()
        )));
    }
    Ok(response.bytes().await?.to_vec())
}
