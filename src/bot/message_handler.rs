//! Message Handler module for processing incoming Telegram messages

use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{debug, error, info_span, Instrument};

use crate::localization::t_lang;

use super::controller::{BotController, InboundPhoto};
use super::ui_builder::{format_too_large, split_message, TELEGRAM_MESSAGE_LIMIT};

fn language_code(msg: &Message) -> Option<&str> {
    msg.from
        .as_ref()
        .and_then(|user| user.language_code.as_deref())
}

/// History is keyed by the sender; channel posts without a sender fall back to the chat
fn sender_id(msg: &Message) -> i64 {
    msg.from
        .as_ref()
        .map(|user| user.id.0 as i64)
        .unwrap_or(msg.chat.id.0)
}

/// Download a Telegram file into memory
pub async fn download_file(bot: &Bot, file_id: FileId) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await.context("Failed to get file info")?;

    let mut bytes = Vec::new();
    bot.download_file(&file.path, &mut bytes)
        .await
        .context("Failed to download file")?;

    debug!(bytes = bytes.len(), "File downloaded");
    Ok(bytes)
}

/// Send a reply, split into several messages if it is too long for Telegram
pub async fn send_reply(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    for chunk in split_message(text, TELEGRAM_MESSAGE_LIMIT) {
        bot.send_message(chat_id, chunk).await?;
    }
    Ok(())
}

async fn analyze_file(
    bot: &Bot,
    msg: &Message,
    controller: &BotController,
    file_id: FileId,
    file_size: u64,
) -> Result<()> {
    let language_code = language_code(msg);

    // Telegram reports the size up front, no need to download oversized files
    let max = controller.preprocess_config().max_input_bytes;
    if file_size > max {
        return send_reply(bot, msg.chat.id, &format_too_large(file_size, max, language_code)).await;
    }

    bot.send_message(msg.chat.id, t_lang("processing-photo", language_code))
        .await?;

    let bytes = download_file(bot, file_id).await?;
    let reply = controller
        .handle_photo(InboundPhoto {
            user_id: sender_id(msg),
            request_id: msg.id.0,
            bytes,
            language_code: language_code.map(str::to_string),
        })
        .await;

    send_reply(bot, msg.chat.id, &reply).await
}

async fn handle_text_message(bot: &Bot, msg: &Message, controller: &BotController) -> Result<()> {
    if let Some(text) = msg.text() {
        debug!(message_length = text.len(), "Received text message");
        let reply = controller
            .handle_text(sender_id(msg), text, language_code(msg))
            .await;
        if let Some(reply) = reply {
            send_reply(bot, msg.chat.id, &reply).await?;
        }
    }
    Ok(())
}

async fn handle_photo_message(bot: &Bot, msg: &Message, controller: &BotController) -> Result<()> {
    debug!("Received photo message");

    let largest_photo = msg
        .photo()
        .and_then(|photos| photos.iter().max_by_key(|p| u64::from(p.width) * u64::from(p.height)));

    if let Some(photo) = largest_photo {
        analyze_file(
            bot,
            msg,
            controller,
            photo.file.id.clone(),
            u64::from(photo.file.size),
        )
        .await?;
    }
    Ok(())
}

async fn handle_document_message(bot: &Bot, msg: &Message, controller: &BotController) -> Result<()> {
    let language_code = language_code(msg);

    if let Some(doc) = msg.document() {
        let is_image = doc
            .mime_type
            .as_ref()
            .is_some_and(|mime| mime.to_string().starts_with("image/"));

        if is_image {
            debug!(mime_type = ?doc.mime_type, "Received image document");
            analyze_file(bot, msg, controller, doc.file.id.clone(), u64::from(doc.file.size)).await?;
        } else {
            debug!(mime_type = ?doc.mime_type, "Received non-image document");
            bot.send_message(msg.chat.id, t_lang("error-unsupported-document", language_code))
                .await?;
        }
    }
    Ok(())
}

async fn handle_unsupported_message(bot: &Bot, msg: &Message) -> Result<()> {
    debug!("Received unsupported message type");
    bot.send_message(msg.chat.id, t_lang("unsupported-message", language_code(msg)))
        .await?;
    Ok(())
}

async fn dispatch_message(bot: &Bot, msg: &Message, controller: &BotController) -> Result<()> {
    if msg.text().is_some() {
        handle_text_message(bot, msg, controller).await
    } else if msg.photo().is_some() {
        handle_photo_message(bot, msg, controller).await
    } else if msg.document().is_some() {
        handle_document_message(bot, msg, controller).await
    } else {
        handle_unsupported_message(bot, msg).await
    }
}

/// Entry point for every message update
///
/// Failures the controller does not already turn into a reply (download or
/// Telegram API errors) are logged here and answered with the generic failure
/// message, so one bad update never takes the dispatcher down.
pub async fn message_handler(bot: Bot, msg: Message, controller: Arc<BotController>) -> Result<()> {
    let span = info_span!(
        "message",
        user_id = sender_id(&msg),
        chat_id = msg.chat.id.0,
        message_id = msg.id.0
    );

    async move {
        if let Err(e) = dispatch_message(&bot, &msg, &controller).await {
            error!("Failed to handle message: {e:#}");
            bot.send_message(msg.chat.id, t_lang("error-processing-failed", language_code(&msg)))
                .await?;
        }
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}
