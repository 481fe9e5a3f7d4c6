//! Command handler implementations (/start, /help, /up, /muxup, /link)

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InputFile, Message, MessageId, ReplyParameters};

use super::types::{HandlerDeps, HandlerError};
use crate::core::error::AppResult;
use crate::core::filetype::FileCategory;
use crate::download::link::{filename_from, parse_link, LinkDownload};
use crate::download::progress::{self, push, spawn_reporter, ProgressReporter};
use crate::download::{MediaKind, MediaReference};
use crate::telegram::menu::{build_upload_keyboard, StatusMessage};
use crate::upload::{BackendId, UploadJob};

const START_TEXT: &str = "👋 Hello! I'm your assistant bot. Use /help to see all commands.";

const HELP_TEXT: &str = "\
📖 Available commands

File Management:
• Reply .up - Upload to MixDrop, MultiUp, GoFile, VOE or Viki
• Reply .muxup - Upload to Mux
• .link <url> - Download from URL

Basic:
• /start - Check bot status
• /help - Show this menu

💡 All commands work with either . or / prefix";

const UP_USAGE: &str = "⚠️ Please reply to a video, document, photo, or audio file with .up or /up.";
const MUXUP_USAGE: &str = "⚠️ Please reply to a video, document, or audio file with .muxup or /muxup.";
const LINK_USAGE: &str = "❌ Please provide a URL. Usage: .link <url>";

async fn reply_text(bot: &Bot, msg: &Message, text: &str) -> Result<(), HandlerError> {
    bot.send_message(msg.chat.id, text)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Handle /start command
pub(super) async fn handle_start_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    reply_text(bot, msg, START_TEXT).await
}

/// Handle /help command
pub(super) async fn handle_help_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    reply_text(bot, msg, HELP_TEXT).await
}

/// Handle /up: offer the service menu as a reply to the media message.
///
/// The menu hangs off the media message so the button handler finds the
/// media through `reply_to_message` of the menu.
pub(super) async fn handle_up_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    let Some(media) = msg.reply_to_message().and_then(MediaReference::from_message) else {
        return reply_text(bot, msg, UP_USAGE).await;
    };

    bot.send_message(
        msg.chat.id,
        format!("Select upload service for {}:", media.display_name()),
    )
    .reply_parameters(ReplyParameters::new(MessageId(media.message_id)))
    .reply_markup(build_upload_keyboard(media.message_id))
    .await?;
    Ok(())
}

/// Handle /muxup: mirror the replied video, document or audio to Mux.
pub(super) async fn handle_muxup_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let media = msg
        .reply_to_message()
        .and_then(MediaReference::from_message)
        .filter(|m| m.kind != MediaKind::Photo);
    let Some(media) = media else {
        return reply_text(bot, msg, MUXUP_USAGE).await;
    };

    let status = StatusMessage::reply(bot, msg.chat.id, msg.id, "📥 Downloading media for Mux upload...").await?;
    let mut job = UploadJob::new(BackendId::Mux, media, &deps.temp_dir);
    let coordinator = deps.coordinator.clone();

    // Long transfers must not hold up the chat's update queue
    tokio::spawn(async move {
        coordinator.run(&mut job, Arc::new(status)).await;
        log::info!("Mux job {} finished: {:?}", job.id, job.state());
    });
    Ok(())
}

/// Handle /link: download a URL and send it back by file category.
pub(super) async fn handle_link_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    arg: &str,
) -> Result<(), HandlerError> {
    let raw = arg.trim();
    if raw.is_empty() {
        return reply_text(bot, msg, LINK_USAGE).await;
    }
    let url = match parse_link(raw) {
        Ok(url) => url,
        Err(e) => return reply_text(bot, msg, &format!("❌ Error: {}", e)).await,
    };

    let status = StatusMessage::reply(bot, msg.chat.id, msg.id, "⏬ Downloading... Please wait.").await?;
    let bot = bot.clone();
    let chat_id = msg.chat.id;
    let reply_to = msg.id;
    let downloader = deps.link_downloader.clone();

    tokio::spawn(async move {
        let (tx, rx) = progress::channel();
        let reporter = ProgressReporter::new("Downloading", filename_from(&Default::default(), &url));
        let reporter = spawn_reporter(reporter, rx, Arc::new(status.clone()));
        let downloaded = downloader.download(&url, &tx).await;
        drop(tx);
        if let Err(e) = reporter.await {
            log::warn!("Link progress reporter crashed: {}", e);
        }

        let download = match downloaded {
            Ok(download) => download,
            Err(e) => {
                log::error!("Link download error: {}", e);
                push(&status, &format!("❌ Error: {}", e)).await;
                return;
            }
        };

        push(
            &status,
            &format!(
                "📥 Download complete. Uploading to Telegram...\n📁 Filename: {}\n📊 Size: {:.1} MB",
                download.filename,
                download.size_mb()
            ),
        )
        .await;

        let caption = format!("Downloaded from: {}", url);
        let sent = send_download(&bot, chat_id, reply_to, &download, &caption).await;
        if let Err(e) = tokio::fs::remove_file(&download.path).await {
            log::warn!("Failed to remove {}: {}", download.path.display(), e);
        }

        match sent {
            Ok(()) => status.delete().await,
            Err(e) => {
                log::error!("Failed to send {}: {}", download.filename, e);
                push(&status, &format!("❌ Error: {}", e)).await;
            }
        }
    });
    Ok(())
}

/// Sends a finished download with the method matching its category.
async fn send_download(
    bot: &Bot,
    chat_id: ChatId,
    reply_to: MessageId,
    download: &LinkDownload,
    caption: &str,
) -> AppResult<()> {
    let file = InputFile::file(&download.path).file_name(download.filename.clone());
    let reply = ReplyParameters::new(reply_to);

    match download.category {
        FileCategory::Video => {
            bot.send_video(chat_id, file)
                .caption(caption)
                .supports_streaming(true)
                .reply_parameters(reply)
                .await?;
        }
        FileCategory::Photo => {
            bot.send_photo(chat_id, file).caption(caption).reply_parameters(reply).await?;
        }
        FileCategory::Audio => {
            bot.send_audio(chat_id, file).caption(caption).reply_parameters(reply).await?;
        }
        FileCategory::Document => {
            bot.send_document(chat_id, file).caption(caption).reply_parameters(reply).await?;
        }
    }
    Ok(())
}
