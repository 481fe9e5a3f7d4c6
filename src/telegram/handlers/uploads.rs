//! Upload menu callbacks (`up:<backend>:<message_id>`)

use std::sync::Arc;

use teloxide::prelude::*;

use super::types::{HandlerDeps, HandlerError};
use crate::download::{MediaReference, StatusSink};
use crate::telegram::menu::StatusMessage;
use crate::upload::job::{
    check_reference, format_result, parse_callback_data, BackendChoice, ALL_NOT_AVAILABLE,
};
use crate::upload::{UploadJob, UploadResult};

/// Handles a press on the upload menu.
///
/// The menu message itself becomes the job's status message. The media is
/// looked up through the menu's `reply_to_message`, and must be the message
/// named in the callback data.
pub(super) async fn handle_upload_callback(bot: Bot, q: CallbackQuery, deps: HandlerDeps) -> Result<(), HandlerError> {
    // Stop the client-side spinner first
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        log::debug!("Failed to answer callback query: {}", e);
    }

    let data = q.data.as_deref().unwrap_or_default();
    log::info!("[UPLOAD_CALLBACK] {} from {}", data, q.from.id);

    let Some(menu) = q.regular_message() else {
        log::warn!("Callback {} without an accessible message", data);
        return Ok(());
    };
    let status = StatusMessage::new(bot.clone(), menu.chat.id, menu.id);

    let request = match parse_callback_data(data) {
        Ok(request) => request,
        Err(e) => {
            status.update(&format!("❌ {}.", e)).await?;
            return Ok(());
        }
    };

    let backend = match request.choice {
        BackendChoice::One(id) => id,
        BackendChoice::All => {
            status.update(ALL_NOT_AVAILABLE).await?;
            return Ok(());
        }
    };

    let found = menu.reply_to_message().and_then(MediaReference::from_message);
    let media = match check_reference(found, request.message_id) {
        Ok(media) => media,
        Err(e) => {
            log::warn!("Upload callback {}: {}", data, e);
            let text = format_result(backend, "", 0, &UploadResult::from(e));
            status.update(&text).await?;
            return Ok(());
        }
    };

    let mut job = UploadJob::new(backend, media, &deps.temp_dir);
    log::info!("📤 Job {}: {} -> {}", job.id, job.filename, backend);

    // Long transfers must not hold up the chat's update queue
    let coordinator = deps.coordinator.clone();
    tokio::spawn(async move {
        coordinator.run(&mut job, Arc::new(status)).await;
        log::info!("Job {} finished: {:?}", job.id, job.state());
    });
    Ok(())
}
