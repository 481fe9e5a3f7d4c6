//! Upload menu keyboard and the editable status message

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId};

use crate::core::error::AppResult;
use crate::download::StatusSink;
use crate::upload::job::{callback_data, BackendChoice};
use crate::upload::BackendId;

/// Builds the service picker for the media in `message_id`.
///
/// Three rows: MixDrop/MultiUp/GoFile, VOE/Viki, ALL.
pub fn build_upload_keyboard(message_id: i32) -> InlineKeyboardMarkup {
    let button = |id: BackendId| {
        InlineKeyboardButton::callback(id.display_name(), callback_data(BackendChoice::One(id), message_id))
    };

    InlineKeyboardMarkup::new(vec![
        vec![
            button(BackendId::Mixdrop),
            button(BackendId::Multiup),
            button(BackendId::Gofile),
        ],
        vec![button(BackendId::Voe), button(BackendId::Viki)],
        vec![InlineKeyboardButton::callback(
            "ALL",
            callback_data(BackendChoice::All, message_id),
        )],
    ])
}

/// A chat message that is edited in place to show job status.
#[derive(Clone)]
pub struct StatusMessage {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
}

impl StatusMessage {
    pub fn new(bot: Bot, chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            bot,
            chat_id,
            message_id,
        }
    }

    /// Sends `text` as a reply to `reply_to` and wraps the new message.
    pub async fn reply(bot: &Bot, chat_id: ChatId, reply_to: MessageId, text: &str) -> AppResult<Self> {
        let msg = bot
            .send_message(chat_id, text)
            .reply_parameters(teloxide::types::ReplyParameters::new(reply_to))
            .await?;
        Ok(Self::new(bot.clone(), chat_id, msg.id))
    }

    pub async fn delete(&self) {
        if let Err(e) = self.bot.delete_message(self.chat_id, self.message_id).await {
            log::warn!("Failed to delete status message: {}", e);
        }
    }
}

#[async_trait]
impl StatusSink for StatusMessage {
    async fn update(&self, text: &str) -> AppResult<()> {
        match self.bot.edit_message_text(self.chat_id, self.message_id, text).await {
            Ok(_) => Ok(()),
            // Same text as before
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
