//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{
    handle_help_command, handle_link_command, handle_muxup_command, handle_start_command, handle_up_command,
};
use super::types::{HandlerDeps, HandlerError};
use super::uploads::handle_upload_callback;
use crate::telegram::bot::{parse_command, Command};

/// Creates the main dispatcher schema for the Telegram bot.
///
/// # Arguments
/// * `deps` - Handler dependencies (coordinator, link downloader, temp dir)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Commands with `/` or `.` prefix
        .branch(command_handler(deps_commands))
        // Upload menu buttons
        .branch(callback_handler(deps_callback))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let bot_username = deps.bot_username.clone();

    Update::filter_message()
        .filter_map(move |msg: Message| msg.text().and_then(|text| parse_command(text, &bot_username)))
        .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start => handle_start_command(&bot, &msg).await?,
                    Command::Help => handle_help_command(&bot, &msg).await?,
                    Command::Up => handle_up_command(&bot, &msg).await?,
                    Command::Muxup => handle_muxup_command(&bot, &msg, &deps).await?,
                    Command::Link(arg) => handle_link_command(&bot, &msg, &deps, &arg).await?,
                }
                Ok(())
            }
        })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { handle_upload_callback(bot, q, deps).await }
    })
}
