//! Bot initialization and command parsing
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - `.`-prefixed command support

use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config::{self, BotConfig};
use crate::core::error::{AppError, AppResult};

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "check bot status")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "reply to media to pick an upload service")]
    Up,
    #[command(description = "reply to media to upload it to Mux")]
    Muxup,
    #[command(description = "download a file from a URL")]
    Link(String),
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(AppError)` - Failed to create bot (invalid URL, HTTP client setup)
pub fn create_bot(cfg: &BotConfig) -> AppResult<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(cfg.bot_token.expose_secret(), client);

    // Check if local Bot API server is configured
    let bot = match &cfg.bot_api_url {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url)
                .map_err(|e| AppError::Config(format!("Invalid BOT_API_URL: {}", e)))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

/// Parses a command written with either a `/` or a `.` prefix.
///
/// `.up` and `/up` are the same command; `bot_username` lets `/up@my_bot`
/// through while rejecting commands addressed to other bots. Commands
/// without arguments ignore trailing words (`.up for the archive`).
pub fn parse_command(text: &str, bot_username: &str) -> Option<Command> {
    let text = text.trim_start();
    let normalized = match text.strip_prefix('.') {
        Some(rest) => format!("/{}", rest),
        None => text.to_string(),
    };
    Command::parse(&normalized, bot_username).ok().or_else(|| {
        let head = normalized.split_whitespace().next()?;
        Command::parse(head, bot_username).ok()
    })
}
