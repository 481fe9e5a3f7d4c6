//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod menu;

pub use teloxide::Bot;

// Re-exports for convenience
pub use bot::{create_bot, parse_command, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use menu::{build_upload_keyboard, StatusMessage};
