//! upmirror - Telegram bot that mirrors replied-to media onto file hosts
//!
//! A user replies `/up` to a media message, picks a service from the inline
//! menu, and the bot downloads the media to a job-private temp file, uploads
//! it to the chosen backend and edits the menu into the result.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, file type classification
//! - `download`: Temp-file acquisition, `/link` downloads, progress reporting
//! - `upload`: Backend adapters, registry and the job coordinator
//! - `telegram`: Bot setup, commands, menu and dispatcher schema
//! - `cli`: Command-line interface

pub mod cli;
pub mod core;
pub mod download;
pub mod telegram;
pub mod upload;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use upload::{BackendId, Coordinator, UploadBackend, UploadResult};
