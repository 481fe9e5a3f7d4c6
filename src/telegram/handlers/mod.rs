//! Telegram bot handler tree configuration
//!
//! The dispatcher schema is built from [`HandlerDeps`] alone, so integration
//! tests can drive the same tree as production code.

mod commands;
mod schema;
mod types;
mod uploads;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
