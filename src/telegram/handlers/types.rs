//! Handler types and dependencies

use std::path::PathBuf;
use std::sync::Arc;

use crate::download::link::LinkDownloader;
use crate::upload::Coordinator;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub coordinator: Coordinator,
    pub link_downloader: Arc<LinkDownloader>,
    /// Where upload jobs keep their temp files
    pub temp_dir: PathBuf,
    /// Bot username (without @), for `/cmd@bot` addressing
    pub bot_username: String,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(
        coordinator: Coordinator,
        link_downloader: Arc<LinkDownloader>,
        temp_dir: PathBuf,
        bot_username: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            link_downloader,
            temp_dir,
            bot_username: bot_username.into(),
        }
    }
}
