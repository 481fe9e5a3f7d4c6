use anyhow::Result;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use upmirror::cli::{Cli, Commands};
use upmirror::core::config::{BackendsConfig, BotConfig};
use upmirror::core::{init_logger, log_backends_configuration};
use upmirror::download::link::LinkDownloader;
use upmirror::download::TelegramAcquirer;
use upmirror::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use upmirror::upload::job::format_result;
use upmirror::upload::{BackendId, BackendRegistry, Coordinator};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, configuration, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics of handler tasks instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    let log_file_path = std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| BotConfig::default().log_file_path);
    init_logger(&log_file_path)?;

    match cli.command {
        Some(Commands::Upload {
            backend,
            file,
            name,
            json,
        }) => run_cli_upload(backend, file, name, json).await,
        Some(Commands::Run) => run_bot().await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot().await
        }
    }
}

/// Runs the Telegram bot until Ctrl-C
async fn run_bot() -> Result<()> {
    let cfg = BotConfig::from_env()?;
    log_backends_configuration(&cfg.backends);

    tokio::fs::create_dir_all(&cfg.temp_dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create temp dir {}: {}", cfg.temp_dir.display(), e))?;

    let bot = create_bot(&cfg)?;
    let me = bot
        .get_me()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to Bot API: {}", e))?;
    let bot_username = me.username().to_string();
    log::info!("🤖 Bot @{} started", bot_username);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let acquirer = Arc::new(TelegramAcquirer::new(bot.clone(), cfg.bot_api_url.as_deref())?);
    let link_downloader = Arc::new(LinkDownloader::new(cfg.temp_dir.clone(), cfg.link_max_size_mb)?);
    let coordinator = Coordinator::new(acquirer, BackendRegistry::from_config(cfg.backends));
    let deps = HandlerDeps::new(coordinator, link_downloader, cfg.temp_dir, bot_username);

    // Updates queued while the bot was down are stale menu presses
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

/// Uploads one local file through a backend adapter
async fn run_cli_upload(backend: BackendId, file: PathBuf, name: Option<String>, json: bool) -> Result<()> {
    let backends = BackendsConfig::from_env();
    log_backends_configuration(&backends);

    let registry = BackendRegistry::from_config(backends);
    let adapter = registry
        .get(backend)
        .ok_or_else(|| anyhow::anyhow!("Backend {} is not configured, check its credentials", backend))?;

    let filename = name
        .or_else(|| file.file_name().map(|n| n.to_string_lossy().into_owned()))
        .ok_or_else(|| anyhow::anyhow!("Cannot derive a file name from {}", file.display()))?;
    let size = tokio::fs::metadata(&file)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", file.display(), e))?
        .len();

    log::info!("📤 Uploading {} ({} bytes) to {}", filename, size, adapter.display_name());
    let result = adapter.upload(&file, &filename).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_result(backend, &filename, size, &result));
    }

    if let Some(reason) = result.reason() {
        anyhow::bail!("Upload failed: {}", reason);
    }
    Ok(())
}
