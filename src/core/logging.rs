//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Backend credentials diagnostics at startup

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config::BackendsConfig;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Returns the backends that have no credentials configured.
///
/// GoFile and VikingFile work anonymously and are never reported.
pub fn missing_credentials(cfg: &BackendsConfig) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !cfg.mixdrop.has_credentials() {
        missing.push("MixDrop (MIXDROP_EMAIL / MIXDROP_KEY)");
    }
    if !cfg.multiup.has_credentials() {
        missing.push("MultiUp (MULTIUP_USERNAME / MULTIUP_PASSWORD)");
    }
    if !cfg.voe.has_credentials() {
        missing.push("VOE (VOE_API_KEY)");
    }
    if !cfg.mux.has_credentials() {
        missing.push("Mux (MUX_TOKEN_ID / MUX_TOKEN_SECRET)");
    }
    missing
}

/// Logs upload backends configuration at application startup
pub fn log_backends_configuration(cfg: &BackendsConfig) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📦 Upload Backends Check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("GoFile:  {}", cfg.gofile.upload_url);
    log::info!("Viki:    {}", cfg.viki.server_url);
    log::info!("MixDrop: {}", cfg.mixdrop.api_url);
    log::info!("MultiUp: {} (hosts: {})", cfg.multiup.api_base, cfg.multiup.allowed_hosts.join(", "));
    log::info!("VOE:     {}", cfg.voe.server_url);
    log::info!("Mux:     {}", cfg.mux.uploads_url);

    let missing = missing_credentials(cfg);
    if missing.is_empty() {
        log::info!("✅ All backends have credentials");
    } else {
        for backend in missing {
            log::warn!("⚠️  {}: credentials not set, backend disabled", backend);
        }
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
