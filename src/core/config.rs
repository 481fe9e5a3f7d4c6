//! Bot configuration
//!
//! Everything is read once at startup from the environment (a `.env` file is
//! loaded by `main` through dotenvy) into an explicit [`BotConfig`]. Backend
//! sections are handed to the adapters by value, so no credential lives in a
//! process-wide static.

use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram Bot API requests (in seconds)
    /// Large files go through the local Bot API server, keep it generous
    pub const REQUEST_TIMEOUT_SECS: u64 = 900; // 15 minutes

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Progress reporting configuration
pub mod progress {
    use super::Duration;

    /// Minimum percent delta between two status edits
    pub const MIN_PERCENT_STEP: u8 = 5;

    /// Maximum silence between two status edits (in seconds)
    pub const MAX_SILENCE_SECS: u64 = 3;

    /// Capacity of the acquirer -> reporter channel
    pub const CHANNEL_CAPACITY: usize = 64;

    /// Number of cells in the rendered bar
    pub const BAR_CELLS: usize = 20;

    pub fn max_silence() -> Duration {
        Duration::from_secs(MAX_SILENCE_SECS)
    }
}

/// MixDrop (single host locker) settings
#[derive(Debug)]
pub struct MixdropConfig {
    pub api_url: String,
    pub email: String,
    pub key: SecretString,
    pub timeout: Duration,
}

impl Default for MixdropConfig {
    fn default() -> Self {
        Self {
            api_url: "https://ul.mixdrop.ag/api".to_string(),
            email: String::new(),
            key: SecretString::from(String::new()),
            timeout: Duration::from_secs(180),
        }
    }
}

impl MixdropConfig {
    pub fn has_credentials(&self) -> bool {
        !self.email.is_empty() && !self.key.expose_secret().is_empty()
    }
}

/// MultiUp (multi-mirror) settings
#[derive(Debug)]
pub struct MultiupConfig {
    pub api_base: String,
    pub username: String,
    pub password: SecretString,
    pub project_name: String,
    pub project_password: String,
    pub project_description: String,
    pub file_description: String,
    /// Mirrors we ask MultiUp to replicate to
    pub allowed_hosts: Vec<String>,
}

impl Default for MultiupConfig {
    fn default() -> Self {
        Self {
            api_base: "https://multiup.io/api".to_string(),
            username: String::new(),
            password: SecretString::from(String::new()),
            project_name: "Telegram Uploads".to_string(),
            project_password: String::new(),
            project_description: "Uploaded via bot".to_string(),
            file_description: "Uploaded from Telegram bot".to_string(),
            allowed_hosts: ["gofile.io", "vikingfile.com", "savefiles.com", "streamtape.com"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
}

impl MultiupConfig {
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.expose_secret().is_empty()
    }
}

/// GoFile (anonymous store) settings
#[derive(Debug, Clone)]
pub struct GofileConfig {
    pub upload_url: String,
    /// Base of the synthesized direct download link
    pub download_base: String,
}

impl Default for GofileConfig {
    fn default() -> Self {
        Self {
            upload_url: "https://store2.gofile.io/uploadFile".to_string(),
            download_base: "https://store2.gofile.io/download/web".to_string(),
        }
    }
}

/// VOE settings
#[derive(Debug)]
pub struct VoeConfig {
    pub server_url: String,
    pub api_key: SecretString,
    pub public_base: String,
    pub timeout: Duration,
}

impl Default for VoeConfig {
    fn default() -> Self {
        Self {
            server_url: "https://voe.sx/api/upload/server".to_string(),
            api_key: SecretString::from(String::new()),
            public_base: "https://voe.sx".to_string(),
            timeout: Duration::from_secs(600),
        }
    }
}

impl VoeConfig {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
    }
}

/// VikingFile (single file share) settings
#[derive(Debug, Clone)]
pub struct VikiConfig {
    pub server_url: String,
    pub user_hash: String,
    pub path: String,
    pub path_public_share: String,
}

impl Default for VikiConfig {
    fn default() -> Self {
        Self {
            server_url: "https://vikingfile.com/api/get-server".to_string(),
            user_hash: String::new(),
            path: String::new(),
            path_public_share: String::new(),
        }
    }
}

/// Mux (transcoding platform) settings
#[derive(Debug)]
pub struct MuxConfig {
    pub uploads_url: String,
    pub token_id: String,
    pub token_secret: SecretString,
    pub put_timeout: Duration,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            uploads_url: "https://api.mux.com/video/v1/uploads".to_string(),
            token_id: String::new(),
            token_secret: SecretString::from(String::new()),
            put_timeout: Duration::from_secs(300),
        }
    }
}

impl MuxConfig {
    pub fn has_credentials(&self) -> bool {
        !self.token_id.is_empty() && !self.token_secret.expose_secret().is_empty()
    }
}

/// All upload destinations
#[derive(Debug, Default)]
pub struct BackendsConfig {
    pub mixdrop: MixdropConfig,
    pub multiup: MultiupConfig,
    pub gofile: GofileConfig,
    pub voe: VoeConfig,
    pub viki: VikiConfig,
    pub mux: MuxConfig,
}

/// Top-level configuration of the bot
#[derive(Debug)]
pub struct BotConfig {
    /// Bot token, read from BOT_TOKEN or TELOXIDE_TOKEN
    pub bot_token: SecretString,
    /// Custom (local) Bot API server, if any
    pub bot_api_url: Option<String>,
    /// Directory for per-job temp files
    pub temp_dir: PathBuf,
    /// Log file path
    pub log_file_path: String,
    /// Hard cap for `.link` downloads
    pub link_max_size_mb: u64,
    pub backends: BackendsConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: SecretString::from(String::new()),
            bot_api_url: None,
            temp_dir: env::temp_dir(),
            log_file_path: "app.log".to_string(),
            link_max_size_mb: 1900,
            backends: BackendsConfig::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_secret(key: &str) -> SecretString {
    SecretString::from(env::var(key).unwrap_or_default())
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl BotConfig {
    /// Builds the configuration from environment variables.
    ///
    /// Only the Telegram token is mandatory; backends with missing credentials
    /// are left out of the registry.
    pub fn from_env() -> AppResult<Self> {
        let defaults = BotConfig::default();

        let token = env::var("BOT_TOKEN")
            .or_else(|_| env::var("TELOXIDE_TOKEN"))
            .unwrap_or_default();
        if token.is_empty() {
            return Err(AppError::Config("BOT_TOKEN environment variable not set".to_string()));
        }

        let link_max_size_mb = match env::var("LINK_MAX_SIZE_MB") {
            Ok(v) => v
                .parse::<u64>()
                .map_err(|e| AppError::Config(format!("LINK_MAX_SIZE_MB: {}", e)))?,
            Err(_) => defaults.link_max_size_mb,
        };

        Ok(Self {
            bot_token: SecretString::from(token),
            bot_api_url: env::var("BOT_API_URL").ok().filter(|v| !v.is_empty()),
            temp_dir: env::var("TEMP_FILES_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            log_file_path: env_or("LOG_FILE_PATH", &defaults.log_file_path),
            link_max_size_mb,
            backends: BackendsConfig::from_env(),
        })
    }
}

impl BackendsConfig {
    /// Reads backend sections, falling back to the public endpoints.
    pub fn from_env() -> Self {
        let d = BackendsConfig::default();

        let allowed_hosts = env::var("MULTIUP_HOSTS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.split(',').map(|h| h.trim().to_string()).filter(|h| !h.is_empty()).collect())
            .unwrap_or(d.multiup.allowed_hosts);

        Self {
            mixdrop: MixdropConfig {
                api_url: env_or("MIXDROP_API_URL", &d.mixdrop.api_url),
                email: env_or("MIXDROP_EMAIL", ""),
                key: env_secret("MIXDROP_KEY"),
                timeout: env_secs("MIXDROP_TIMEOUT_SECS", d.mixdrop.timeout),
            },
            multiup: MultiupConfig {
                api_base: env_or("MULTIUP_API", &d.multiup.api_base),
                username: env_or("MULTIUP_USERNAME", ""),
                password: env_secret("MULTIUP_PASSWORD"),
                project_name: env_or("MULTIUP_PROJECT_NAME", &d.multiup.project_name),
                project_password: env_or("MULTIUP_PROJECT_PASSWORD", ""),
                project_description: d.multiup.project_description,
                file_description: d.multiup.file_description,
                allowed_hosts,
            },
            gofile: GofileConfig {
                upload_url: env_or("GOFILE_UPLOAD_URL", &d.gofile.upload_url),
                download_base: env_or("GOFILE_DOWNLOAD_BASE", &d.gofile.download_base),
            },
            voe: VoeConfig {
                server_url: env_or("VOE_API_SERVER", &d.voe.server_url),
                api_key: env_secret("VOE_API_KEY"),
                public_base: d.voe.public_base,
                timeout: env_secs("VOE_TIMEOUT_SECS", d.voe.timeout),
            },
            viki: VikiConfig {
                server_url: env_or("VIKI_SERVER_URL", &d.viki.server_url),
                user_hash: env_or("VIKI_USER_HASH", ""),
                path: env_or("VIKI_PATH", ""),
                path_public_share: env_or("VIKI_PATH_PUBLIC_SHARE", ""),
            },
            mux: MuxConfig {
                uploads_url: env_or("MUX_UPLOADS_URL", &d.mux.uploads_url),
                token_id: env_or("MUX_TOKEN_ID", ""),
                token_secret: env_secret("MUX_TOKEN_SECRET"),
                put_timeout: env_secs("MUX_PUT_TIMEOUT_SECS", d.mux.put_timeout),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_to_public_endpoints() {
        let cfg = BackendsConfig::default();
        assert_eq!(cfg.gofile.upload_url, "https://store2.gofile.io/uploadFile");
        assert_eq!(cfg.gofile.download_base, "https://store2.gofile.io/download/web");
        assert_eq!(cfg.mixdrop.timeout, Duration::from_secs(180));
        assert_eq!(cfg.mux.put_timeout, Duration::from_secs(300));
        assert_eq!(cfg.multiup.allowed_hosts.len(), 4);
    }

    #[test]
    fn test_no_embedded_credentials() {
        let cfg = BackendsConfig::default();
        assert!(cfg.multiup.username.is_empty());
        assert!(cfg.multiup.password.expose_secret().is_empty());
        assert!(cfg.mixdrop.email.is_empty());
        assert!(cfg.mixdrop.key.expose_secret().is_empty());
    }

    #[test]
    fn test_has_credentials_needs_every_field() {
        let mut mixdrop = MixdropConfig {
            email: "me@example.com".to_string(),
            ..MixdropConfig::default()
        };
        assert!(!mixdrop.has_credentials());
        mixdrop.key = SecretString::from("k".to_string());
        assert!(mixdrop.has_credentials());

        let mux = MuxConfig {
            token_secret: SecretString::from("s".to_string()),
            ..MuxConfig::default()
        };
        assert!(!mux.has_credentials());
        assert!(!BackendsConfig::default().voe.has_credentials());
        assert!(!BackendsConfig::default().multiup.has_credentials());
    }

    #[test]
    fn test_progress_constants() {
        assert_eq!(progress::max_silence(), Duration::from_secs(3));
        assert_eq!(progress::BAR_CELLS, 20);
    }
}
