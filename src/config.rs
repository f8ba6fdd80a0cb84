//! Client configuration
//!
//! Read from `config.yaml` in the user's config directory, then overridden by
//! a `.env` file next to it and finally by the process environment.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "sttcast-client";
const DEFAULT_BASE_URL: &str = "http://localhost:8004";
const DEFAULT_LANGUAGE: &str = "es";
const DEFAULT_ASK_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CHART_WIDTH: f64 = 800.0;
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Path prefix used when the service is mounted behind the shared proxy
pub const PROXIED_PREFIX: &str = "/sttcast";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host of the question service, e.g. `https://example.org`
    pub base_url: String,
    /// Mount point of the service; when unset it is derived from `page_path`
    pub base_path: Option<String>,
    /// Path of the page the client was opened from
    pub page_path: Option<String>,
    pub language: String,
    pub ask_timeout_secs: u64,
    pub chart_width: f64,
    pub llm_model: String,
    /// Raw `Cookie` header value for authenticated admin endpoints
    pub session_cookie: Option<String>,
    pub wake_lock: Option<WakeLockCommand>,
}

/// External command held alive for the duration of a long request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WakeLockCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            base_path: None,
            page_path: None,
            language: DEFAULT_LANGUAGE.to_string(),
            ask_timeout_secs: DEFAULT_ASK_TIMEOUT_SECS,
            chart_width: DEFAULT_CHART_WIDTH,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            session_cookie: None,
            wake_lock: default_wake_lock(),
        }
    }
}

fn default_wake_lock() -> Option<WakeLockCommand> {
    if cfg!(target_os = "macos") {
        Some(WakeLockCommand {
            program: "caffeinate".to_string(),
            args: vec!["-s".to_string()],
        })
    } else {
        None
    }
}

impl ClientConfig {
    /// Default config file location (`~/.config/sttcast-client/config.yaml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.yaml"))
    }

    /// Load from `path`, or the default location when `None`.
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };

        let mut config = match &path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(p)?;
                log::info!("Loading client config from {}", p.display());
                serde_yaml::from_str::<ClientConfig>(&content)?
            }
            _ => ClientConfig::default(),
        };

        if let Some(dir) = path.as_deref().and_then(Path::parent) {
            config.apply_env_file(dir);
        }
        config.apply_process_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_file(&mut self, dir: &Path) {
        if let Some(v) = load_env_value(dir, "STTCAST_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = load_env_value(dir, "STTCAST_BASE_PATH") {
            self.base_path = Some(v);
        }
        if let Some(v) = load_env_value(dir, "STTCAST_SESSION") {
            self.session_cookie = Some(v);
        }
        if let Some(v) = load_env_value(dir, "STTCAST_LANGUAGE") {
            self.language = v;
        }
    }

    fn apply_process_env(&mut self) {
        let get = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        if let Some(v) = get("STTCAST_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("STTCAST_BASE_PATH") {
            self.base_path = Some(v);
        }
        if let Some(v) = get("STTCAST_SESSION") {
            self.session_cookie = Some(v);
        }
        if let Some(v) = get("STTCAST_LANGUAGE") {
            self.language = v;
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "base_url must start with http:// or https:// (got {:?})",
                self.base_url
            )));
        }
        if self.ask_timeout_secs == 0 {
            return Err(AppError::Config("ask_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Mount point of the API: explicit `base_path`, else `/sttcast` when the
    /// page was opened under it, else the root.
    pub fn resolved_base_path(&self) -> String {
        if let Some(bp) = &self.base_path {
            return bp.trim_end_matches('/').to_string();
        }
        match &self.page_path {
            Some(p) if p.starts_with(PROXIED_PREFIX) => PROXIED_PREFIX.to_string(),
            _ => String::new(),
        }
    }

    pub fn ask_timeout(&self) -> Duration {
        Duration::from_secs(self.ask_timeout_secs)
    }
}

/// Load a value from the .env file in `dir` by key name
pub fn load_env_value(dir: &Path, key: &str) -> Option<String> {
    let env_path = dir.join(".env");
    let prefix = format!("{}=", key);
    let content = std::fs::read_to_string(env_path).ok()?;
    content.lines().find_map(|line| {
        let value = line
            .trim()
            .strip_prefix(&prefix)?
            .trim()
            .trim_matches('"')
            .trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}
