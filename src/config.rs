//! Configuration loader and validator for the newzly CLI.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `gemini.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub gemini: Gemini,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default = "default_video_poll_interval_secs")]
    pub video_poll_interval_secs: u64,
}

/// Generative API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gemini {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_video_poll_interval_secs() -> u64 {
    10
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/".into()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".into()
}

fn default_image_model() -> String {
    "imagen-4.0-generate-001".into()
}

fn default_video_model() -> String {
    "veo-2.0-generate-001".into()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    pub fn video_poll_interval(&self) -> Duration {
        Duration::from_secs(self.app.video_poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.request_timeout_secs)
    }

    /// SQLite location used when `DATABASE_URL` is not set.
    pub fn database_url(&self) -> String {
        format!(
            "sqlite://{}/newzly.db",
            self.app.data_dir.trim_end_matches('/')
        )
    }
}

/// Load configuration from a YAML file, apply environment overrides and
/// validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    apply_env(&mut cfg, std::env::var(API_KEY_ENV).ok());
    validate(&cfg)?;
    Ok(cfg)
}

fn apply_env(cfg: &mut Config, api_key: Option<String>) {
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        cfg.gemini.api_key = key;
    }
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.video_poll_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "app.video_poll_interval_secs must be > 0",
        ));
    }

    if cfg.gemini.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "gemini.api_key must be non-empty (or set GEMINI_API_KEY)",
        ));
    }
    if reqwest::Url::parse(&cfg.gemini.base_url).is_err() {
        return Err(ConfigError::Invalid("gemini.base_url must be a valid URL"));
    }
    if cfg.gemini.text_model.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.text_model must be non-empty"));
    }
    if cfg.gemini.image_model.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.image_model must be non-empty"));
    }
    if cfg.gemini.video_model.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.video_model must be non-empty"));
    }
    if cfg.gemini.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "gemini.request_timeout_secs must be > 0",
        ));
    }

    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  video_poll_interval_secs: 10

gemini:
  api_key: "YOUR_GEMINI_API_KEY"
  base_url: "https://generativelanguage.googleapis.com/"
  text_model: "gemini-2.5-flash"
  image_model: "imagen-4.0-generate-001"
  video_model: "veo-2.0-generate-001"
  request_timeout_secs: 120
"#
}
