use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::controller::RenderOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Base URL of the log server, e.g. `http://127.0.0.1:5000`
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// 0 disables the timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// chrono format for the date column
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_api_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("hamlog-frontend/{}", env!("CARGO_PKG_VERSION"))
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            date_format: default_date_format(),
        }
    }
}

impl FrontendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: FrontendConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            date_format: self.date_format.clone(),
        }
    }
}

pub static CONFIG: OnceLock<FrontendConfig> = OnceLock::new();

/// Load `path` into [`CONFIG`]. A missing file gives the defaults.
///
/// Logging is not up yet when this runs, so the missing-file notice goes to stderr.
pub fn read_config(path: impl AsRef<Path>) -> anyhow::Result<&'static FrontendConfig> {
    let path = path.as_ref();
    let config = if path.exists() {
        FrontendConfig::from_file(path)?
    } else {
        eprintln!("Config file {} not found, using defaults", path.display());
        FrontendConfig::default()
    };

    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = FrontendConfig::from_toml(r#"api_url = "http://logbook.local:8080""#).unwrap();
        assert_eq!(config.api_url, "http://logbook.local:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert!(config.user_agent.starts_with("hamlog-frontend/"));
        assert_eq!(config.render_options(), RenderOptions::default());
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let config = FrontendConfig::from_toml("request_timeout_secs = 0\ndate_format = \"%d.%m.%Y\"").unwrap();
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.render_options().date_format, "%d.%m.%Y");
    }

    #[test]
    fn test_bad_config_is_an_error() {
        assert!(FrontendConfig::from_toml("request_timeout_secs = \"soon\"").is_err());
        assert!(FrontendConfig::from_file("does/not/exist.toml").is_err());
    }

    #[test]
    fn test_read_config_without_file() {
        let config = read_config("does/not/exist.toml").unwrap();
        assert!(CONFIG.get().is_some());
        assert!(!config.api_url.is_empty());
    }
}
