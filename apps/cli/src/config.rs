use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::{ClientConfig, DEFAULT_API_URL, DEFAULT_AUTH_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "marketplace.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub auth_timeout_secs: u64,
    pub session_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT.as_secs(),
            session_path: PathBuf::from("./data/session.json"),
        }
    }
}

impl Settings {
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let config = ClientConfig::new(&self.api_url)
            .with_context(|| format!("invalid api url '{}'", self.api_url))?;
        Ok(config.with_timeouts(
            Duration::from_secs(self.request_timeout_secs),
            Duration::from_secs(self.auth_timeout_secs),
        ))
    }
}

/// Defaults, then the config file, then environment variables. An explicit
/// `config_path` must exist; the default `marketplace.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match config_path {
        Some(path) => read_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            read_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => Settings::default(),
    };
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn read_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config file '{}'", path.display()))
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("MARKETPLACE_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = lookup("APP__AUTH_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.auth_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__SESSION_PATH") {
        settings.session_path = PathBuf::from(v);
    }
}
