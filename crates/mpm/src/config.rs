//! Configuration loading.
//!
//! Settings come from `$XDG_CONFIG_HOME/mpm/config.toml` (every key is
//! optional), then command-line overrides. Secrets are never read from the
//! file: the password comes from `MPM_PASSWORD` and a pre-issued token from
//! `MPM_TOKEN`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mpm_core::{EngineConfig, DEFAULT_HISTORY_CAPACITY};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TuiError};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const PASSWORD_ENV: &str = "MPM_PASSWORD";
pub const TOKEN_ENV: &str = "MPM_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the process-manager backend.
    pub backend_url: String,
    pub poll_interval_secs: u64,
    /// Resource samples kept for the dashboard sparklines.
    pub history_capacity: usize,
    pub request_timeout_secs: u64,
    /// Drop selected ids once their sessions end.
    pub prune_selection: bool,
    pub username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval_secs: 5,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            request_timeout_secs: 10,
            prune_selection: true,
            username: None,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub username: Option<String>,
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mpm").join("config.toml"))
}

impl Config {
    /// Loads the file at `path`, or the default location when `None`.
    ///
    /// A missing file at the default location yields the defaults; a
    /// missing file that was named explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(TuiError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config = Self::from_toml(&content)
            .map_err(|e| TuiError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TuiError::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides and re-validates.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(url) = overrides.backend_url {
            self.backend_url = url;
        }
        if let Some(secs) = overrides.poll_interval_secs {
            self.poll_interval_secs = secs;
        }
        if overrides.username.is_some() {
            self.username = overrides.username;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(TuiError::Config(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(TuiError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(TuiError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        let url = self.backend_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(TuiError::Config(format!(
                "backend_url must start with http:// or https:// (got {url:?})"
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Backend URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.backend_url.trim().trim_end_matches('/')
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll_interval: self.poll_interval(),
            history_capacity: self.history_capacity,
            prune_selection: self.prune_selection,
        }
    }
}

/// How the client authenticates against the backend.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    Token(String),
    Login { username: String, password: String },
}

impl Credentials {
    /// Resolves credentials from the environment.
    pub fn from_env(username: Option<&str>) -> Self {
        Self::resolve(username, |key| std::env::var(key).ok())
    }

    /// Resolves credentials with a custom variable lookup.
    ///
    /// A token wins over a login; a login needs both a username and a password.
    pub fn resolve<F>(username: Option<&str>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.is_empty()) {
            return Self::Token(token);
        }
        match (username, lookup(PASSWORD_ENV)) {
            (Some(user), Some(password)) if !user.is_empty() => Self::Login {
                username: user.to_string(),
                password,
            },
            _ => Self::None,
        }
    }
}

// Keeps secrets out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Token(_) => write!(f, "Token(..)"),
            Self::Login { username, .. } => write!(f, "Login {{ username: {username:?} }}"),
        }
    }
}
