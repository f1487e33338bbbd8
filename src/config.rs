//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_SERVER_URL: &str = "OC_TMUX_SERVER_URL";
const ENV_SOURCE: &str = "OC_TMUX_SOURCE";
const ENV_DIRECTORY: &str = "OC_TMUX_DIRECTORY";
const ENV_TMUX_BIN: &str = "OC_TMUX_BIN";

/// Where host events are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Server-sent events from the OpenCode server
    #[default]
    Server,
    /// Newline-delimited JSON events on stdin
    Stdin,
}

impl std::str::FromStr for EventSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "stdin" => Ok(Self::Stdin),
            other => anyhow::bail!("unknown event source '{}', expected server or stdin", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the OpenCode server
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub source: EventSource,
    /// Working directory shown when no session is active; empty means cwd
    #[serde(default)]
    pub directory: String,
    /// Path to tmux binary
    #[serde(default = "default_tmux_path")]
    pub tmux_path: String,
}

fn default_server_url() -> String {
    "http://127.0.0.1:4096".to_string()
}

fn default_tmux_path() -> String {
    "tmux".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            source: EventSource::default(),
            directory: String::new(),
            tmux_path: default_tmux_path(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("oc-tmux-title").join("config.toml"))
    }

    /// Load the config file if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;

        if config.directory.is_empty() {
            config.directory = std::env::current_dir()
                .context("Failed to read current directory")?
                .to_string_lossy()
                .into_owned();
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(source) = var(ENV_SOURCE) {
            self.source = source.parse()?;
        }
        if let Some(directory) = var(ENV_DIRECTORY) {
            self.directory = directory;
        }
        if let Some(tmux_path) = var(ENV_TMUX_BIN) {
            self.tmux_path = tmux_path;
        }
        Ok(())
    }
}
