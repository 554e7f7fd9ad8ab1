//! Configuration management for the bridge.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub channel: ChannelConfig,

    #[serde(default)]
    pub clipboard: ClipboardConfig,

    #[serde(default)]
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay between the end of one poll cycle and the start of the next
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// How long shutdown waits for an in-flight cycle before cancelling it
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}

/// Which shared medium to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Clipboard on Windows and macOS, directory queue elsewhere
    #[default]
    Auto,
    Clipboard,
    Directory,
}

impl ChannelKind {
    /// Resolve `Auto` for the current platform
    pub fn resolve(self) -> ChannelKind {
        match self {
            ChannelKind::Auto if cfg!(any(target_os = "windows", target_os = "macos")) => {
                ChannelKind::Clipboard
            }
            ChannelKind::Auto => ChannelKind::Directory,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Auto => "auto",
            ChannelKind::Clipboard => "clipboard",
            ChannelKind::Directory => "directory",
        }
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ChannelKind::Auto),
            "clipboard" => Ok(ChannelKind::Clipboard),
            "directory" | "dir" => Ok(ChannelKind::Directory),
            other => Err(format!("unknown channel kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub kind: ChannelKind,

    /// Workspace for the directory queue (defaults to ~/dmdcgpt-workspace)
    #[serde(default)]
    pub workspace_dir: Option<PathBuf>,
}

impl ChannelConfig {
    pub fn workspace_dir(&self) -> PathBuf {
        self.workspace_dir.clone().unwrap_or_else(default_workspace_dir)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// Command printing the clipboard text to stdout, e.g. `["xclip", "-o"]`
    #[serde(default)]
    pub read_command: Option<Vec<String>>,

    /// Command reading new clipboard text from stdin
    #[serde(default)]
    pub write_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Untyped payloads longer than this that look like base64 are treated
    /// as document conversion requests
    #[serde(default = "default_legacy_min_length")]
    pub legacy_min_length: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            legacy_min_length: default_legacy_min_length(),
        }
    }
}

// Default value functions for serde
fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_shutdown_grace() -> u64 {
    3000
}

fn default_legacy_min_length() -> usize {
    1000
}

fn default_workspace_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dmdcgpt-workspace")
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clipboard-bridge")
            .join("config.toml")
    }

    /// Save configuration to the default path
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to_path(Self::default_config_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
