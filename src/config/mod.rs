//! # Configuration Management Module
//!
//! Loads, validates and writes the server's TOML configuration.
//!
//! ## Configuration Structure
//!
//! - [`BbsConfig`] - Board identity and connection limits
//! - [`TelnetConfig`] - Listener address and telnet option handling
//! - [`TerminalConfig`] - Negotiation deadlines, fallback size and entry menu
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ansibbs::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Listening on {}", config.telnet.bind);
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bbs]
//! name = "My ANSI BBS"
//! sysop = "sysop"
//! max_connections = 32
//!
//! [telnet]
//! bind = "0.0.0.0:8888"
//! enabled = true
//!
//! [terminal]
//! home_position_timeout_ms = 3000
//! screen_size_timeout_ms = 2000
//! menu_handoff_delay_ms = 500
//! fallback_width = 80
//! fallback_height = 25
//! entry_menu = "matrix"
//!
//! [logging]
//! level = "info"
//! file = "ansibbs.log"
//! ```
//!
//! Every section except `[bbs]` may be omitted and falls back to defaults.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::bbs::negotiate::MIN_DIMENSION;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BbsConfig {
    pub name: String,
    pub sysop: String,
    /// Concurrent connections accepted before new callers get a busy notice
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelnetConfig {
    pub bind: String,
    /// When false the socket is treated as raw TCP: no IAC handling, no NAWS.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TelnetConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8888".to_string(),
            enabled: true,
        }
    }
}

/// Connection bootstrap tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Deadline for the home position report
    pub home_position_timeout_ms: u64,
    /// Deadline for the screen size report
    pub screen_size_timeout_ms: u64,
    /// Pause between the banner and the menu handoff so banner bytes flush
    pub menu_handoff_delay_ms: u64,
    pub fallback_width: u16,
    pub fallback_height: u16,
    /// Menu the stack is sent to once the terminal is characterized
    pub entry_menu: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            home_position_timeout_ms: 3000,
            screen_size_timeout_ms: 2000,
            menu_handoff_delay_ms: 500,
            fallback_width: 80,
            fallback_height: 25,
            entry_menu: "matrix".to_string(),
        }
    }
}

impl TerminalConfig {
    pub fn home_position_timeout(&self) -> Duration {
        Duration::from_millis(self.home_position_timeout_ms)
    }
    pub fn screen_size_timeout(&self) -> Duration {
        Duration::from_millis(self.screen_size_timeout_ms)
    }
    pub fn menu_handoff_delay(&self) -> Duration {
        Duration::from_millis(self.menu_handoff_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bbs: BbsConfig,
    #[serde(default)]
    pub telnet: TelnetConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject settings that would make the bootstrap misbehave.
    pub fn validate(&self) -> Result<()> {
        let t = &self.terminal;
        if t.home_position_timeout_ms == 0 || t.screen_size_timeout_ms == 0 {
            bail!("terminal negotiation timeouts must be greater than zero");
        }
        if t.fallback_width < MIN_DIMENSION || t.fallback_height < MIN_DIMENSION {
            bail!(
                "fallback size {}x{} is below the {}x{} minimum",
                t.fallback_width,
                t.fallback_height,
                MIN_DIMENSION,
                MIN_DIMENSION
            );
        }
        if t.entry_menu.trim().is_empty() {
            bail!("terminal.entry_menu must not be empty");
        }
        if self.bbs.max_connections == 0 {
            bail!("bbs.max_connections must be at least 1");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bbs: BbsConfig {
                name: "ansibbs Station".to_string(),
                sysop: "sysop".to_string(),
                max_connections: default_max_connections(),
            },
            telnet: TelnetConfig::default(),
            terminal: TerminalConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("ansibbs.log".to_string()),
            },
        }
    }
}
