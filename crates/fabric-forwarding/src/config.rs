//! Configuration file support.
//!
//! Loads and validates the application configuration from a TOML file.
//! Default location: /etc/fabric/forwarding.toml

use crate::error::{FabricError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fabric/forwarding.toml";

/// Flow programming parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingConfig {
    /// Idle timeout of route flow rules in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u16,

    /// Hard timeout of route flow rules in seconds (0 = never)
    #[serde(default = "default_hard_timeout")]
    pub hard_timeout: u16,

    /// Idle timeout of drop rules in seconds
    #[serde(default = "default_drop_idle_timeout")]
    pub drop_idle_timeout: u16,

    /// Application id stamped into the cookie of every rule
    #[serde(default = "default_app_id")]
    pub app_id: u16,

    /// Priority of installed rules
    #[serde(default = "default_priority")]
    pub priority: u16,
}

/// Statistics correlation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// How long a query waits for the matching reply, in milliseconds
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    /// Re-query port counters of switches reported as updated
    #[serde(default = "default_query_on_switch_update")]
    pub query_on_switch_update: bool,
}

/// Flood behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodConfig {
    /// Use the static fat-tree fan-out table before falling back to all ports
    #[serde(default = "default_use_fan_out_table")]
    pub use_fan_out_table: bool,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricConfig {
    #[serde(default)]
    pub forwarding: ForwardingConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub flood: FloodConfig,
}

fn default_idle_timeout() -> u16 {
    5
}

fn default_hard_timeout() -> u16 {
    0
}

fn default_drop_idle_timeout() -> u16 {
    5
}

fn default_app_id() -> u16 {
    crate::flow::FORWARDING_APP_ID
}

fn default_priority() -> u16 {
    crate::flow::DEFAULT_PRIORITY
}

fn default_reply_timeout_ms() -> u64 {
    10_000
}

fn default_query_on_switch_update() -> bool {
    true
}

fn default_use_fan_out_table() -> bool {
    true
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            idle_timeout: default_idle_timeout(),
            hard_timeout: default_hard_timeout(),
            drop_idle_timeout: default_drop_idle_timeout(),
            app_id: default_app_id(),
            priority: default_priority(),
        }
    }
}

impl ForwardingConfig {
    /// Applies the `idletimeout` / `hardtimeout` module options.
    ///
    /// A value that does not parse as a 16-bit number is logged and the
    /// current setting is kept.
    pub fn apply_module_options<'a, I>(&mut self, options: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in options {
            let slot = match key {
                "idletimeout" => &mut self.idle_timeout,
                "hardtimeout" => &mut self.hard_timeout,
                _ => continue,
            };
            match value.trim().parse::<u16>() {
                Ok(parsed) => *slot = parsed,
                Err(_) => warn!(
                    option = key,
                    value,
                    current = *slot,
                    "Error parsing flow timeout, using default"
                ),
            }
        }
        info!(
            idle_timeout = self.idle_timeout,
            hard_timeout = self.hard_timeout,
            "flow-mod timeouts configured"
        );
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: default_reply_timeout_ms(),
            query_on_switch_update: default_query_on_switch_update(),
        }
    }
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            use_fan_out_table: default_use_fan_out_table(),
        }
    }
}

impl FabricConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                FabricError::Config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(FabricError::Io(e)),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FabricError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reply deadline of a statistics query
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.stats.reply_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.stats.reply_timeout_ms == 0 {
            return Err(FabricError::Config(
                "reply_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.forwarding.app_id > crate::flow::AppCookie::MAX_APP_ID {
            return Err(FabricError::Config(format!(
                "app_id must fit in 12 bits (max {})",
                crate::flow::AppCookie::MAX_APP_ID
            )));
        }

        if self.forwarding.hard_timeout != 0
            && self.forwarding.idle_timeout != 0
            && self.forwarding.hard_timeout < self.forwarding.idle_timeout
        {
            return Err(FabricError::Config(
                "hard_timeout must not be shorter than idle_timeout".to_string(),
            ));
        }

        Ok(())
    }
}
