//! Steering configuration loaded from TOML.
//!
//! ```toml
//! target_ja3 = "070ed1ebe4979528bf846db0c1382e79"
//!
//! [[fallbacks]]
//! host = "127.0.0.1"
//! port = 4444
//! ```
//!
//! The last `[[fallbacks]]` entry is the first one tried.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::fingerprint::types::Ja3Hash;
use crate::routing::Address;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowmuxConfig {
    /// JA3 hash whose clients get redirected. `None` disables redirection.
    pub target_ja3: Option<Ja3Hash>,
    /// Ordered fallback backends.
    pub fallbacks: Vec<Address>,
}

/// On-disk shape; the hash stays a string until validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    target_ja3: Option<String>,
    fallbacks: Vec<Address>,
}

impl FlowmuxConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(s)?;
        let target_ja3 = raw
            .target_ja3
            .map(|h| h.parse::<Ja3Hash>())
            .transpose()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let config = Self {
            target_ja3,
            fallbacks: raw.fallbacks,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for addr in &self.fallbacks {
            if addr.host.trim().is_empty() {
                return Err(ConfigError::Invalid("fallback host is empty".to_string()));
            }
            if addr.port == 0 {
                return Err(ConfigError::Invalid(format!(
                    "fallback {} has port 0",
                    addr.host
                )));
            }
        }
        Ok(())
    }
}
