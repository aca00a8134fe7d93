//! Connection default layering
//!
//! Defaults are merged in three layers, later layers winning per field:
//! 1. Built-in defaults (port 22, 10s timeout)
//! 2. The `defaults` table of the inventory file
//! 3. CLI flags

use std::time::Duration;

use pneuma_inventory::{parse_timeout, ResolveDefaults};
use serde::{de, Deserialize, Deserializer};

/// One layer of connection defaults; `None` leaves the lower layer in place
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DefaultsOverride {
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default, deserialize_with = "deserialize_timeout")]
    pub timeout: Option<Duration>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimeout {
    Seconds(u64),
    Text(String),
}

fn deserialize_timeout<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    match Option::<RawTimeout>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTimeout::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
        Some(RawTimeout::Text(text)) => parse_timeout(&text).map(Some).map_err(de::Error::custom),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DefaultsOverride {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// True when this layer overrides nothing
    pub fn is_empty(&self) -> bool {
        self.port.is_none() && self.timeout.is_none()
    }

    /// Overlay this layer onto `base`
    pub fn apply(&self, base: ResolveDefaults) -> ResolveDefaults {
        ResolveDefaults {
            port: self.port.unwrap_or(base.port),
            timeout: self.timeout.unwrap_or(base.timeout),
        }
    }

    /// Reject zero port or timeout (zero means unset)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == Some(0) {
            return Err(ConfigError::ValidationError(
                "default port cannot be 0".to_string(),
            ));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ValidationError(
                "default timeout cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Merge layers in order (first is lowest precedence) over the built-ins
pub fn layer_defaults(layers: &[DefaultsOverride]) -> ResolveDefaults {
    layers
        .iter()
        .fold(ResolveDefaults::default(), |acc, layer| layer.apply(acc))
}
