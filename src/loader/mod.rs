//! Inventory loading
//!
//! Decodes a YAML or TOML inventory file, checks device and group names
//! against their map keys, layers connection defaults and resolves the
//! inventory.
//!
//! ```yaml
//! defaults:
//!   timeout: 30s
//! groups:
//!   eos:
//!     metadata:
//!       platform: arista_eos
//!       connection: { username: netops }
//! devices:
//!   edgeRouter1:
//!     spec: { asn: 65001 }
//!     metadata:
//!       labels: { dc: slc1 }
//!       groups: [eos]
//!       connection: { hostname: 10.0.0.1 }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pneuma_inventory::{Device, Group, Inventory, MergeError, ResolveDefaults};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::{layer_defaults, ConfigError, DefaultsOverride};

/// Serialized inventory format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Yaml,
    Toml,
}

impl Format {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => Ok(Format::Yaml),
            Some("toml") => Ok(Format::Toml),
            _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Yaml => write!(f, "yaml"),
            Format::Toml => write!(f, "toml"),
        }
    }
}

/// Errors that can occur when loading an inventory
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Inventory file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read inventory file: {0}")]
    Io(#[from] io::Error),

    #[error("Unsupported inventory format: {} (expected .yml, .yaml or .toml)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{kind} '{key}' declares a different name '{name}'")]
    NameMismatch {
        kind: &'static str,
        key: String,
        name: String,
    },

    #[error("Invalid defaults: {0}")]
    Defaults(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] MergeError),
}

/// Anything that can produce a resolved inventory
pub trait InventorySource {
    fn load(&self) -> Result<Inventory, LoadError>;
}

/// On-disk layout of an inventory file
#[derive(Debug, Default, Deserialize)]
struct RawInventory {
    #[serde(default)]
    defaults: DefaultsOverride,

    #[serde(default)]
    devices: BTreeMap<String, Device>,

    #[serde(default)]
    groups: BTreeMap<String, Group>,
}

/// Decoded, unresolved inventory plus the file's defaults layer
#[derive(Debug, Clone)]
pub struct DecodedInventory {
    pub inventory: Inventory,
    pub defaults: DefaultsOverride,
}

/// Decode inventory text without resolving it
pub fn decode(content: &str, format: Format) -> Result<DecodedInventory, LoadError> {
    let raw: RawInventory = match format {
        Format::Yaml => serde_yaml::from_str(content)?,
        Format::Toml => toml::from_str(content)?,
    };
    raw.defaults.validate()?;

    let mut inventory = Inventory::new();
    for (key, mut device) in raw.devices {
        device.name = checked_name("Device", &key, device.name)?;
        inventory.devices.insert(key, device);
    }
    for (key, mut group) in raw.groups {
        group.name = checked_name("Group", &key, group.name)?;
        inventory.groups.insert(key, group);
    }

    Ok(DecodedInventory {
        inventory,
        defaults: raw.defaults,
    })
}

/// Decode and resolve inventory text using the built-in and file defaults
pub fn parse_str(content: &str, format: Format) -> Result<Inventory, LoadError> {
    let decoded = decode(content, format)?;
    let defaults = layer_defaults(&[decoded.defaults]);
    Ok(decoded.inventory.resolve_with(&defaults)?)
}

/// Empty names take their map key; a differing name is an error
fn checked_name(kind: &'static str, key: &str, name: String) -> Result<String, LoadError> {
    if name.is_empty() || name == key {
        Ok(key.to_string())
    } else {
        Err(LoadError::NameMismatch {
            kind,
            key: key.to_string(),
            name,
        })
    }
}

/// Where a loaded inventory came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub path: String,
    pub format: Format,
    /// SHA-256 of the raw file bytes
    pub digest: String,
    pub loaded_at: DateTime<Utc>,
}

/// Resolved inventory with its provenance and the defaults used
#[derive(Debug, Clone)]
pub struct LoadedInventory {
    pub inventory: Inventory,
    pub defaults: ResolveDefaults,
    pub source: SourceInfo,
}

/// Inventory stored in a YAML or TOML file
#[derive(Debug, Clone)]
pub struct FileInventory {
    path: PathBuf,
    overrides: DefaultsOverride,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overrides: DefaultsOverride::default(),
        }
    }

    /// Defaults that win over the file's `defaults` table
    pub fn with_overrides(mut self, overrides: DefaultsOverride) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and resolve, keeping the source digest and effective defaults
    pub fn load_with_provenance(&self) -> Result<LoadedInventory, LoadError> {
        if !self.path.exists() {
            return Err(LoadError::NotFound(self.path.clone()));
        }
        let format = Format::from_path(&self.path)?;
        self.overrides.validate()?;

        let bytes = fs::read(&self.path)?;
        let digest = hex::encode(Sha256::digest(&bytes));
        let content = String::from_utf8(bytes)
            .map_err(|e| LoadError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let decoded = decode(&content, format)?;
        let defaults = layer_defaults(&[decoded.defaults, self.overrides]);
        debug!(
            path = %self.path.display(),
            port = defaults.port,
            timeout = ?defaults.timeout,
            "resolving inventory"
        );
        let inventory = decoded.inventory.resolve_with(&defaults)?;

        info!(
            path = %self.path.display(),
            devices = inventory.len(),
            groups = inventory.groups.len(),
            "inventory loaded"
        );

        Ok(LoadedInventory {
            inventory,
            defaults,
            source: SourceInfo {
                path: self.path.to_string_lossy().to_string(),
                format,
                digest,
                loaded_at: Utc::now(),
            },
        })
    }
}

impl InventorySource for FileInventory {
    fn load(&self) -> Result<Inventory, LoadError> {
        Ok(self.load_with_provenance()?.inventory)
    }
}
