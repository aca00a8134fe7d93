//! Inventory entity model
//!
//! Devices, groups and their metadata exactly as a loader decodes them.
//! Devices refer to groups by name only; the names are looked up in
//! [`Inventory::groups`] when the inventory is resolved.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nested attribute tree attached to devices and groups
pub type Spec = Map<String, Value>;

/// Connection parameters for a device (or connection defaults for a group).
///
/// Every field uses its zero value (`0`, `""`, `Duration::ZERO`) for "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Hostname, FQDN or IP address. Never inherited from a group.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    /// Port to connect to
    #[serde(default, skip_serializing_if = "is_unset_port")]
    pub port: u16,

    /// Username for authentication
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    /// Password for authentication
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Timeout for session setup and each command
    #[serde(
        default,
        with = "duration_serde",
        skip_serializing_if = "Duration::is_zero"
    )]
    pub timeout: Duration,
}

fn is_unset_port(port: &u16) -> bool {
    *port == 0
}

impl Connection {
    /// True when no field is set
    pub fn is_unset(&self) -> bool {
        self == &Connection::default()
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Filtering and connection attributes of a device or group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Free-form labels used for selection
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Vendor/OS family, e.g. `arista_eos` (empty = unset)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform: String,

    /// Group names in precedence order (earlier groups win)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Connection parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
}

impl Metadata {
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Append a group reference after the existing ones
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }
}

/// A network element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Unique name within the inventory
    #[serde(default)]
    pub name: String,

    /// Declared attributes
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub spec: Spec,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_spec(mut self, spec: Spec) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn platform(&self) -> &str {
        &self.metadata.platform
    }

    /// Connection parameters, or an all-unset record when none were declared
    pub fn connection(&self) -> Connection {
        self.metadata.connection.clone().unwrap_or_default()
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }
}

/// A named bundle of defaults that devices opt into via `metadata.groups`.
///
/// A group's own `metadata.groups` and `connection.hostname` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub spec: Spec,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_spec(mut self, spec: Spec) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Devices and groups keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub devices: BTreeMap<String, Device>,

    #[serde(default)]
    pub groups: BTreeMap<String, Group>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a device under its own name, returning any device it replaced
    pub fn insert_device(&mut self, device: Device) -> Option<Device> {
        self.devices.insert(device.name.clone(), device)
    }

    /// Insert a group under its own name, returning any group it replaced
    pub fn insert_group(&mut self, group: Group) -> Option<Group> {
        self.groups.insert(group.name.clone(), group)
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.insert_device(device);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.insert_group(group);
        self
    }

    /// Get a device by name
    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    /// Get a group by name
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Device names in sorted order
    pub fn device_names(&self) -> Vec<&str> {
        self.devices.keys().map(String::as_str).collect()
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True when there are no devices
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Timeout string that is neither plain seconds nor `<n>ms|s|m|h`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid timeout '{0}': expected seconds or a number with an ms, s, m or h suffix")]
pub struct InvalidTimeout(pub String);

/// Parse `"10"`, `"10s"`, `"500ms"`, `"2m"` or `"1h"` into a duration
pub fn parse_timeout(text: &str) -> Result<Duration, InvalidTimeout> {
    let text = text.trim();
    let invalid = || InvalidTimeout(text.to_string());

    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: u64 = digits.parse().map_err(|_| invalid())?;

    match unit.trim() {
        "" | "s" => Ok(Duration::from_secs(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(invalid),
        "h" => value
            .checked_mul(3600)
            .map(Duration::from_secs)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Render a duration the way [`parse_timeout`] reads it back
pub fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_nanos() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{}ms", timeout.as_millis())
    }
}

/// Serde adapter: integer seconds or a suffixed string in, suffixed string out
pub(crate) mod duration_serde {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimeout {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timeout(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match RawTimeout::deserialize(deserializer)? {
            RawTimeout::Seconds(secs) => Ok(Duration::from_secs(secs)),
            RawTimeout::Text(text) => super::parse_timeout(&text).map_err(de::Error::custom),
        }
    }
}
