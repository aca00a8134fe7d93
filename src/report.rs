//! Device output for the CLI
//!
//! Renders effective devices as JSON or YAML with secret-looking values
//! replaced by `[REDACTED]`.

use pneuma_inventory::{format_timeout, Device};
use serde::Serialize;
use serde_json::Value;

use crate::platform::lldp_neighbors_command;

/// Keys whose scalar values are redacted
const SECRET_KEYS: &[&str] = &[
    "password",
    "secret",
    "token",
    "private_key",
    "api_key",
    "community",
];

pub const REDACTED: &str = "[REDACTED]";

/// Output encoding for `show`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Report errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// One line of `list` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    pub platform: String,
    pub address: String,
    pub username: String,
    pub timeout: String,
    pub groups: Vec<String>,
}

impl DeviceSummary {
    pub fn from_device(device: &Device) -> Self {
        let connection = device.connection();
        let host = if connection.hostname.is_empty() {
            "(no hostname)"
        } else {
            connection.hostname.as_str()
        };
        Self {
            name: device.name.clone(),
            platform: device.metadata.platform.clone(),
            address: format!("{}:{}", host, connection.port),
            username: connection.username.clone(),
            timeout: format_timeout(connection.timeout),
            groups: device.metadata.groups.clone(),
        }
    }
}

/// Effective device as a JSON value, with the platform's LLDP command added
pub fn device_value(device: &Device, show_secrets: bool) -> Result<(Value, Vec<String>), ReportError> {
    let mut value = serde_json::to_value(device)?;
    if let (Value::Object(map), Some(cmd)) =
        (&mut value, lldp_neighbors_command(device.platform()))
    {
        map.insert(
            "commands".to_string(),
            serde_json::json!({ "lldp_neighbors": cmd }),
        );
    }

    let redactions = if show_secrets {
        Vec::new()
    } else {
        redact_secrets(&mut value)
    };
    Ok((value, redactions))
}

/// Render a device in the requested format
pub fn render_device(
    device: &Device,
    format: OutputFormat,
    show_secrets: bool,
) -> Result<String, ReportError> {
    let (value, _) = device_value(device, show_secrets)?;
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&value)?),
    }
}

/// Redact secrets in place, returning the redacted key paths
pub fn redact_secrets(value: &mut Value) -> Vec<String> {
    let mut redactions = Vec::new();
    redact_recursive(value, String::new(), &mut redactions);
    redactions
}

fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let current_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                if is_secret && !val.is_object() && !val.is_array() {
                    *val = Value::String(REDACTED.to_string());
                    redactions.push(current_path);
                } else {
                    redact_recursive(val, current_path, redactions);
                }
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter_mut().enumerate() {
                redact_recursive(val, format!("{}[{}]", path, i), redactions);
            }
        }
        _ => {}
    }
}
