//! Device selection
//!
//! Every filter borrows the source inventory and returns a new one holding
//! the matching devices and a copy of all groups. The source is never
//! modified.

use std::collections::BTreeMap;

use regex_lite::Regex;
use tracing::debug;

use crate::model::{Device, Inventory, Metadata};

/// Error type accepted from custom predicates
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Filter errors
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The metadata filter asked for something only a transport can answer
    #[error("Unsupported filter criterion: {0}")]
    UnsupportedCriterion(String),

    /// A custom predicate failed; no partial result is produced
    #[error("Filter predicate failed on device '{device}': {source}")]
    Predicate {
        device: String,
        #[source]
        source: BoxError,
    },

    /// Name pattern is not a valid regular expression
    #[error("Invalid device name pattern: {0}")]
    PatternSyntax(#[from] regex_lite::Error),
}

/// Matches devices whose name matches a regular expression
#[derive(Debug, Clone)]
pub struct NameFilter {
    pattern: Regex,
}

impl NameFilter {
    pub fn new(pattern: &str) -> Result<Self, FilterError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn matches(&self, device: &Device) -> bool {
        self.pattern.is_match(&device.name)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Matches on effective platform and a subset of labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    /// Required platform; empty matches any platform
    pub platform: String,

    /// Labels the device must carry with equal values (it may carry more)
    pub labels: BTreeMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from metadata criteria.
    ///
    /// Only `platform` and `labels` are supported. A connection criterion
    /// with any field set is rejected; `groups` is ignored.
    pub fn from_metadata(criteria: &Metadata) -> Result<Self, FilterError> {
        if criteria
            .connection
            .as_ref()
            .is_some_and(|connection| !connection.is_unset())
        {
            return Err(FilterError::UnsupportedCriterion(
                "metadata.connection".to_string(),
            ));
        }

        Ok(Self {
            platform: criteria.platform.clone(),
            labels: criteria.labels.clone(),
        })
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, device: &Device) -> bool {
        if !self.platform.is_empty() && self.platform != device.metadata.platform {
            return false;
        }
        self.labels
            .iter()
            .all(|(key, value)| device.label(key) == Some(value.as_str()))
    }
}

impl Inventory {
    /// Keep the devices for which `predicate` returns `Ok(true)`.
    ///
    /// The first predicate error aborts the filter and is returned on its own.
    pub fn filter<F, E>(&self, mut predicate: F) -> Result<Inventory, FilterError>
    where
        F: FnMut(&Device) -> Result<bool, E>,
        E: Into<BoxError>,
    {
        let mut devices = BTreeMap::new();
        for (key, device) in &self.devices {
            match predicate(device) {
                Ok(true) => {
                    devices.insert(key.clone(), device.clone());
                }
                Ok(false) => {}
                Err(err) => {
                    return Err(FilterError::Predicate {
                        device: key.clone(),
                        source: err.into(),
                    });
                }
            }
        }

        debug!(matched = devices.len(), total = self.devices.len(), "inventory filtered");

        Ok(Inventory {
            devices,
            groups: self.groups.clone(),
        })
    }

    /// Infallible variant of [`Inventory::filter`]
    pub fn select<F>(&self, mut predicate: F) -> Inventory
    where
        F: FnMut(&Device) -> bool,
    {
        let devices: BTreeMap<String, Device> = self
            .devices
            .iter()
            .filter(|(_, device)| predicate(*device))
            .map(|(key, device)| (key.clone(), device.clone()))
            .collect();

        debug!(matched = devices.len(), total = self.devices.len(), "inventory selected");

        Inventory {
            devices,
            groups: self.groups.clone(),
        }
    }

    /// Keep devices whose name matches `pattern`
    pub fn filter_name(&self, pattern: &str) -> Result<Inventory, FilterError> {
        let filter = NameFilter::new(pattern)?;
        Ok(self.select(|device| filter.matches(device)))
    }

    /// Keep devices matching the platform and labels in `criteria`
    pub fn filter_metadata(&self, criteria: &Metadata) -> Result<Inventory, FilterError> {
        let filter = MetadataFilter::from_metadata(criteria)?;
        Ok(self.select(|device| filter.matches(device)))
    }
}
