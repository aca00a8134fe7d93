//! Group folding
//!
//! Computes each device's effective configuration by folding its groups in
//! declared order underneath the device's own values:
//! - Spec: deep-merge by key, device wins, then the earliest group wins
//! - Labels: device wins, then the earliest group wins
//! - Platform and connection fields: fill unset values from the earliest
//!   group that sets them (hostname excepted)
//! - Port and timeout: inventory-wide defaults for whatever is still unset

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, trace};

use crate::defaults::ResolveDefaults;
use crate::model::{Connection, Device, Group, Inventory, Spec};

/// Resolve errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// A device lists a group that the inventory does not define
    #[error("Device '{device}' references unknown group '{group}'")]
    UnresolvedGroupReference { device: String, group: String },
}

/// Deep merge two JSON values.
///
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (overlay wins entirely)
/// - Scalars and null: overlay wins
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(merge_specs(base_map, overlay_map))
        }
        (_, overlay) => overlay,
    }
}

/// Deep merge two specs; keys present in both are merged with [`deep_merge`]
pub fn merge_specs(mut base: Spec, overlay: Spec) -> Spec {
    for (key, overlay_value) in overlay {
        let merged = if let Some(base_value) = base.remove(&key) {
            deep_merge(base_value, overlay_value)
        } else {
            overlay_value
        };
        base.insert(key, merged);
    }
    base
}

/// Flat label merge, overlay wins
pub fn merge_labels(
    base: &BTreeMap<String, String>,
    overlay: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    merged.extend(overlay);
    merged
}

/// Fill the device's unset connection fields from a group
fn inherit_connection(connection: &mut Connection, group: &Connection) {
    if connection.port == 0 {
        connection.port = group.port;
    }
    if connection.timeout.is_zero() {
        connection.timeout = group.timeout;
    }
    if connection.username.is_empty() {
        connection.username = group.username.clone();
    }
    if connection.password.is_empty() {
        connection.password = group.password.clone();
    }
}

/// Fold groups (in precedence order) underneath a device
pub fn fold_groups(mut device: Device, groups: &[&Group]) -> Device {
    for group in groups {
        trace!(device = %device.name, group = %group.name, "applying group");

        device.spec = merge_specs(group.spec.clone(), std::mem::take(&mut device.spec));
        device.metadata.labels = merge_labels(
            &group.metadata.labels,
            std::mem::take(&mut device.metadata.labels),
        );

        if device.metadata.platform.is_empty() {
            device.metadata.platform = group.metadata.platform.clone();
        }

        if let Some(group_connection) = &group.metadata.connection {
            let connection = device
                .metadata
                .connection
                .get_or_insert_with(Connection::default);
            inherit_connection(connection, group_connection);
        }
    }
    device
}

/// Set port and timeout on a device that still lacks them
pub fn apply_defaults(device: &mut Device, defaults: &ResolveDefaults) {
    let connection = device
        .metadata
        .connection
        .get_or_insert_with(Connection::default);
    if connection.port == 0 {
        connection.port = defaults.port;
    }
    if connection.timeout.is_zero() {
        connection.timeout = defaults.timeout;
    }
}

/// Resolve every device in the inventory.
///
/// Group references are checked for the whole inventory before any defaults
/// are applied; the first unknown group fails the resolve and nothing is
/// returned.
pub fn resolve(inventory: Inventory, defaults: &ResolveDefaults) -> Result<Inventory, MergeError> {
    let Inventory { devices, groups } = inventory;

    let mut resolved = BTreeMap::new();
    for (key, device) in devices {
        let member_of = device
            .metadata
            .groups
            .iter()
            .map(|name| {
                groups
                    .get(name)
                    .ok_or_else(|| MergeError::UnresolvedGroupReference {
                        device: key.clone(),
                        group: name.clone(),
                    })
            })
            .collect::<Result<Vec<&Group>, MergeError>>()?;

        debug!(device = %key, groups = ?device.metadata.groups, "folding groups");
        resolved.insert(key, fold_groups(device, &member_of));
    }

    for device in resolved.values_mut() {
        apply_defaults(device, defaults);
    }

    debug!(
        devices = resolved.len(),
        groups = groups.len(),
        "inventory resolved"
    );

    Ok(Inventory {
        devices: resolved,
        groups,
    })
}

impl Inventory {
    /// Resolve with the built-in defaults (port 22, 10s timeout)
    pub fn resolve(self) -> Result<Inventory, MergeError> {
        resolve(self, &ResolveDefaults::default())
    }

    /// Resolve with caller-supplied defaults
    pub fn resolve_with(self, defaults: &ResolveDefaults) -> Result<Inventory, MergeError> {
        resolve(self, defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;
    use serde_json::json;
    use std::time::Duration;

    fn spec(value: Value) -> Spec {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn member(name: &str, groups: &[&str]) -> Device {
        let metadata = groups
            .iter()
            .fold(Metadata::default(), |m, g| m.with_group(*g));
        Device::new(name).with_metadata(metadata)
    }

    #[test]
    fn test_scalar_override() {
        let result = deep_merge(json!({"mtu": 1500}), json!({"mtu": 9000}));
        assert_eq!(result["mtu"], 9000);
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({"a": {"p": 1}});
        let overlay = json!({"a": {"q": 2}});
        assert_eq!(deep_merge(base, overlay), json!({"a": {"p": 1, "q": 2}}));
    }

    #[test]
    fn test_array_replace() {
        let base = json!({"vlans": [10, 20, 30]});
        let overlay = json!({"vlans": [99]});
        assert_eq!(deep_merge(base, overlay)["vlans"], json!([99]));
    }

    #[test]
    fn test_object_replaced_by_scalar() {
        let base = json!({"ntp": {"server": "10.0.0.1"}});
        let overlay = json!({"ntp": "disabled"});
        assert_eq!(deep_merge(base, overlay)["ntp"], "disabled");
    }

    #[test]
    fn test_null_override() {
        let result = deep_merge(json!({"banner": "hello"}), json!({"banner": null}));
        assert!(result["banner"].is_null());
    }

    #[test]
    fn test_nested_deep_merge() {
        let base = json!({"l1": {"l2": {"a": 1, "b": 2}}});
        let overlay = json!({"l1": {"l2": {"b": 3, "c": 4}}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["l1"]["l2"]["a"], 1);
        assert_eq!(result["l1"]["l2"]["b"], 3);
        assert_eq!(result["l1"]["l2"]["c"], 4);
    }

    #[test]
    fn test_no_groups_only_defaults() {
        let device = Device::new("r1")
            .with_spec(spec(json!({"asn": 65001})))
            .with_metadata(
                Metadata::default()
                    .with_label("dc", "slc1")
                    .with_platform("arista_eos")
                    .with_connection(Connection::default().with_hostname("10.0.0.1")),
            );
        let inventory = Inventory::new().with_device(device.clone()).resolve().unwrap();
        let resolved = inventory.get("r1").unwrap();

        assert_eq!(resolved.spec, device.spec);
        assert_eq!(resolved.metadata.labels, device.metadata.labels);
        assert_eq!(resolved.platform(), "arista_eos");
        assert_eq!(
            resolved.connection(),
            Connection::default()
                .with_hostname("10.0.0.1")
                .with_port(22)
                .with_timeout(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_first_group_wins() {
        let inventory = Inventory::new()
            .with_group(Group::new("ga").with_spec(spec(json!({"x": "from-a"}))))
            .with_group(Group::new("gb").with_spec(spec(json!({"x": "from-b", "y": "only-b"}))))
            .with_device(member("r1", &["ga", "gb"]))
            .with_device(member("r2", &["gb", "ga"]))
            .resolve()
            .unwrap();

        assert_eq!(inventory.get("r1").unwrap().spec["x"], "from-a");
        assert_eq!(inventory.get("r1").unwrap().spec["y"], "only-b");
        assert_eq!(inventory.get("r2").unwrap().spec["x"], "from-b");
    }

    #[test]
    fn test_device_always_wins() {
        let inventory = Inventory::new()
            .with_group(Group::new("g").with_spec(spec(json!({"x": 2}))))
            .with_device(member("r1", &["g"]).with_spec(spec(json!({"x": 1}))))
            .resolve()
            .unwrap();

        assert_eq!(inventory.get("r1").unwrap().spec["x"], 1);
    }

    #[test]
    fn test_spec_folds_nested_maps_across_groups() {
        let inventory = Inventory::new()
            .with_group(Group::new("site").with_spec(spec(json!({
                "snmp": {"community": "site", "location": "slc1"}
            }))))
            .with_group(Group::new("global").with_spec(spec(json!({
                "snmp": {"community": "global", "contact": "noc@example.net"}
            }))))
            .with_device(
                member("r1", &["site", "global"])
                    .with_spec(spec(json!({"snmp": {"location": "rack 4"}}))),
            )
            .resolve()
            .unwrap();

        assert_eq!(
            inventory.get("r1").unwrap().spec["snmp"],
            json!({
                "community": "site",
                "location": "rack 4",
                "contact": "noc@example.net"
            })
        );
    }

    #[test]
    fn test_label_folding() {
        let inventory = Inventory::new()
            .with_group(Group::new("ga").with_metadata(
                Metadata::default().with_label("env", "prod").with_label("dc", "a"),
            ))
            .with_group(Group::new("gb").with_metadata(
                Metadata::default().with_label("env", "lab").with_label("tier", "edge"),
            ))
            .with_device(Device::new("r1").with_metadata(
                Metadata::default()
                    .with_group("ga")
                    .with_group("gb")
                    .with_label("dc", "slc1"),
            ))
            .resolve()
            .unwrap();

        let labels = &inventory.get("r1").unwrap().metadata.labels;
        assert_eq!(labels["dc"], "slc1");
        assert_eq!(labels["env"], "prod");
        assert_eq!(labels["tier"], "edge");
    }

    #[test]
    fn test_platform_from_first_group_that_sets_it() {
        let inventory = Inventory::new()
            .with_group(Group::new("site"))
            .with_group(Group::new("eos").with_metadata(Metadata::default().with_platform("arista_eos")))
            .with_group(Group::new("nxos").with_metadata(Metadata::default().with_platform("cisco_nxos")))
            .with_device(member("r1", &["site", "eos", "nxos"]))
            .with_device(Device::new("r2").with_metadata(
                Metadata::default().with_group("eos").with_platform("juniper_junos"),
            ))
            .resolve()
            .unwrap();

        assert_eq!(inventory.get("r1").unwrap().platform(), "arista_eos");
        assert_eq!(inventory.get("r2").unwrap().platform(), "juniper_junos");
    }

    #[test]
    fn test_connection_cascade_skips_unset_groups() {
        let inventory = Inventory::new()
            .with_group(Group::new("ga").with_metadata(
                Metadata::default().with_connection(Connection::default().with_port(0)),
            ))
            .with_group(Group::new("gb").with_metadata(
                Metadata::default().with_connection(Connection::default().with_port(2222)),
            ))
            .with_device(member("r1", &["ga", "gb"]))
            .resolve()
            .unwrap();

        assert_eq!(inventory.get("r1").unwrap().connection().port, 2222);
    }

    #[test]
    fn test_connection_fields_cascade_independently() {
        let inventory = Inventory::new()
            .with_group(Group::new("creds").with_metadata(Metadata::default().with_connection(
                Connection::default().with_username("netops").with_password("hunter2"),
            )))
            .with_group(Group::new("slow").with_metadata(Metadata::default().with_connection(
                Connection::default()
                    .with_username("ignored")
                    .with_timeout(Duration::from_secs(60))
                    .with_port(830)
                    .with_hostname("group-host"),
            )))
            .with_device(Device::new("r1").with_metadata(
                Metadata::default()
                    .with_group("creds")
                    .with_group("slow")
                    .with_connection(Connection::default().with_hostname("r1.example.net").with_port(22)),
            ))
            .resolve()
            .unwrap();

        let connection = inventory.get("r1").unwrap().connection();
        assert_eq!(connection.hostname, "r1.example.net");
        assert_eq!(connection.port, 22);
        assert_eq!(connection.username, "netops");
        assert_eq!(connection.password, "hunter2");
        assert_eq!(connection.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_hostname_never_inherited() {
        let inventory = Inventory::new()
            .with_group(Group::new("g").with_metadata(Metadata::default().with_connection(
                Connection::default().with_hostname("shared.example.net"),
            )))
            .with_device(member("r1", &["g"]))
            .resolve()
            .unwrap();

        assert!(inventory.get("r1").unwrap().connection().hostname.is_empty());
    }

    #[test]
    fn test_defaults_when_nothing_sets_port_or_timeout() {
        let defaults = ResolveDefaults::default()
            .with_port(830)
            .with_timeout(Duration::from_secs(3));
        let inventory = Inventory::new()
            .with_group(Group::new("g"))
            .with_device(member("r1", &["g"]))
            .with_device(Device::new("r2").with_metadata(Metadata::default().with_connection(
                Connection::default().with_port(2022).with_timeout(Duration::from_secs(1)),
            )))
            .resolve_with(&defaults)
            .unwrap();

        let r1 = inventory.get("r1").unwrap().connection();
        assert_eq!(r1.port, 830);
        assert_eq!(r1.timeout, Duration::from_secs(3));

        let r2 = inventory.get("r2").unwrap().connection();
        assert_eq!(r2.port, 2022);
        assert_eq!(r2.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_unresolved_group_fails_whole_inventory() {
        let result = Inventory::new()
            .with_group(Group::new("known"))
            .with_device(member("ok", &["known"]))
            .with_device(member("r1", &["known", "missing"]))
            .resolve();

        assert_eq!(
            result,
            Err(MergeError::UnresolvedGroupReference {
                device: "r1".to_string(),
                group: "missing".to_string(),
            })
        );
    }

    #[test]
    fn test_group_groups_are_not_followed() {
        let inventory = Inventory::new()
            .with_group(Group::new("parent").with_spec(spec(json!({"from_parent": true}))))
            .with_group(
                Group::new("child")
                    .with_spec(spec(json!({"from_child": true})))
                    .with_metadata(Metadata::default().with_group("parent")),
            )
            .with_device(member("r1", &["child"]))
            .resolve()
            .unwrap();

        let spec = &inventory.get("r1").unwrap().spec;
        assert_eq!(spec["from_child"], true);
        assert!(!spec.contains_key("from_parent"));
    }

    #[test]
    fn test_groups_untouched_by_resolve() {
        let group = Group::new("g").with_spec(spec(json!({"x": 1})));
        let inventory = Inventory::new()
            .with_group(group.clone())
            .with_device(member("r1", &["g"]))
            .resolve()
            .unwrap();

        assert_eq!(inventory.group("g"), Some(&group));
        assert_eq!(inventory.get("r1").unwrap().metadata.groups, vec!["g"]);
    }
}
