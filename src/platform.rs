//! Platform command table
//!
//! Show commands a transport layer sends for each supported platform. Keys
//! match `metadata.platform` values.

/// Platforms with known commands
pub const KNOWN_PLATFORMS: &[&str] = &[
    "arista_eos",
    "cisco_iosxe",
    "cisco_iosxr",
    "cisco_nxos",
    "juniper_junos",
];

const LLDP_NEIGHBORS: &[(&str, &str)] = &[
    ("arista_eos", "show lldp neighbors"),
    ("cisco_iosxe", "show lldp neighbors"),
    ("cisco_iosxr", "show lldp neighbors"),
    ("cisco_nxos", "show lldp neighbors"),
    ("juniper_junos", "show lldp neighbors"),
];

/// LLDP neighbor table command for `platform`
pub fn lldp_neighbors_command(platform: &str) -> Option<&'static str> {
    LLDP_NEIGHBORS
        .iter()
        .find(|(p, _)| *p == platform)
        .map(|(_, cmd)| *cmd)
}

pub fn is_known(platform: &str) -> bool {
    KNOWN_PLATFORMS.contains(&platform)
}
