//! pneuma - network device inventory
//!
//! Loads device/group inventories from YAML or TOML, resolves each device's
//! effective configuration through its groups and selects device subsets.
//! The resolution and selection engine lives in `pneuma-inventory`; this
//! crate adds file loading, default layering and CLI output.

pub mod config;
pub mod loader;
pub mod platform;
pub mod report;

pub use config::{layer_defaults, DefaultsOverride};
pub use loader::{FileInventory, Format, InventorySource, LoadError, LoadedInventory};
pub use pneuma_inventory::{
    Connection, Device, FilterError, Group, Inventory, MergeError, Metadata, ResolveDefaults,
};
