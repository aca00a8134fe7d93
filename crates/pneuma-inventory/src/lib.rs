//! Network device inventory: group inheritance and device selection.
//!
//! An [`Inventory`] holds devices and reusable groups. Resolving it folds each
//! device's groups, in the order the device lists them, underneath the
//! device's own values to produce its effective spec, labels, platform and
//! connection parameters. Filters then carve out working subsets.
//!
//! ```
//! use pneuma_inventory::{Device, Group, Inventory, Metadata};
//!
//! let inventory = Inventory::new()
//!     .with_group(Group::new("eos").with_metadata(Metadata::default().with_platform("arista_eos")))
//!     .with_device(Device::new("edge1").with_metadata(Metadata::default().with_group("eos")))
//!     .resolve()
//!     .unwrap();
//!
//! let eos = inventory
//!     .filter_metadata(&Metadata::default().with_platform("arista_eos"))
//!     .unwrap();
//! assert_eq!(eos.device_names(), vec!["edge1"]);
//! assert_eq!(eos.get("edge1").unwrap().connection().port, 22);
//! ```

mod defaults;
mod filter;
mod merge;
mod model;

pub use defaults::{ResolveDefaults, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use filter::{BoxError, FilterError, MetadataFilter, NameFilter};
pub use merge::{apply_defaults, deep_merge, fold_groups, merge_labels, merge_specs, resolve, MergeError};
pub use model::{
    format_timeout, parse_timeout, Connection, Device, Group, InvalidTimeout, Inventory, Metadata,
    Spec,
};
