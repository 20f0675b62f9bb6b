//! Parses config files (spec.md §6) into a compiled, action-wired `Graph`.
//!
//! Three steps, in order: `schema` deserializes the JSON shape, `loader`
//! applies it to a fresh graph across three passes and wires each node's
//! kernel action, and `compile` runs the validate/resolve/cap-check/
//! topology/VLAN pipeline over the result.

pub mod compile;
pub mod error;
pub mod loader;
pub mod schema;

pub use compile::prepare;
pub use error::ConfigError;
pub use loader::load_str;
pub use schema::{BridgeSpec, ConfigFile, NodeSpec, PortSpec, VlanDomainSpec, VlanSpec};
