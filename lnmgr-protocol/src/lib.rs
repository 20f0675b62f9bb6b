//! Line-oriented control protocol (spec.md §4.9, §6): command parsing and
//! the JSON wire shapes for replies, snapshots, and events. Socket I/O and
//! the subscriber set live in `lnmgr-daemon`; this crate only knows shapes.

pub mod command;
pub mod error;
pub mod wire;

pub use command::{parse_line, Command};
pub use error::ProtocolError;
pub use wire::{DumpEntry, EventSnapshot, NodeSnapshot, Notification, Reply, StatusEntry, PROTOCOL_VERSION};
