//! Kernel adapter: the only part of the daemon that talks to Linux. Exposes
//! `KernelAdapter` (idempotent link/bridge operations), per-kind
//! `NodeAction` implementations wired at config-compile time, and the two
//! signal ingesters the reactor multiplexes.

pub mod actions;
pub mod adapter;
pub mod error;
pub mod mock;

#[cfg(target_os = "linux")]
pub mod ingest;
#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "linux")]
pub mod vlan;

pub use actions::{BridgeAction, BridgePortAction, LinkAction, NoopAction};
pub use adapter::KernelAdapter;
pub use error::KernelError;
pub use mock::MockKernelAdapter;

#[cfg(target_os = "linux")]
pub use ingest::IngestEvent;
#[cfg(target_os = "linux")]
pub use linux::LinuxKernelAdapter;
