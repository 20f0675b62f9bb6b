use async_trait::async_trait;

use crate::error::KernelError;

/// Typed façade over the handful of rtnetlink conversations the daemon
/// needs (spec.md §4.6). Every operation is idempotent: calling
/// `link_set_up` on a link that is already up is a success, not a no-op
/// error, because the evaluator may invoke `activate` more than once for a
/// node that stays `Waiting`.
#[async_trait]
pub trait KernelAdapter: Send + Sync {
    async fn link_set_up(&self, id: &str) -> Result<(), KernelError>;
    async fn link_set_down(&self, id: &str) -> Result<(), KernelError>;
    async fn link_is_up(&self, id: &str) -> Result<bool, KernelError>;
    async fn link_exists(&self, id: &str) -> Result<bool, KernelError>;
    async fn link_ifindex(&self, id: &str) -> Result<u32, KernelError>;

    async fn bridge_create(&self, id: &str) -> Result<(), KernelError>;
    async fn bridge_set_vlan_filtering(&self, id: &str, on: bool) -> Result<(), KernelError>;
    async fn bridge_add_port(&self, bridge_id: &str, port_id: &str) -> Result<(), KernelError>;
    async fn bridge_vlan_add(
        &self,
        bridge_id: &str,
        port_id: &str,
        vid: u16,
        tagged: bool,
        pvid: bool,
    ) -> Result<(), KernelError>;
    async fn bridge_vlan_del(&self, bridge_id: &str, port_id: &str, vid: u16) -> Result<(), KernelError>;
}

/// Platform capability probe used by the config compiler's cap-check phase
/// (spec.md §4.3 phase 4). Implemented by the same adapter that performs
/// the real operations, so cap-check reflects what `activate` can actually
/// do later.
pub trait CapabilityProbe: lnmgr_graph::CapabilityProbe {}
impl<T: lnmgr_graph::CapabilityProbe> CapabilityProbe for T {}
