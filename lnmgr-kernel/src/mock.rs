//! Test double for `KernelAdapter`, recording every call so unit tests can
//! assert on call order and arguments without touching a real kernel
//! (mirrors the `MockNetOps` pattern used for `IsolationEngine` tests).

use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapter::KernelAdapter;
use crate::error::KernelError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    LinkSetUp(String),
    LinkSetDown(String),
    BridgeCreate(String),
    BridgeSetVlanFiltering(String, bool),
    BridgeAddPort(String, String),
    BridgeVlanAdd(String, String, u16, bool, bool),
    BridgeVlanDel(String, String, u16),
}

#[derive(Default)]
pub struct MockKernelAdapter {
    calls: Mutex<Vec<Call>>,
    fail_link_set_up: Mutex<Vec<String>>,
    existing_links: Mutex<Vec<String>>,
}

impl MockKernelAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Makes `link_set_up` return a kernel error for the named link, once.
    pub fn fail_link_set_up(&self, id: &str) {
        self.fail_link_set_up.lock().unwrap().push(id.to_string());
    }

    pub fn mark_existing(&self, id: &str) {
        self.existing_links.lock().unwrap().push(id.to_string());
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl KernelAdapter for MockKernelAdapter {
    async fn link_set_up(&self, id: &str) -> Result<(), KernelError> {
        self.record(Call::LinkSetUp(id.to_string()));
        let mut failures = self.fail_link_set_up.lock().unwrap();
        if let Some(pos) = failures.iter().position(|f| f == id) {
            failures.remove(pos);
            return Err(KernelError::Netlink(format!("mock failure for {id}")));
        }
        Ok(())
    }

    async fn link_set_down(&self, id: &str) -> Result<(), KernelError> {
        self.record(Call::LinkSetDown(id.to_string()));
        Ok(())
    }

    async fn link_is_up(&self, _id: &str) -> Result<bool, KernelError> {
        Ok(true)
    }

    async fn link_exists(&self, id: &str) -> Result<bool, KernelError> {
        Ok(self.existing_links.lock().unwrap().iter().any(|e| e == id))
    }

    async fn link_ifindex(&self, _id: &str) -> Result<u32, KernelError> {
        Ok(1)
    }

    async fn bridge_create(&self, id: &str) -> Result<(), KernelError> {
        self.record(Call::BridgeCreate(id.to_string()));
        Ok(())
    }

    async fn bridge_set_vlan_filtering(&self, id: &str, on: bool) -> Result<(), KernelError> {
        self.record(Call::BridgeSetVlanFiltering(id.to_string(), on));
        Ok(())
    }

    async fn bridge_add_port(&self, bridge_id: &str, port_id: &str) -> Result<(), KernelError> {
        self.record(Call::BridgeAddPort(bridge_id.to_string(), port_id.to_string()));
        Ok(())
    }

    async fn bridge_vlan_add(
        &self,
        bridge_id: &str,
        port_id: &str,
        vid: u16,
        tagged: bool,
        pvid: bool,
    ) -> Result<(), KernelError> {
        self.record(Call::BridgeVlanAdd(
            bridge_id.to_string(),
            port_id.to_string(),
            vid,
            tagged,
            pvid,
        ));
        Ok(())
    }

    async fn bridge_vlan_del(&self, bridge_id: &str, port_id: &str, vid: u16) -> Result<(), KernelError> {
        self.record(Call::BridgeVlanDel(bridge_id.to_string(), port_id.to_string(), vid));
        Ok(())
    }
}
