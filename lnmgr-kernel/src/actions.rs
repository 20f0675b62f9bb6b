//! Per-kind `activate`/`deactivate` dispatch (spec.md §4.6).

use std::sync::Arc;

use async_trait::async_trait;
use lnmgr_graph::{ActionError, Graph, NodeAction};

use crate::adapter::KernelAdapter;

/// Ethernet, Wifi, and DSA-port links: activate brings the link up,
/// deactivate takes it down. No other side effects.
pub struct LinkAction {
    pub kernel: Arc<dyn KernelAdapter>,
}

#[async_trait]
impl NodeAction for LinkAction {
    async fn activate(&self, _graph: &Graph, node_id: &str) -> Result<(), ActionError> {
        self.kernel.link_set_up(node_id).await.map_err(Into::into)
    }

    async fn deactivate(&self, _graph: &Graph, node_id: &str) -> Result<(), ActionError> {
        self.kernel.link_set_down(node_id).await.map_err(Into::into)
    }
}

/// Bridges: activate creates the bridge if missing, applies the declared
/// VLAN-filtering flag, and brings it up. Deactivate is a no-op — removing
/// a bridge interface is out of scope for this daemon (Open Question (c)).
pub struct BridgeAction {
    pub kernel: Arc<dyn KernelAdapter>,
    pub vlan_filtering: bool,
}

#[async_trait]
impl NodeAction for BridgeAction {
    async fn activate(&self, _graph: &Graph, node_id: &str) -> Result<(), ActionError> {
        self.kernel.bridge_create(node_id).await?;
        self.kernel
            .bridge_set_vlan_filtering(node_id, self.vlan_filtering)
            .await?;
        self.kernel.link_set_up(node_id).await?;
        Ok(())
    }

    async fn deactivate(&self, _graph: &Graph, _node_id: &str) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Bridge ports: activate enslaves the port to its resolved master, brings
/// the link up, then walks the port's resolved VLAN list.
pub struct BridgePortAction {
    pub kernel: Arc<dyn KernelAdapter>,
}

#[async_trait]
impl NodeAction for BridgePortAction {
    async fn activate(&self, graph: &Graph, node_id: &str) -> Result<(), ActionError> {
        let node = graph
            .find_node(node_id)
            .ok_or_else(|| ActionError(format!("unknown node '{node_id}'")))?;
        let master = node
            .topology
            .master
            .clone()
            .ok_or_else(|| ActionError(format!("node '{node_id}' has no resolved master")))?;
        let vlans = node.topology.vlans.clone();

        self.kernel.bridge_add_port(&master, node_id).await?;
        self.kernel.link_set_up(node_id).await?;
        for vlan in &vlans {
            self.kernel
                .bridge_vlan_add(&master, node_id, vlan.vid, vlan.tagged, vlan.pvid)
                .await?;
        }
        Ok(())
    }

    /// Delegated to the kernel on port removal (spec.md §4.6): removing the
    /// port from the bridge happens as a side effect of the link itself
    /// being torn down, not as an explicit action here.
    async fn deactivate(&self, _graph: &Graph, _node_id: &str) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Bonds and other aggregates/services in core scope have no declared
/// side effects unless a feature adds them.
pub struct NoopAction;

#[async_trait]
impl NodeAction for NoopAction {
    async fn activate(&self, _graph: &Graph, _node_id: &str) -> Result<(), ActionError> {
        Ok(())
    }

    async fn deactivate(&self, _graph: &Graph, _node_id: &str) -> Result<(), ActionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockKernelAdapter};
    use lnmgr_graph::Kind;

    #[tokio::test]
    async fn link_action_activate_brings_link_up() {
        let mock = Arc::new(MockKernelAdapter::new());
        let action = LinkAction { kernel: mock.clone() };
        let g = Graph::new();

        action.activate(&g, "eth0").await.unwrap();
        assert_eq!(mock.calls(), vec![Call::LinkSetUp("eth0".to_string())]);
    }

    #[tokio::test]
    async fn link_action_propagates_kernel_failure() {
        let mock = Arc::new(MockKernelAdapter::new());
        mock.fail_link_set_up("eth0");
        let action = LinkAction { kernel: mock.clone() };
        let g = Graph::new();

        assert!(action.activate(&g, "eth0").await.is_err());
    }

    #[tokio::test]
    async fn bridge_action_creates_sets_vlan_filtering_and_brings_up() {
        let mock = Arc::new(MockKernelAdapter::new());
        let action = BridgeAction {
            kernel: mock.clone(),
            vlan_filtering: true,
        };
        let g = Graph::new();

        action.activate(&g, "br0").await.unwrap();
        assert_eq!(
            mock.calls(),
            vec![
                Call::BridgeCreate("br0".to_string()),
                Call::BridgeSetVlanFiltering("br0".to_string(), true),
                Call::LinkSetUp("br0".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn bridge_port_action_enslaves_then_adds_vlans() {
        let mock = Arc::new(MockKernelAdapter::new());
        let action = BridgePortAction { kernel: mock.clone() };
        let mut g = Graph::new();
        g.add_node("br0", Kind::Bridge);
        g.add_node("p1", Kind::Ethernet);
        g.set_master("p1", "br0");
        g.set_bridge(
            "br0",
            true,
            vec![lnmgr_graph::VlanEntry {
                vid: 10,
                tagged: true,
                pvid: false,
                inherited: false,
            }],
        );
        // the port's own resolved vlan list mirrors the bridge's in this test
        if let Some(node) = g.find_node_mut("p1") {
            node.topology.vlans = vec![lnmgr_graph::VlanEntry {
                vid: 10,
                tagged: true,
                pvid: false,
                inherited: true,
            }];
        }

        action.activate(&g, "p1").await.unwrap();
        assert_eq!(
            mock.calls(),
            vec![
                Call::BridgeAddPort("br0".to_string(), "p1".to_string()),
                Call::LinkSetUp("p1".to_string()),
                Call::BridgeVlanAdd("br0".to_string(), "p1".to_string(), 10, true, false),
            ]
        );
    }

    #[tokio::test]
    async fn bridge_port_action_without_resolved_master_errors() {
        let mock = Arc::new(MockKernelAdapter::new());
        let action = BridgePortAction { kernel: mock.clone() };
        let mut g = Graph::new();
        g.add_node("p1", Kind::Ethernet);

        assert!(action.activate(&g, "p1").await.is_err());
    }
}
