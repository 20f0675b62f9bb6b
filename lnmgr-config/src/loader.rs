//! Turns a parsed `ConfigFile` into a runnable `Graph` (spec.md §6): create
//! all nodes, then declare signals/requires, then enable — three passes so
//! that `requires` can reference a node declared later in the file.

use std::sync::Arc;

use lnmgr_graph::feature::CapabilityProbe;
use lnmgr_graph::{Feature, Graph, Kind, VlanEntry};
use lnmgr_kernel::{BridgeAction, BridgePortAction, KernelAdapter, LinkAction, NoopAction};

use crate::compile::prepare;
use crate::error::ConfigError;
use crate::schema::{ConfigFile, NodeSpec, VlanSpec};

/// Parses and loads a config file, then runs `prepare` on the resulting
/// graph. `flush=true` is handled by the caller: this function always
/// builds a fresh graph, and the daemon decides whether to discard the
/// previous one.
pub fn load_str(
    text: &str,
    kernel: Arc<dyn KernelAdapter>,
    probe: &dyn CapabilityProbe,
) -> Result<Graph, ConfigError> {
    let config: ConfigFile = serde_json::from_str(text)?;
    if config.version != 1 {
        return Err(ConfigError::ConfigInvalid(format!(
            "unsupported config version {}",
            config.version
        )));
    }

    let mut graph = Graph::new();

    // Pass 1: create all nodes.
    for spec in &config.nodes {
        let kind = lnmgr_graph::lookup_kind_by_name(&spec.kind)
            .ok_or_else(|| ConfigError::ConfigInvalid(format!("unknown kind '{}'", spec.kind)))?
            .kind;
        graph.add_node(spec.id.clone(), kind);
        assign_actions(&mut graph, &spec.id, kind, spec, Arc::clone(&kernel));
    }

    // Pass 2: declare signals/requires, attach features.
    for spec in &config.nodes {
        for signal in &spec.signals {
            graph
                .add_signal(&spec.id, signal)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        }
        for dep in &spec.requires {
            graph
                .add_require(&spec.id, dep)
                .map_err(|e| ConfigError::ConfigInvalid(format!("node '{}': {e}", spec.id)))?;
        }
        attach_features(&mut graph, spec)?;
    }

    // Pass 3: enable.
    for spec in &config.nodes {
        if spec.enabled {
            graph
                .enable_node(&spec.id)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        }
        if let Some(node) = graph.find_node_mut(&spec.id) {
            node.auto_up = spec.auto;
        }
    }

    prepare(&mut graph, probe)?;
    Ok(graph)
}

fn assign_actions(
    graph: &mut Graph,
    id: &str,
    kind: Kind,
    spec: &NodeSpec,
    kernel: Arc<dyn KernelAdapter>,
) {
    use lnmgr_graph::kind::SemanticType;

    let info = lnmgr_graph::lookup_kind(kind);
    let action: Arc<dyn lnmgr_graph::NodeAction> = if spec.bridge.is_some() {
        Arc::new(BridgeAction {
            kernel,
            vlan_filtering: spec.bridge.as_ref().map(|b| b.vlan_filtering).unwrap_or(false),
        })
    } else if spec.master.is_some() {
        Arc::new(BridgePortAction { kernel })
    } else if info.semantic_type == SemanticType::Link {
        Arc::new(LinkAction { kernel })
    } else {
        Arc::new(NoopAction)
    };
    graph.assign_actions(id, action);
}

fn attach_features(graph: &mut Graph, spec: &NodeSpec) -> Result<(), ConfigError> {
    let mut features = Vec::new();

    if let Some(master_id) = &spec.master {
        features.push(Feature::Master {
            master_id: master_id.clone(),
            resolved: None,
        });
    }
    if let Some(bridge) = &spec.bridge {
        features.push(Feature::Bridge {
            vlan_filtering: bridge.vlan_filtering,
            vlans: bridge.vlans.iter().map(vlan_entry).collect(),
        });
    }
    if let Some(port) = &spec.port {
        features.push(Feature::BridgePort {
            vlans: port.vlans.iter().map(vlan_entry).collect(),
        });
    }
    if let Some(vlan) = &spec.vlan {
        features.push(Feature::VlanDomain { vid: vlan.vid });
    }

    if let Some(node) = graph.find_node_mut(&spec.id) {
        node.features = features;
    }
    Ok(())
}

fn vlan_entry(spec: &VlanSpec) -> VlanEntry {
    VlanEntry {
        vid: spec.vid,
        tagged: spec.tagged,
        pvid: spec.pvid,
        inherited: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lnmgr_kernel::MockKernelAdapter;

    struct AllowAll;
    impl CapabilityProbe for AllowAll {
        fn supports_vlan_filtering(&self) -> bool {
            true
        }
        fn supports_bridging(&self) -> bool {
            true
        }
    }

    #[test]
    fn loads_single_ethernet_with_signal() {
        let json = r#"{
            "version": 1,
            "nodes": [
                {"id": "eth0", "type": "ethernet", "enabled": true, "signals": ["carrier"]}
            ]
        }"#;
        let kernel = Arc::new(MockKernelAdapter::new());
        let graph = load_str(json, kernel, &AllowAll).unwrap();
        let node = graph.find_node("eth0").unwrap();
        assert!(node.enabled);
        assert_eq!(node.signal_value("carrier"), Some(false));
    }

    #[test]
    fn rejects_unknown_kind() {
        let json = r#"{"version": 1, "nodes": [{"id": "x", "type": "not-a-kind"}]}"#;
        let kernel = Arc::new(MockKernelAdapter::new());
        assert!(load_str(json, kernel, &AllowAll).is_err());
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let json = r#"{"version": 1, "nodes": [], "bogus": 1}"#;
        let kernel = Arc::new(MockKernelAdapter::new());
        assert!(load_str(json, kernel, &AllowAll).is_err());
    }

    #[test]
    fn requires_can_reference_a_later_declared_node() {
        let json = r#"{
            "version": 1,
            "nodes": [
                {"id": "b", "type": "ethernet", "enabled": true, "requires": ["a"]},
                {"id": "a", "type": "ethernet", "enabled": true}
            ]
        }"#;
        let kernel = Arc::new(MockKernelAdapter::new());
        let graph = load_str(json, kernel, &AllowAll).unwrap();
        assert_eq!(graph.find_node("b").unwrap().requires, vec!["a".to_string()]);
    }
}
