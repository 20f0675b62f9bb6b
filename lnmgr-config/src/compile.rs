//! The `prepare` pipeline (spec.md §4.3): validate → resolve → cap-check →
//! validate-topology → resolve-VLANs, run in strict phase order and halted
//! on first failure. "Build topology" (single-master enforcement, slave
//! list insertion) is folded into the resolve phase here, since
//! `feature::resolve_master`/`resolve_bridge` already perform that wiring
//! as they resolve a config id into a graph reference — see DESIGN.md.

use lnmgr_graph::feature::{feature_ops, CapabilityProbe};
use lnmgr_graph::{FailReason, Graph, VlanEntry};

use crate::error::ConfigError;

pub fn prepare(graph: &mut Graph, probe: &dyn CapabilityProbe) -> Result<(), ConfigError> {
    graph.reset_topology();

    if let Err(e) = validate_features(graph) {
        return Err(ConfigError::Topology(e));
    }
    if let Err(e) = resolve_features(graph) {
        fail_topology(graph);
        return Err(ConfigError::Topology(e));
    }
    if let Err(e) = capability_check(graph, probe) {
        fail_topology(graph);
        return Err(ConfigError::Topology(e));
    }
    if let Err(e) = validate_topology(graph) {
        fail_topology(graph);
        return Err(ConfigError::Topology(e));
    }
    if let Err(e) = resolve_vlans(graph) {
        fail_topology(graph);
        return Err(ConfigError::Topology(e));
    }

    Ok(())
}

/// On failure in phases that can leave partial topology behind, every node
/// with a non-`None` `fail_reason` moves to `Failed` (spec.md §4.3).
fn fail_topology(graph: &mut Graph) {
    graph.promote_failed_by_reason();
}

fn validate_features(graph: &mut Graph) -> Result<(), String> {
    let ids: Vec<String> = graph.iter_order().map(|s| s.to_string()).collect();
    for id in ids {
        let features = graph.find_node(&id).map(|n| n.features.clone()).unwrap_or_default();
        for feature in &features {
            if let Some(validate) = feature_ops(feature.tag()).validate {
                if validate(feature).is_err() {
                    graph.set_fail_reason(&id, FailReason::Topology);
                    return Err(format!(
                        "node '{id}': feature {:?} failed validation",
                        feature.tag()
                    ));
                }
            }
        }
    }
    Ok(())
}

fn resolve_features(graph: &mut Graph) -> Result<(), String> {
    let ids: Vec<String> = graph.iter_order().map(|s| s.to_string()).collect();
    for id in ids {
        let features = graph
            .find_node(&id)
            .map(|n| n.features.clone())
            .unwrap_or_default();
        for feature in features {
            if let Some(resolve) = feature_ops(feature.tag()).resolve {
                if resolve(graph, &id, &feature).is_err() {
                    graph.set_fail_reason(&id, FailReason::Topology);
                    return Err(format!("node '{id}': failed to resolve {:?}", feature.tag()));
                }
            }
        }
    }
    Ok(())
}

fn capability_check(graph: &mut Graph, probe: &dyn CapabilityProbe) -> Result<(), String> {
    let ids: Vec<String> = graph.iter_order().map(|s| s.to_string()).collect();
    for id in ids {
        let features = graph.find_node(&id).map(|n| n.features.clone()).unwrap_or_default();
        for feature in &features {
            if let Some(cap_check) = feature_ops(feature.tag()).cap_check {
                if cap_check(probe, feature).is_err() {
                    graph.set_fail_reason(&id, FailReason::Topology);
                    return Err(format!(
                        "node '{id}': platform lacks capability for {:?}",
                        feature.tag()
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Structural sanity plus tortoise-and-hare cycle detection over `master`
/// pointers (spec.md §4.3 phase 6).
fn validate_topology(graph: &mut Graph) -> Result<(), String> {
    let ids: Vec<String> = graph.iter_order().map(|s| s.to_string()).collect();

    for id in &ids {
        let node = graph.find_node(id).expect("known id");
        if node.topology.is_bridge && node.topology.master.is_some() {
            graph.set_fail_reason(id, FailReason::Topology);
            return Err(format!("node '{id}': a bridge must not have a master"));
        }
        if node.topology.is_bridge_port {
            let Some(master_id) = node.topology.master.clone() else {
                graph.set_fail_reason(id, FailReason::Topology);
                return Err(format!("node '{id}': bridge-port has no master"));
            };
            let Some(master) = graph.find_node(&master_id) else {
                graph.set_fail_reason(id, FailReason::Topology);
                return Err(format!("node '{id}': master '{master_id}' does not exist"));
            };
            if !master.topology.is_bridge {
                graph.set_fail_reason(id, FailReason::Topology);
                return Err(format!("node '{id}': master '{master_id}' is not a bridge"));
            }
        } else if node.topology.master.is_some() {
            graph.set_fail_reason(id, FailReason::Topology);
            return Err(format!("node '{id}': has a master but is not a bridge-port"));
        }
    }

    for id in &ids {
        let has_master = graph.find_node(id).map(|n| n.topology.master.is_some()).unwrap_or(false);
        if has_master && has_master_cycle(graph, id) {
            graph.set_fail_reason(id, FailReason::Topology);
            return Err(format!("node '{id}': master chain contains a cycle"));
        }
    }

    Ok(())
}

fn has_master_cycle(graph: &Graph, start: &str) -> bool {
    let mut slow = start.to_string();
    let mut fast = start.to_string();

    loop {
        let Some(next_slow) = graph.find_node(&slow).and_then(|n| n.topology.master.clone()) else {
            return false;
        };
        slow = next_slow;

        for _ in 0..2 {
            let Some(next_fast) = graph.find_node(&fast).and_then(|n| n.topology.master.clone()) else {
                return false;
            };
            fast = next_fast;
        }

        if slow == fast {
            return true;
        }
    }
}

/// Bridge-port VLAN resolution (spec.md §4.3 phase 7): inherit the
/// bridge's list, apply per-port overrides, then settle on exactly one
/// pvid.
fn resolve_vlans(graph: &mut Graph) -> Result<(), String> {
    let port_ids: Vec<String> = graph
        .nodes()
        .filter(|n| n.topology.is_bridge_port)
        .map(|n| n.id.clone())
        .collect();

    for port_id in port_ids {
        let (master_id, overrides) = {
            let port = graph.find_node(&port_id).expect("known id");
            (
                port.topology.master.clone().expect("validated above"),
                port.topology.vlans.clone(),
            )
        };

        let inherited: Vec<VlanEntry> = graph
            .find_node(&master_id)
            .map(|b| b.topology.vlans.clone())
            .unwrap_or_default();

        let mut resolved: Vec<VlanEntry> = inherited
            .into_iter()
            .map(|mut v| {
                v.pvid = false;
                v.inherited = true;
                v
            })
            .collect();

        for over in overrides {
            let Some(entry) = resolved.iter_mut().find(|v| v.vid == over.vid) else {
                graph.set_fail_reason(&port_id, FailReason::Topology);
                return Err(format!(
                    "node '{port_id}': VLAN override {} does not reference an inherited VID",
                    over.vid
                ));
            };
            entry.tagged = over.tagged;
            entry.pvid = over.pvid;
            entry.inherited = false;
        }

        if !resolved.iter().any(|v| v.pvid) {
            if let Some(first_untagged) = resolved.iter_mut().find(|v| !v.tagged) {
                first_untagged.pvid = true;
            } else {
                graph.set_fail_reason(&port_id, FailReason::Topology);
                return Err(format!("node '{port_id}': no pvid could be assigned"));
            }
        }

        if let Some(node) = graph.find_node_mut(&port_id) {
            node.topology.vlans = resolved;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lnmgr_graph::{Feature, Kind};

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
    fn bridge_and_two_ports_resolve_vlans() {
        let mut g = Graph::new();
        g.add_node("br0", Kind::Bridge);
        g.add_node("p1", Kind::Ethernet);
        g.add_node("p2", Kind::Ethernet);

        if let Some(n) = g.find_node_mut("br0") {
            n.features.push(Feature::Bridge {
                vlan_filtering: true,
                vlans: vec![
                    VlanEntry { vid: 1, tagged: false, pvid: true, inherited: false },
                    VlanEntry { vid: 10, tagged: true, pvid: false, inherited: false },
                ],
            });
        }
        if let Some(n) = g.find_node_mut("p1") {
            n.features.push(Feature::Master {
                master_id: "br0".to_string(),
                resolved: None,
            });
        }
        if let Some(n) = g.find_node_mut("p2") {
            n.features.push(Feature::Master {
                master_id: "br0".to_string(),
                resolved: None,
            });
            n.features.push(Feature::BridgePort {
                vlans: vec![VlanEntry { vid: 10, tagged: true, pvid: false, inherited: false }],
            });
        }

        prepare(&mut g, &AllowAll).unwrap();

        let p1 = g.find_node("p1").unwrap();
        assert_eq!(p1.topology.vlans.len(), 2);
        assert!(p1.topology.vlans.iter().find(|v| v.vid == 1).unwrap().pvid);

        let p2 = g.find_node("p2").unwrap();
        assert!(p2.topology.vlans.iter().find(|v| v.vid == 1).unwrap().pvid);
        assert!(p2.topology.vlans.iter().find(|v| v.vid == 10).unwrap().tagged);
    }

    #[test]
    fn port_referencing_non_inherited_vlan_fails_topology() {
        let mut g = Graph::new();
        g.add_node("br0", Kind::Bridge);
        g.add_node("p3", Kind::Ethernet);

        if let Some(n) = g.find_node_mut("br0") {
            n.features.push(Feature::Bridge {
                vlan_filtering: false,
                vlans: vec![],
            });
        }
        if let Some(n) = g.find_node_mut("p3") {
            n.features.push(Feature::Master {
                master_id: "br0".to_string(),
                resolved: None,
            });
            n.features.push(Feature::BridgePort {
                vlans: vec![VlanEntry { vid: 42, tagged: true, pvid: false, inherited: false }],
            });
        }

        let result = prepare(&mut g, &AllowAll);
        assert!(result.is_err());
        assert_eq!(g.find_node("p3").unwrap().fail_reason, FailReason::Topology);
    }
}
