//! Feature payloads and the feature registry (spec.md §4.1).
//!
//! A feature is a typed, tagged piece of intent attached to a node
//! (`master = br0`, `bridge.vlans = [...]`). The registry maps a feature's
//! tag to its `{validate, resolve, cap_check}` operations; all three are
//! optional and absence is a no-op, matching the C original's function
//! tables in `src/graph.c`.

use crate::error::TopologyFailure;
use crate::graph::Graph;
use crate::node::VlanEntry;

/// A resolved reference to another node, filled in during the resolve
/// phase. `None` before `prepare` has run once.
pub type ResolvedRef = Option<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    /// This node is a bridge port; `master_id` names its bridge.
    Master {
        master_id: String,
        resolved: ResolvedRef,
    },
    /// This node is a bridge.
    Bridge {
        vlan_filtering: bool,
        vlans: Vec<VlanEntry>,
    },
    /// Per-port VLAN overrides, applied on top of the bridge's inherited set.
    BridgePort { vlans: Vec<VlanEntry> },
    /// A single 802.1Q VLAN sub-interface's VID.
    VlanDomain { vid: u16 },
    /// DSA (distributed switch architecture) port wiring.
    DsaPort {
        is_cpu: bool,
        link: Option<String>,
        switch_id: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureTag {
    Master,
    Bridge,
    BridgePort,
    VlanDomain,
    DsaPort,
}

impl Feature {
    pub fn tag(&self) -> FeatureTag {
        match self {
            Feature::Master { .. } => FeatureTag::Master,
            Feature::Bridge { .. } => FeatureTag::Bridge,
            Feature::BridgePort { .. } => FeatureTag::BridgePort,
            Feature::VlanDomain { .. } => FeatureTag::VlanDomain,
            Feature::DsaPort { .. } => FeatureTag::DsaPort,
        }
    }
}

/// Something the cap-check phase can ask the kernel adapter about. Kept
/// narrow on purpose: the graph crate must not depend on `lnmgr-kernel`.
pub trait CapabilityProbe {
    fn supports_vlan_filtering(&self) -> bool;
    fn supports_bridging(&self) -> bool;
}

type ValidateFn = fn(&Feature) -> Result<(), TopologyFailure>;
type ResolveFn = fn(&mut Graph, &str, &Feature) -> Result<(), TopologyFailure>;
type CapCheckFn = fn(&dyn CapabilityProbe, &Feature) -> Result<(), TopologyFailure>;

#[derive(Default)]
pub struct FeatureOps {
    pub validate: Option<ValidateFn>,
    pub resolve: Option<ResolveFn>,
    pub cap_check: Option<CapCheckFn>,
}

/// Look up a feature's operations by tag. Always succeeds — a tag with no
/// row in the match below simply gets all-`None` (no-op) ops.
pub fn feature_ops(tag: FeatureTag) -> FeatureOps {
    match tag {
        FeatureTag::Master => FeatureOps {
            validate: Some(validate_master),
            resolve: Some(resolve_master),
            cap_check: None,
        },
        FeatureTag::Bridge => FeatureOps {
            validate: Some(validate_bridge),
            resolve: Some(resolve_bridge),
            cap_check: Some(cap_check_bridge),
        },
        FeatureTag::BridgePort => FeatureOps {
            validate: Some(validate_bridge_port),
            resolve: None,
            cap_check: None,
        },
        FeatureTag::VlanDomain => FeatureOps {
            validate: Some(validate_vlan_domain),
            resolve: None,
            cap_check: None,
        },
        FeatureTag::DsaPort => FeatureOps {
            validate: None,
            resolve: None,
            cap_check: None,
        },
    }
}

fn validate_master(feature: &Feature) -> Result<(), TopologyFailure> {
    match feature {
        Feature::Master { master_id, .. } if master_id.is_empty() => Err(TopologyFailure),
        Feature::Master { .. } => Ok(()),
        _ => Ok(()),
    }
}

fn resolve_master(graph: &mut Graph, node_id: &str, feature: &Feature) -> Result<(), TopologyFailure> {
    let master_id = match feature {
        Feature::Master { master_id, .. } => master_id.clone(),
        _ => return Ok(()),
    };
    if graph.find_node(&master_id).is_none() {
        return Err(TopologyFailure);
    }
    graph.set_master(node_id, &master_id);
    Ok(())
}

fn validate_bridge(feature: &Feature) -> Result<(), TopologyFailure> {
    let vlans = match feature {
        Feature::Bridge { vlans, .. } => vlans,
        _ => return Ok(()),
    };
    validate_vlan_list(vlans)
}

fn resolve_bridge(graph: &mut Graph, node_id: &str, feature: &Feature) -> Result<(), TopologyFailure> {
    let (vlan_filtering, vlans) = match feature {
        Feature::Bridge { vlan_filtering, vlans } => (*vlan_filtering, vlans.clone()),
        _ => return Ok(()),
    };
    graph.set_bridge(node_id, vlan_filtering, vlans);
    Ok(())
}

fn cap_check_bridge(probe: &dyn CapabilityProbe, feature: &Feature) -> Result<(), TopologyFailure> {
    let (vlan_filtering, ..) = match feature {
        Feature::Bridge { vlan_filtering, vlans } => (*vlan_filtering, vlans),
        _ => return Ok(()),
    };
    if !probe.supports_bridging() {
        return Err(TopologyFailure);
    }
    if vlan_filtering && !probe.supports_vlan_filtering() {
        return Err(TopologyFailure);
    }
    Ok(())
}

fn validate_bridge_port(feature: &Feature) -> Result<(), TopologyFailure> {
    let vlans = match feature {
        Feature::BridgePort { vlans } => vlans,
        _ => return Ok(()),
    };
    validate_vlan_list(vlans)
}

fn validate_vlan_domain(feature: &Feature) -> Result<(), TopologyFailure> {
    match feature {
        Feature::VlanDomain { vid } if !(1..=4094).contains(vid) => Err(TopologyFailure),
        _ => Ok(()),
    }
}

fn validate_vlan_list(vlans: &[VlanEntry]) -> Result<(), TopologyFailure> {
    let mut seen = std::collections::HashSet::new();
    let mut pvid_count = 0;
    for v in vlans {
        if !(1..=4094).contains(&v.vid) {
            return Err(TopologyFailure);
        }
        if !seen.insert(v.vid) {
            return Err(TopologyFailure);
        }
        if v.pvid && v.tagged {
            return Err(TopologyFailure);
        }
        if v.pvid {
            pvid_count += 1;
        }
    }
    if pvid_count > 1 {
        return Err(TopologyFailure);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlan_list_rejects_duplicate_vid() {
        let vlans = vec![
            VlanEntry { vid: 10, tagged: true, pvid: false, inherited: false },
            VlanEntry { vid: 10, tagged: false, pvid: false, inherited: false },
        ];
        assert!(validate_vlan_list(&vlans).is_err());
    }

    #[test]
    fn vlan_list_rejects_pvid_and_tagged() {
        let vlans = vec![VlanEntry { vid: 10, tagged: true, pvid: true, inherited: false }];
        assert!(validate_vlan_list(&vlans).is_err());
    }

    #[test]
    fn vlan_list_rejects_two_pvids() {
        let vlans = vec![
            VlanEntry { vid: 1, tagged: false, pvid: true, inherited: false },
            VlanEntry { vid: 2, tagged: false, pvid: true, inherited: false },
        ];
        assert!(validate_vlan_list(&vlans).is_err());
    }

    #[test]
    fn vlan_list_rejects_out_of_range_vid() {
        let vlans = vec![VlanEntry { vid: 4095, tagged: true, pvid: false, inherited: false }];
        assert!(validate_vlan_list(&vlans).is_err());
    }

    #[test]
    fn vlan_list_accepts_well_formed_set() {
        let vlans = vec![
            VlanEntry { vid: 1, tagged: false, pvid: true, inherited: false },
            VlanEntry { vid: 10, tagged: true, pvid: false, inherited: false },
        ];
        assert!(validate_vlan_list(&vlans).is_ok());
    }
}
