use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use serde_json::json;

use crate::error::GraphError;
use crate::kind::{lookup_kind, Kind};
use crate::node::{FailReason, Node, NodeAction, SignalSlot, State};

/// The in-memory dependency graph. Owns every node by stable string id;
/// all cross-references (`requires`, `master`, subscriber mirrors) are
/// stored as ids rather than pointers, so the graph can be freely dropped
/// and rebuilt without anyone holding a dangling reference (spec.md §9).
pub struct Graph {
    nodes: HashMap<String, Node>,
    order: Vec<String>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            nodes: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Creates a node. Panics on a duplicate id — that is a programming
    /// error in the config compiler, not a runtime condition callers need
    /// to handle (spec.md §9).
    pub fn add_node(&mut self, id: impl Into<String>, kind: Kind) {
        let id = id.into();
        assert!(
            !self.nodes.contains_key(&id),
            "add_node: duplicate node id '{id}'"
        );
        self.order.push(id.clone());
        self.nodes.insert(id.clone(), Node::new(id, kind));
    }

    pub fn del_node(&mut self, id: &str) {
        if self.nodes.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
        }
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Nodes in insertion order. The evaluator's fixpoint relies on this
    /// order for iteration; fairness comes from the enclosing loop, not
    /// from any particular order, but the order must stay stable from call
    /// to call.
    pub fn iter_order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(move |id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn add_require(&mut self, from_id: &str, to_id: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(to_id) {
            return Err(GraphError::UnknownNode(to_id.to_string()));
        }
        let node = self
            .nodes
            .get_mut(from_id)
            .ok_or_else(|| GraphError::UnknownNode(from_id.to_string()))?;
        if !node.requires.iter().any(|r| r == to_id) {
            node.requires.push(to_id.to_string());
        }
        Ok(())
    }

    pub fn del_require(&mut self, from_id: &str, to_id: &str) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(from_id)
            .ok_or_else(|| GraphError::UnknownNode(from_id.to_string()))?;
        node.requires.retain(|r| r != to_id);
        Ok(())
    }

    /// Declares a signal requirement, defaulting to `false`. Idempotent.
    pub fn add_signal(&mut self, node_id: &str, name: &str) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        if !node.signals.iter().any(|s| s.name == name) {
            node.signals.push(SignalSlot {
                name: name.to_string(),
                value: false,
            });
        }
        Ok(())
    }

    /// Sets a signal's value, creating it (as "changed") if undeclared.
    /// Returns whether the value actually flipped.
    pub fn set_signal(&mut self, node_id: &str, name: &str, value: bool) -> Result<bool, GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        match node.signals.iter_mut().find(|s| s.name == name) {
            Some(slot) => {
                if slot.value == value {
                    Ok(false)
                } else {
                    slot.value = value;
                    Ok(true)
                }
            }
            None => {
                node.signals.push(SignalSlot {
                    name: name.to_string(),
                    value,
                });
                Ok(true)
            }
        }
    }

    /// Writes a signal only if the node already declared it; a no-op on an
    /// undeclared name rather than creating one. Used to fold raw kernel
    /// facts (e.g. `running`) onto whichever declared signal names they
    /// happen to match, without silently adding new activation gates.
    pub fn set_signal_if_declared(&mut self, node_id: &str, name: &str, value: bool) -> Result<bool, GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        match node.signals.iter_mut().find(|s| s.name == name) {
            Some(slot) if slot.value != value => {
                slot.value = value;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }

    /// Records the raw kernel admin-up fact for a link-backed node (spec.md
    /// §4.5, Open Question (b)). Never affects activation.
    pub fn set_link_admin_up(&mut self, node_id: &str, value: bool) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        node.link_admin_up = value;
        Ok(())
    }

    pub fn set_present(&mut self, node_id: &str, present: bool) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        node.present = present;
        Ok(())
    }

    pub fn assign_actions(&mut self, node_id: &str, actions: Arc<dyn NodeAction>) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.actions = Some(actions);
        }
    }

    pub fn enable_node(&mut self, node_id: &str) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        node.enabled = true;
        Ok(())
    }

    /// Runs the kind's `deactivate` if the node was `Active`, then clamps it
    /// to `Inactive` and clears its latches. Not part of evaluation — the
    /// caller drives this directly (spec.md §4.4).
    pub async fn disable_node(&mut self, node_id: &str) -> Result<(), GraphError> {
        let was_active = {
            let node = self
                .nodes
                .get(node_id)
                .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
            node.state == State::Active
        };

        if was_active {
            let actions = self.nodes.get(node_id).and_then(|n| n.actions.clone());
            if let Some(actions) = actions {
                if let Err(err) = actions.deactivate(self, node_id).await {
                    tracing::warn!(node = node_id, error = %err, "deactivate failed during disable");
                }
            }
        }

        let node = self.nodes.get_mut(node_id).expect("checked above");
        node.state = State::Inactive;
        node.enabled = false;
        node.activated = false;
        Ok(())
    }

    /// Clears `fail_reason` and derived topology on every node. Run at the
    /// start of every `prepare` pass (spec.md §4.3 phase 1).
    pub fn reset_topology(&mut self) {
        for node in self.nodes.values_mut() {
            node.fail_reason = FailReason::None;
            node.topology = Default::default();
        }
    }

    pub fn set_master(&mut self, port_id: &str, master_id: &str) {
        if let Some(node) = self.nodes.get_mut(port_id) {
            node.topology.master = Some(master_id.to_string());
            node.topology.is_bridge_port = true;
        }
        if let Some(master) = self.nodes.get_mut(master_id) {
            if !master.topology.slaves.iter().any(|s| s == port_id) {
                master.topology.slaves.push(port_id.to_string());
            }
        }
    }

    pub fn set_bridge(&mut self, node_id: &str, _vlan_filtering: bool, vlans: Vec<crate::node::VlanEntry>) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.topology.is_bridge = true;
            node.topology.vlans = vlans;
        }
    }

    pub fn mark_failed(&mut self, node_id: &str, reason: FailReason) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.fail_reason = reason;
            node.state = State::Failed;
        }
    }

    /// Records a failure reason without yet moving the node to `Failed`.
    /// Used by the compile pipeline, which marks reasons as it walks
    /// phases 2–7 but only promotes to `Failed` once, after the pipeline
    /// halts (spec.md §4.3).
    pub fn set_fail_reason(&mut self, node_id: &str, reason: FailReason) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.fail_reason = reason;
        }
    }

    /// Promotes every node carrying a non-`None` `fail_reason` to `Failed`.
    pub fn promote_failed_by_reason(&mut self) {
        for node in self.nodes.values_mut() {
            if node.fail_reason != FailReason::None {
                node.state = State::Failed;
            }
        }
    }

    /// Emits the graph in the `SAVE` schema (spec.md §6), nodes sorted by
    /// id so diffs are stable.
    pub fn save_json<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort();

        let nodes: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let node = &self.nodes[id];
                json!({
                    "id": node.id,
                    "type": lookup_kind(node.kind).config_name,
                    "enabled": node.enabled,
                    "auto": node.auto_up,
                    "signals": node.signal_names().collect::<Vec<_>>(),
                    "requires": node.requires,
                })
            })
            .collect();

        let doc = json!({ "version": 1, "nodes": nodes });
        writeln!(writer, "{}", doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_then_find() {
        let mut g = Graph::new();
        g.add_node("eth0", Kind::Ethernet);
        assert!(g.find_node("eth0").is_some());
        assert!(g.find_node("eth1").is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate node id")]
    fn add_node_duplicate_panics() {
        let mut g = Graph::new();
        g.add_node("eth0", Kind::Ethernet);
        g.add_node("eth0", Kind::Ethernet);
    }

    #[test]
    fn set_signal_semantics() {
        let mut g = Graph::new();
        g.add_node("eth0", Kind::Ethernet);
        g.add_signal("eth0", "carrier").unwrap();

        assert_eq!(g.find_node("eth0").unwrap().signals_met(), false);

        assert!(g.set_signal("eth0", "carrier", true).unwrap());
        assert!(g.find_node("eth0").unwrap().signals_met());

        // setting the same value again reports unchanged
        assert!(!g.set_signal("eth0", "carrier", true).unwrap());

        // undeclared name creates it and reports changed
        assert!(g.set_signal("eth0", "running", true).unwrap());
        assert_eq!(g.find_node("eth0").unwrap().signal_value("running"), Some(true));
    }

    #[test]
    fn set_signal_if_declared_ignores_undeclared_names() {
        let mut g = Graph::new();
        g.add_node("eth0", Kind::Ethernet);
        g.add_signal("eth0", "carrier").unwrap();

        assert!(!g.set_signal_if_declared("eth0", "running", true).unwrap());
        assert!(g.find_node("eth0").unwrap().signal_value("running").is_none());

        assert!(g.set_signal_if_declared("eth0", "carrier", true).unwrap());
        assert_eq!(g.find_node("eth0").unwrap().signal_value("carrier"), Some(true));
    }

    #[test]
    fn set_link_admin_up_defaults_true_and_is_writable() {
        let mut g = Graph::new();
        g.add_node("eth0", Kind::Ethernet);
        assert!(g.find_node("eth0").unwrap().link_admin_up);

        g.set_link_admin_up("eth0", false).unwrap();
        assert!(!g.find_node("eth0").unwrap().link_admin_up);
    }

    #[test]
    fn add_require_rejects_unknown_target() {
        let mut g = Graph::new();
        g.add_node("a", Kind::Ethernet);
        assert!(g.add_require("a", "nonexistent").is_err());
    }

    #[test]
    fn save_json_sorted_by_id() {
        let mut g = Graph::new();
        g.add_node("zeta", Kind::Ethernet);
        g.add_node("alpha", Kind::Ethernet);
        let mut buf = Vec::new();
        g.save_json(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let alpha_pos = text.find("alpha").unwrap();
        let zeta_pos = text.find("zeta").unwrap();
        assert!(alpha_pos < zeta_pos);
    }
}
