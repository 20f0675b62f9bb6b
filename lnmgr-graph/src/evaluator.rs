//! The evaluator: cycle detection, auto-up, and the fixpoint state machine
//! (spec.md §4.4). A pure function of `(graph, kernel-facts-already-written-
//! as-signals)` — it never talks to the kernel directly, only through each
//! node's `NodeAction`.

use std::collections::HashMap;

use crate::node::{Explain, FailReason, State};
use crate::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Runs exactly one evaluation pass. Returns whether anything observable
/// changed — the reactor uses this to decide whether to notify subscribers.
pub async fn evaluate(graph: &mut Graph) -> bool {
    let mut changed = false;

    changed |= runtime_reset(graph);
    changed |= apply_auto_up(graph);

    if detect_cycles(graph) {
        return true;
    }

    changed |= run_fixpoint(graph).await;
    changed
}

/// Clears `activated` on every node; clamps disabled nodes to `Inactive`.
fn runtime_reset(graph: &mut Graph) -> bool {
    let mut changed = false;
    let ids: Vec<String> = graph.iter_order().map(|s| s.to_string()).collect();
    for id in ids {
        let node = graph.find_node_mut(&id).expect("known id");
        if node.activated {
            node.activated = false;
            changed = true;
        }
        if !node.enabled && node.state != State::Inactive {
            node.state = State::Inactive;
            changed = true;
        }
    }
    changed
}

/// One-shot automatic enable when a node first becomes present.
fn apply_auto_up(graph: &mut Graph) -> bool {
    let mut changed = false;
    let ids: Vec<String> = graph.iter_order().map(|s| s.to_string()).collect();
    for id in ids {
        let node = graph.find_node_mut(&id).expect("known id");
        if node.enabled
            && node.auto_up
            && node.present
            && !node.auto_latched
            && node.state == State::Inactive
        {
            node.state = State::Waiting;
            node.auto_latched = true;
            changed = true;
        }
    }
    changed
}

/// Three-color DFS over `requires` edges restricted to enabled nodes. Any
/// enabled node reachable along a back edge is marked `Failed(Cycle)`.
/// Returns whether a cycle was found (and nodes marked).
fn detect_cycles(graph: &mut Graph) -> bool {
    let ids: Vec<String> = graph
        .nodes()
        .filter(|n| n.enabled)
        .map(|n| n.id.clone())
        .collect();

    let mut colors: HashMap<String, Color> = ids.iter().map(|id| (id.clone(), Color::White)).collect();
    let mut cyclic: Vec<String> = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    for start in &ids {
        if colors.get(start) == Some(&Color::White) {
            visit(graph, start, &mut colors, &mut stack, &mut cyclic);
        }
    }

    if cyclic.is_empty() {
        return false;
    }

    for id in cyclic {
        graph.mark_failed(&id, FailReason::Cycle);
    }
    true
}

/// DFS with an explicit recursion stack so that, on hitting a gray back
/// edge, the *entire* path from the ancestor to the current node (not just
/// its two endpoints) is marked cyclic — a requires-cycle of any length
/// must fail every enabled node on its closure (spec.md §8).
fn visit(
    graph: &Graph,
    id: &str,
    colors: &mut HashMap<String, Color>,
    stack: &mut Vec<String>,
    cyclic: &mut Vec<String>,
) {
    colors.insert(id.to_string(), Color::Gray);
    stack.push(id.to_string());

    let requires: Vec<String> = match graph.find_node(id) {
        Some(node) if node.enabled => node.requires.clone(),
        _ => Vec::new(),
    };

    for dep in requires {
        let Some(dep_node) = graph.find_node(&dep) else {
            continue;
        };
        if !dep_node.enabled {
            continue;
        }
        match colors.get(&dep).copied().unwrap_or(Color::White) {
            Color::White => visit(graph, &dep, colors, stack, cyclic),
            Color::Gray => {
                if let Some(pos) = stack.iter().position(|s| s == &dep) {
                    for node in &stack[pos..] {
                        if !cyclic.contains(node) {
                            cyclic.push(node.clone());
                        }
                    }
                }
            }
            Color::Black => {}
        }
    }

    stack.pop();
    colors.insert(id.to_string(), Color::Black);
}

/// Demotion, one-shot activation, and readiness, iterated until quiescent.
async fn run_fixpoint(graph: &mut Graph) -> bool {
    let mut changed = false;

    loop {
        let mut pass_changed = false;
        let ids: Vec<String> = graph.iter_order().map(|s| s.to_string()).collect();

        for id in &ids {
            let (state, signals_met) = {
                let node = graph.find_node(id).expect("known id");
                (node.state, node.signals_met())
            };

            if state == State::Active && !signals_met {
                let node = graph.find_node_mut(id).expect("known id");
                node.state = State::Waiting;
                pass_changed = true;
            }
        }

        for id in &ids {
            let (state, requires_met, activated) = {
                let node = graph.find_node(id).expect("known id");
                (node.state, requires_met(graph, node.requires.as_slice()), node.activated)
            };

            if state == State::Waiting && requires_met && !activated {
                let actions = graph.find_node(id).and_then(|n| n.actions.clone());
                let result = match actions {
                    Some(actions) => actions.activate(graph, id).await,
                    None => Ok(()),
                };
                match result {
                    Ok(()) => {
                        let node = graph.find_node_mut(id).expect("known id");
                        node.activated = true;
                    }
                    Err(err) => {
                        tracing::warn!(node = id.as_str(), error = %err, "activate failed");
                        graph.mark_failed(id, FailReason::Action);
                    }
                }
                pass_changed = true;
            }
        }

        for id in &ids {
            let (state, requires_met, signals_met) = {
                let node = graph.find_node(id).expect("known id");
                (node.state, requires_met(graph, node.requires.as_slice()), node.signals_met())
            };

            if state == State::Waiting && requires_met && signals_met {
                let node = graph.find_node_mut(id).expect("known id");
                node.state = State::Active;
                pass_changed = true;
            }
        }

        changed |= pass_changed;
        if !pass_changed {
            break;
        }
    }

    changed
}

fn requires_met(graph: &Graph, requires: &[String]) -> bool {
    requires
        .iter()
        .all(|id| matches!(graph.find_node(id), Some(n) if n.state == State::Active))
}

/// Pure projection of a node's current state. Never invents policy.
pub fn explain(graph: &Graph, node_id: &str) -> Explain {
    let Some(node) = graph.find_node(node_id) else {
        return Explain::None;
    };

    if !node.enabled {
        return Explain::Disabled;
    }
    if node.state == State::Failed {
        return Explain::Failed;
    }
    if node.state == State::Waiting {
        if let Some(blocking) = node
            .requires
            .iter()
            .find(|id| !matches!(graph.find_node(id), Some(n) if n.state == State::Active))
        {
            return Explain::Blocked(blocking.clone());
        }
        if let Some(name) = node.first_unmet_signal() {
            return Explain::Signal(name.to_string());
        }
    }
    Explain::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;

    fn enable(graph: &mut Graph, id: &str) {
        graph.enable_node(id).unwrap();
    }

    #[tokio::test]
    async fn single_ethernet_waits_on_signal_then_activates() {
        let mut g = Graph::new();
        g.add_node("eth0", Kind::Ethernet);
        g.add_signal("eth0", "carrier").unwrap();
        enable(&mut g, "eth0");

        evaluate(&mut g).await;
        assert_eq!(g.find_node("eth0").unwrap().state, State::Waiting);
        assert_eq!(explain(&g, "eth0"), Explain::Signal("carrier".to_string()));

        g.set_signal("eth0", "carrier", true).unwrap();
        evaluate(&mut g).await;
        assert_eq!(g.find_node("eth0").unwrap().state, State::Active);

        g.set_signal("eth0", "carrier", false).unwrap();
        evaluate(&mut g).await;
        assert_eq!(g.find_node("eth0").unwrap().state, State::Waiting);
    }

    #[tokio::test]
    async fn dependency_chain_blocks_on_disable() {
        let mut g = Graph::new();
        g.add_node("a", Kind::Ethernet);
        g.add_node("b", Kind::Ethernet);
        g.add_require("b", "a").unwrap();
        enable(&mut g, "a");
        enable(&mut g, "b");

        evaluate(&mut g).await;
        assert_eq!(g.find_node("a").unwrap().state, State::Active);
        assert_eq!(g.find_node("b").unwrap().state, State::Active);

        g.disable_node("a").await.unwrap();
        evaluate(&mut g).await;
        assert_eq!(g.find_node("a").unwrap().state, State::Inactive);
        assert_eq!(g.find_node("b").unwrap().state, State::Waiting);
        assert_eq!(explain(&g, "b"), Explain::Blocked("a".to_string()));
    }

    #[tokio::test]
    async fn requires_cycle_fails_both_nodes() {
        let mut g = Graph::new();
        g.add_node("a", Kind::Ethernet);
        g.add_node("b", Kind::Ethernet);
        g.add_require("a", "b").unwrap();
        g.add_require("b", "a").unwrap();
        enable(&mut g, "a");
        enable(&mut g, "b");

        evaluate(&mut g).await;
        assert_eq!(g.find_node("a").unwrap().state, State::Failed);
        assert_eq!(g.find_node("b").unwrap().state, State::Failed);
        assert_eq!(explain(&g, "a"), Explain::Failed);
    }

    #[tokio::test]
    async fn requires_cycle_fails_every_node_on_the_closure() {
        let mut g = Graph::new();
        g.add_node("a", Kind::Ethernet);
        g.add_node("b", Kind::Ethernet);
        g.add_node("c", Kind::Ethernet);
        g.add_require("a", "b").unwrap();
        g.add_require("b", "c").unwrap();
        g.add_require("c", "a").unwrap();
        enable(&mut g, "a");
        enable(&mut g, "b");
        enable(&mut g, "c");

        evaluate(&mut g).await;
        assert_eq!(g.find_node("a").unwrap().state, State::Failed);
        assert_eq!(g.find_node("b").unwrap().state, State::Failed);
        assert_eq!(g.find_node("c").unwrap().state, State::Failed);
    }

    #[test]
    fn setting_declared_signal_twice_same_value_is_not_changed() {
        let mut g = Graph::new();
        g.add_node("eth0", Kind::Ethernet);
        g.add_signal("eth0", "carrier").unwrap();
        assert!(!g.set_signal("eth0", "carrier", false).unwrap());
        assert!(g.set_signal("eth0", "carrier", true).unwrap());
        assert!(!g.set_signal("eth0", "carrier", true).unwrap());
    }

    #[tokio::test]
    async fn declaring_signal_without_setting_keeps_node_waiting() {
        let mut g = Graph::new();
        g.add_node("eth0", Kind::Ethernet);
        g.add_signal("eth0", "carrier").unwrap();
        enable(&mut g, "eth0");
        evaluate(&mut g).await;
        assert_eq!(g.find_node("eth0").unwrap().state, State::Waiting);
    }
}
