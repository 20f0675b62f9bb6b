//! Subscriber fan-out (spec.md §4.9). Each subscriber owns a non-blocking
//! control-socket connection plus a mirror of the last `{status, code,
//! signals}` it was sent; the mirror is only advanced on a successful
//! write (spec.md §9 Open Question (d)), so a stalled subscriber catches
//! up on its next readable tick instead of silently missing a transition.

use std::collections::BTreeMap;
use std::io::ErrorKind;

use lnmgr_graph::{evaluator, kind, Code, Graph, Status};
use lnmgr_protocol::{EventSnapshot, NodeSnapshot, Notification};
use tokio::net::UnixStream;

struct Mirror {
    status: Status,
    code: Code,
    signals: BTreeMap<String, bool>,
}

pub struct Subscriber {
    stream: UnixStream,
    mirrors: std::collections::HashMap<String, Mirror>,
    alive: bool,
}

impl Subscriber {
    /// Sends the initial snapshot and registers. A partial write (`EAGAIN`)
    /// is tolerated and still registers the subscriber — a stale mirror
    /// is corrected by the first post-evaluator notify.
    pub fn register(stream: UnixStream, graph: &Graph) -> Self {
        let mut sub = Subscriber {
            stream,
            mirrors: std::collections::HashMap::new(),
            alive: true,
        };
        let nodes: Vec<NodeSnapshot> = graph.nodes().map(|n| node_snapshot(graph, n.id.as_str())).collect();
        let wrote = sub.try_write(&Notification::Snapshot { nodes: nodes.clone() });
        if wrote {
            for snapshot in nodes {
                sub.mirrors.insert(
                    snapshot.id.clone(),
                    Mirror {
                        status: snapshot.state,
                        code: snapshot.code,
                        signals: snapshot.signals,
                    },
                );
            }
        }
        sub
    }

    /// Diffs every node against this subscriber's mirror and emits one
    /// `event` per node whose `{status, code}` or any signal changed.
    /// Returns `false` if the connection died (`EPIPE`/`ECONNRESET`) and
    /// should be dropped.
    pub fn notify(&mut self, graph: &Graph) -> bool {
        for node in graph.nodes() {
            let current = node_snapshot(graph, node.id.as_str());
            let changed = match self.mirrors.get(&current.id) {
                Some(mirror) => {
                    mirror.status != current.state || mirror.code != current.code || mirror.signals != current.signals
                }
                None => true,
            };
            if !changed {
                continue;
            }
            if !self.try_write(&Notification::Event(EventSnapshot::from(current.clone()))) {
                continue;
            }
            self.mirrors.insert(
                current.id.clone(),
                Mirror {
                    status: current.state,
                    code: current.code,
                    signals: current.signals,
                },
            );
        }
        self.alive
    }

    fn try_write(&mut self, payload: &Notification) -> bool {
        let mut line = match serde_json::to_string(payload) {
            Ok(s) => s,
            Err(_) => return false,
        };
        line.push('\n');
        match self.stream.try_write(line.as_bytes()) {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                // EAGAIN: best-effort, mirror stays stale, subscriber stays registered.
                false
            }
            Err(_) => {
                // EPIPE / ECONNRESET and friends: the subscriber is gone.
                self.alive = false;
                false
            }
        }
    }
}

fn node_snapshot(graph: &Graph, id: &str) -> NodeSnapshot {
    let node = graph.find_node(id).expect("iterated from graph");
    let explain = evaluator::explain(graph, id);
    let (status, code) = lnmgr_graph::project(&explain, node.link_admin_up);
    let kind_name = kind::lookup_kind(node.kind).config_name.to_string();
    let signals = node
        .signal_names()
        .map(|name| (name.to_string(), node.signal_value(name).unwrap_or(false)))
        .collect();
    NodeSnapshot {
        id: node.id.clone(),
        state: status,
        kind: kind_name,
        code,
        signals,
    }
}
