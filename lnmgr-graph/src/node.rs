use std::sync::Arc;

use serde::Serialize;

use crate::error::ActionError;
use crate::feature::Feature;
use crate::graph::Graph;
use crate::kind::Kind;

/// Lifecycle state of a node (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Inactive,
    Waiting,
    Active,
    Failed,
}

/// Why a node last failed. Sticky until the node is disabled and re-enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailReason {
    None,
    Cycle,
    Action,
    Topology,
}

/// Structural reason a node is not `Active`. Pure projection of state —
/// never invents policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Explain {
    None,
    Disabled,
    Blocked(String),
    Signal(String),
    Failed,
}

/// A single resolved VLAN membership entry on a bridge or bridge port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VlanEntry {
    pub vid: u16,
    pub tagged: bool,
    pub pvid: bool,
    pub inherited: bool,
}

/// Topology derived by `prepare`; reset and recomputed every pass.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub master: Option<String>,
    pub slaves: Vec<String>,
    pub is_bridge: bool,
    pub is_bridge_port: bool,
    pub vlans: Vec<VlanEntry>,
}

/// Kind-specific activation/deactivation side effects (spec.md §4.6). The
/// graph crate only knows this trait exists; `lnmgr-kernel` supplies the
/// implementations that actually talk to rtnetlink. Async because a kernel
/// round-trip is genuinely async I/O in this stack; the reactor awaits it
/// inline, which is the single brief suspension the evaluator is allowed.
#[async_trait::async_trait]
pub trait NodeAction: Send + Sync {
    async fn activate(&self, graph: &Graph, node_id: &str) -> Result<(), ActionError>;
    async fn deactivate(&self, graph: &Graph, node_id: &str) -> Result<(), ActionError>;
}

/// A named boolean gate. Declared signals default to `false`; `set_signal`
/// on an undeclared name creates one (spec.md §4.2).
#[derive(Debug, Clone)]
pub(crate) struct SignalSlot {
    pub name: String,
    pub value: bool,
}

pub struct Node {
    pub id: String,
    pub kind: Kind,
    pub enabled: bool,
    pub auto_up: bool,
    pub state: State,
    pub activated: bool,
    pub auto_latched: bool,
    pub present: bool,
    pub fail_reason: FailReason,
    /// Raw kernel admin-up state for link-backed nodes, fed by the
    /// rtnetlink ingester. Distinct from `enabled`/signals: it never gates
    /// activation, only the status projector's `admin_up` input (spec.md
    /// §4.5, Open Question (b)). Defaults true for nodes with no kernel
    /// link backing it.
    pub link_admin_up: bool,
    pub requires: Vec<String>,
    pub(crate) signals: Vec<SignalSlot>,
    pub features: Vec<Feature>,
    pub topology: Topology,
    pub actions: Option<Arc<dyn NodeAction>>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: Kind) -> Self {
        Node {
            id: id.into(),
            kind,
            enabled: false,
            auto_up: false,
            state: State::Inactive,
            activated: false,
            auto_latched: false,
            present: false,
            fail_reason: FailReason::None,
            link_admin_up: true,
            requires: Vec::new(),
            signals: Vec::new(),
            features: Vec::new(),
            topology: Topology::default(),
            actions: None,
        }
    }

    /// Every signal currently attached to this node reads true.
    pub fn signals_met(&self) -> bool {
        self.signals.iter().all(|s| s.value)
    }

    pub fn signal_value(&self, name: &str) -> Option<bool> {
        self.signals.iter().find(|s| s.name == name).map(|s| s.value)
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(|s| s.name.as_str())
    }

    pub fn first_unmet_signal(&self) -> Option<&str> {
        self.signals
            .iter()
            .find(|s| !s.value)
            .map(|s| s.name.as_str())
    }
}
