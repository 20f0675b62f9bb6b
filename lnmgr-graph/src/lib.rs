//! In-memory dependency graph, evaluator, and status projector.
//!
//! This crate has no knowledge of the kernel or the wire protocol: it
//! defines the `NodeAction`/`CapabilityProbe` seams that `lnmgr-kernel`
//! implements, and is exercised entirely through `Graph` and `evaluate`.

pub mod error;
pub mod evaluator;
pub mod feature;
pub mod graph;
pub mod kind;
pub mod node;
pub mod status;

pub use error::{ActionError, GraphError, TopologyFailure};
pub use evaluator::{evaluate, explain};
pub use feature::{CapabilityProbe, Feature, FeatureTag};
pub use graph::Graph;
pub use kind::{lookup_kind, lookup_kind_by_name, Capabilities, Kind, KindInfo, SemanticType};
pub use node::{Explain, FailReason, Node, NodeAction, State, Topology, VlanEntry};
pub use status::{project, Code, Status};
