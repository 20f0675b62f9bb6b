use thiserror::Error;

/// Errors returned by fallible graph-store operations.
///
/// Misuse that a caller could have checked in advance (duplicate node ids,
/// mutating a node that was never created) is a programming error and
/// panics instead of appearing here — see the crate-level design notes.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum GraphError {
    #[error("unknown node id '{0}'")]
    UnknownNode(String),
}

/// A feature/topology operation declined to proceed. Carries no message —
/// the evaluator and compiler attach the reason (`FailReason`) to the node
/// itself; this type exists only to distinguish "ok" from "topology fail"
/// at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopologyFailure;

/// Error returned by a kind's `activate`/`deactivate` callback. The graph
/// crate does not know about kernel-level errors; implementers (in
/// `lnmgr-kernel`) convert their own error types into this one.
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct ActionError(pub String);

impl From<String> for ActionError {
    fn from(s: String) -> Self {
        ActionError(s)
    }
}

impl From<&str> for ActionError {
    fn from(s: &str) -> Self {
        ActionError(s.to_string())
    }
}
