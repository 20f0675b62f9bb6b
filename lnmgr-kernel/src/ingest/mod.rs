pub mod nl80211;
pub mod rtnetlink;

/// A fact observed from the kernel, already resolved to a node id and the
/// signal names the graph understands. The reactor writes these onto the
/// graph; ingesters never touch the graph directly (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    LinkState {
        id: String,
        admin_up: bool,
        running: bool,
        carrier: bool,
    },
    LinkRemoved {
        id: String,
    },
    Wireless {
        id: String,
        signal: &'static str,
        value: bool,
    },
    /// The socket reported `ENOBUFS`; caller must resync and treat this
    /// wakeup as a change regardless of what else was observed.
    ResyncRequired,
}
