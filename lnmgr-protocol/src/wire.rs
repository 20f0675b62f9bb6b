//! JSON wire shapes exchanged over the control socket (spec.md §4.9, §6).
//! These are constructed by `lnmgr-daemon` from `Graph`/`Status`/`Code` data
//! and serialized with `serde_json`; this crate has no knowledge of the
//! socket itself.

use std::collections::BTreeMap;

use lnmgr_graph::{Code, Status};
use serde::Serialize;

pub const PROTOCOL_VERSION: u32 = 1;

pub fn supported_features() -> Vec<&'static str> {
    vec!["status", "dump", "save", "subscribe"]
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub id: String,
    pub state: Status,
    pub code: Code,
}

#[derive(Debug, Clone, Serialize)]
pub struct DumpEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub enabled: bool,
    pub auto: bool,
    pub requires: Vec<String>,
    pub actions: bool,
}

/// Replies to a single command (spec.md §4.9). Every variant carries its
/// own `type` discriminator; two variants may share the discriminator
/// (`StatusAll`/`StatusOne` both serialize as `"status"`) since only one is
/// ever constructed per reply.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Reply {
    Hello {
        version: u32,
        features: Vec<String>,
    },
    #[serde(rename = "status")]
    StatusAll {
        nodes: Vec<StatusEntry>,
    },
    #[serde(rename = "status")]
    StatusOne {
        id: String,
        state: Status,
        code: Code,
    },
    Dump {
        nodes: Vec<DumpEntry>,
    },
    Signal {
        id: String,
        signal: String,
        changed: bool,
    },
    Error {
        message: String,
    },
}

impl Reply {
    pub fn hello() -> Self {
        Reply::Hello {
            version: PROTOCOL_VERSION,
            features: supported_features().into_iter().map(String::from).collect(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error { message: message.into() }
    }
}

/// Per-node payload for the `snapshot` list (spec.md §6): `{id, state,
/// type, code, signals}`.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: String,
    pub state: Status,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: Code,
    pub signals: BTreeMap<String, bool>,
}

/// Per-node payload for a single `event` (spec.md §6): `{id, state, code,
/// signals}`. Unlike `NodeSnapshot` this carries no `kind`/`type` field —
/// flattened into the internally-tagged `Notification` envelope, a second
/// `type` field here would collide with the envelope's own discriminator.
#[derive(Debug, Clone, Serialize)]
pub struct EventSnapshot {
    pub id: String,
    pub state: Status,
    pub code: Code,
    pub signals: BTreeMap<String, bool>,
}

impl From<NodeSnapshot> for EventSnapshot {
    fn from(snapshot: NodeSnapshot) -> Self {
        EventSnapshot {
            id: snapshot.id,
            state: snapshot.state,
            code: snapshot.code,
            signals: snapshot.signals,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Notification {
    Snapshot { nodes: Vec<NodeSnapshot> },
    Event(EventSnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_reply_serializes_with_type_tag() {
        let json = serde_json::to_string(&Reply::hello()).unwrap();
        assert!(json.contains("\"type\":\"hello\""));
        assert!(json.contains("\"version\":1"));
    }

    #[test]
    fn status_all_and_status_one_share_discriminator() {
        let all = serde_json::to_string(&Reply::StatusAll { nodes: vec![] }).unwrap();
        let one = serde_json::to_string(&Reply::StatusOne {
            id: "eth0".to_string(),
            state: Status::Up,
            code: Code::None,
        })
        .unwrap();
        assert!(all.contains("\"type\":\"status\""));
        assert!(one.contains("\"type\":\"status\""));
        assert!(one.contains("\"id\":\"eth0\""));
    }

    #[test]
    fn event_serializes_flattened_into_node_fields() {
        let event = Notification::Event(EventSnapshot {
            id: "eth0".to_string(),
            state: Status::Up,
            code: Code::None,
            signals: BTreeMap::new(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"event\""));
        assert!(json.contains("\"id\":\"eth0\""));
    }

    #[test]
    fn event_has_exactly_one_type_key() {
        let event = Notification::Event(EventSnapshot {
            id: "eth0".to_string(),
            state: Status::Up,
            code: Code::None,
            signals: BTreeMap::new(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json.matches("\"type\"").count(), 1);
    }
}
