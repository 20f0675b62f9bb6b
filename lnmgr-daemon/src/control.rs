//! Control socket: one accepted connection, one protocol exchange (spec.md
//! §4.8 step 4). `SUBSCRIBE` is the one command that does not end the
//! exchange by closing the connection — it hands the stream to the
//! reactor's subscriber set instead.

use lnmgr_graph::{evaluator, kind, Graph};
use lnmgr_protocol::{parse_line, Command, DumpEntry, Reply, StatusEntry};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::subscriber::Subscriber;

/// Outcome of handling one accepted connection.
pub enum Exchange {
    /// The exchange is over; the connection was (or should be) closed.
    Done { graph_changed: bool },
    /// `SUBSCRIBE`: the connection is now owned by the subscriber set.
    Subscribed(Subscriber),
}

pub async fn handle_connection(stream: UnixStream, graph: &mut Graph) -> Exchange {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    let n = match reader.read_line(&mut line).await {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!(error = %e, "control connection read failed");
            return Exchange::Done { graph_changed: false };
        }
    };
    if n == 0 {
        return Exchange::Done { graph_changed: false };
    }

    let command = match parse_line(line.trim_end()) {
        Ok(c) => c,
        Err(e) => {
            let _ = write_line(&mut write_half, &Reply::error(e.to_string())).await;
            return Exchange::Done { graph_changed: false };
        }
    };

    match command {
        Command::Subscribe => {
            // `try_write`-based sends in `Subscriber` are the non-blocking
            // fd switch the spec describes; tokio's socket is already
            // edge-triggered, so there is no separate mode flip to make.
            let read_half = reader.into_inner();
            let stream = match read_half.reunite(write_half) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to reunite subscriber socket halves");
                    return Exchange::Done { graph_changed: false };
                }
            };
            Exchange::Subscribed(Subscriber::register(stream, graph))
        }
        Command::Hello => {
            let _ = write_line(&mut write_half, &Reply::hello()).await;
            Exchange::Done { graph_changed: false }
        }
        Command::Dump => {
            let nodes = graph
                .nodes()
                .map(|n| DumpEntry {
                    id: n.id.clone(),
                    kind: kind::lookup_kind(n.kind).config_name.to_string(),
                    enabled: n.enabled,
                    auto: n.auto_up,
                    requires: n.requires.clone(),
                    actions: n.actions.is_some(),
                })
                .collect();
            let _ = write_line(&mut write_half, &Reply::Dump { nodes }).await;
            Exchange::Done { graph_changed: false }
        }
        Command::Save => {
            let mut buf = Vec::new();
            let _ = graph.save_json(&mut buf);
            let _ = write_half.write_all(&buf).await;
            Exchange::Done { graph_changed: false }
        }
        Command::Status(None) => {
            let nodes = graph
                .nodes()
                .map(|n| {
                    let explain = evaluator::explain(graph, n.id.as_str());
                    let (state, code) = lnmgr_graph::project(&explain, n.link_admin_up);
                    StatusEntry { id: n.id.clone(), state, code }
                })
                .collect();
            let _ = write_line(&mut write_half, &Reply::StatusAll { nodes }).await;
            Exchange::Done { graph_changed: false }
        }
        Command::Status(Some(id)) => {
            let reply = match graph.find_node(&id) {
                Some(node) => {
                    let explain = evaluator::explain(graph, node.id.as_str());
                    let (state, code) = lnmgr_graph::project(&explain, node.link_admin_up);
                    Reply::StatusOne { id: node.id.clone(), state, code }
                }
                None => Reply::error(format!("unknown node '{id}'")),
            };
            let _ = write_line(&mut write_half, &reply).await;
            Exchange::Done { graph_changed: false }
        }
        Command::Signal { node, signal, value } => {
            let changed = graph.set_signal(&node, &signal, value).unwrap_or(false);
            let _ = write_line(&mut write_half, &Reply::Signal { id: node, signal, changed }).await;
            Exchange::Done { graph_changed: changed }
        }
    }
}

async fn write_line(stream: &mut (impl AsyncWriteExt + Unpin), reply: &Reply) -> std::io::Result<()> {
    let mut line = serde_json::to_string(reply).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    stream.write_all(line.as_bytes()).await
}
