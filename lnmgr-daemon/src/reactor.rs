//! Single-threaded reactor (spec.md §4.8). One task, no background
//! threads: every select arm below is a future driven on this task, and
//! the evaluator/subscriber-notify discipline ("at most once per wakeup")
//! falls out naturally from running exactly one arm per loop iteration.

use lnmgr_graph::{evaluator, Graph};
use lnmgr_kernel::ingest::nl80211::{self, Nl80211Ingester};
use lnmgr_kernel::ingest::rtnetlink::RtnetlinkIngester;
use lnmgr_kernel::IngestEvent;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};

use crate::control::{self, Exchange};
use crate::subscriber::Subscriber;

pub struct Reactor {
    graph: Graph,
    control: UnixListener,
    rtnetlink: RtnetlinkIngester,
    nl80211: Option<Nl80211Ingester>,
    subscribers: Vec<Subscriber>,
}

impl Reactor {
    pub fn new(
        graph: Graph,
        control: UnixListener,
        rtnetlink: RtnetlinkIngester,
        nl80211: Option<Nl80211Ingester>,
    ) -> Self {
        Reactor {
            graph,
            control,
            rtnetlink,
            nl80211,
            subscribers: Vec::new(),
        }
    }

    pub async fn run(mut self) {
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");

        // Initial dump so link-state signals reflect reality before the
        // first unsolicited event arrives.
        if let Ok(events) = self.rtnetlink.sync().await {
            self.apply_ingest_events(events);
        }
        self.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, shutting down");
                    break;
                }
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT, shutting down");
                    break;
                }

                event = self.rtnetlink.next_event() => {
                    match event {
                        Some(event) => {
                            let resync = matches!(event, IngestEvent::ResyncRequired);
                            self.apply_ingest_events(vec![event]);
                            if resync {
                                if let Ok(events) = self.rtnetlink.sync().await {
                                    self.apply_ingest_events(events);
                                }
                            }
                            self.tick().await;
                        }
                        None => {
                            tracing::warn!("rtnetlink connection closed");
                        }
                    }
                }

                raw = next_wireless_event(&mut self.nl80211) => {
                    if let Some(raw) = raw {
                        if let Some(ifname) = self.rtnetlink.resolve_ifname(raw.ifindex).await {
                            let events = nl80211::translate(raw.cmd, &ifname);
                            if !events.is_empty() {
                                self.apply_ingest_events(events);
                                self.tick().await;
                            }
                        }
                    } else {
                        tracing::warn!("nl80211 connection closed");
                        self.nl80211 = None;
                    }
                }

                accepted = self.control.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            match control::handle_connection(stream, &mut self.graph).await {
                                Exchange::Done { graph_changed } => {
                                    if graph_changed {
                                        self.tick().await;
                                    }
                                }
                                Exchange::Subscribed(subscriber) => {
                                    self.subscribers.push(subscriber);
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "control accept failed");
                        }
                    }
                }
            }
        }

        self.shutdown();
    }

    fn apply_ingest_events(&mut self, events: Vec<IngestEvent>) {
        for event in events {
            match event {
                IngestEvent::LinkState { id, admin_up, running, carrier } => {
                    let _ = self.graph.set_present(&id, true);
                    let _ = self.graph.set_link_admin_up(&id, admin_up);
                    let _ = self.graph.set_signal_if_declared(&id, "running", running);
                    let _ = self.graph.set_signal_if_declared(&id, "carrier", carrier);
                }
                IngestEvent::LinkRemoved { id } => {
                    let _ = self.graph.set_present(&id, false);
                    let _ = self.graph.set_link_admin_up(&id, false);
                    let _ = self.graph.set_signal_if_declared(&id, "running", false);
                    let _ = self.graph.set_signal_if_declared(&id, "carrier", false);
                }
                IngestEvent::Wireless { id, signal, value } => {
                    let _ = self.graph.set_signal_if_declared(&id, signal, value);
                }
                IngestEvent::ResyncRequired => {}
            }
        }
    }

    /// Runs the evaluator exactly once and, if anything changed, notifies
    /// every subscriber exactly once (spec.md §5).
    async fn tick(&mut self) {
        let changed = evaluator::evaluate(&mut self.graph).await;
        if !changed {
            return;
        }
        self.subscribers.retain_mut(|sub| sub.notify(&self.graph));
    }

    fn shutdown(self) {
        tracing::info!("reactor stopped, socket will be unlinked by main");
    }
}

/// Bridges the optional nl80211 ingester into `select!`: a live ingester
/// is polled for its next event; a missing one (no wireless family on this
/// kernel) contributes a branch that never wakes, so `select!` simply
/// never picks it instead of busy-looping.
async fn next_wireless_event(nl80211: &mut Option<Nl80211Ingester>) -> Option<nl80211::RawWirelessEvent> {
    match nl80211 {
        Some(ingester) => ingester.next_raw_event().await,
        None => std::future::pending().await,
    }
}
