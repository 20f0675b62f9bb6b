//! Link-state ingester (spec.md §4.7). Binds `RTMGRP_LINK`, translates
//! `RTM_NEWLINK`/`RTM_DELLINK` into `admin_up`/`running`/`carrier` signal
//! writes, and resyncs via a full dump on `ENOBUFS`.

use futures::stream::TryStreamExt;
use netlink_packet_route::link::{LinkAttribute, LinkFlags};
use netlink_packet_route::RouteNetlinkMessage;
use netlink_sys::{AsyncSocket, SocketAddr};
use rtnetlink::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::KernelError;
use crate::ingest::IngestEvent;

const RTNLGRP_LINK: u32 = 1;

pub struct RtnetlinkIngester {
    handle: Handle,
    events: UnboundedReceiver<(
        netlink_packet_core::NetlinkMessage<RouteNetlinkMessage>,
        SocketAddr,
    )>,
}

impl RtnetlinkIngester {
    pub async fn new() -> Result<Self, KernelError> {
        let (connection, handle, events) =
            rtnetlink::new_connection().map_err(|e| KernelError::Netlink(e.to_string()))?;
        connection
            .socket_ref()
            .add_membership(RTNLGRP_LINK)
            .map_err(|e| KernelError::Netlink(e.to_string()))?;
        tokio::spawn(connection);
        Ok(RtnetlinkIngester { handle, events })
    }

    /// Full `RTM_GETLINK` dump, drained to `NLMSG_DONE`. Returns one
    /// `LinkState` event per interface found; the caller folds these into
    /// graph signal writes.
    pub async fn sync(&self) -> Result<Vec<IngestEvent>, KernelError> {
        let mut stream = self.handle.link().get().execute();
        let mut out = Vec::new();
        while let Some(link) = stream
            .try_next()
            .await
            .map_err(|e| KernelError::Netlink(e.to_string()))?
        {
            if let Some(event) = link_to_event(&link) {
                out.push(event);
            }
        }
        Ok(out)
    }

    /// Resolves an interface index to its name, for ingesters (nl80211)
    /// whose events only carry an ifindex. `None` if the link is gone or
    /// the lookup fails.
    pub async fn resolve_ifname(&self, ifindex: u32) -> Option<String> {
        let mut stream = self.handle.link().get().match_index(ifindex).execute();
        let link = stream.try_next().await.ok().flatten()?;
        interface_name(&link)
    }

    /// Waits for and translates the next unsolicited `RTM_NEWLINK` /
    /// `RTM_DELLINK`. Returns `None` once the connection has closed.
    pub async fn next_event(&mut self) -> Option<IngestEvent> {
        let (message, _addr) = self.events.recv().await?;
        match message.payload {
            netlink_packet_core::NetlinkPayload::InnerMessage(RouteNetlinkMessage::NewLink(link)) => {
                link_to_event(&link)
            }
            netlink_packet_core::NetlinkPayload::InnerMessage(RouteNetlinkMessage::DelLink(link)) => {
                interface_name(&link).map(|id| IngestEvent::LinkRemoved { id })
            }
            _ => None,
        }
    }
}

fn interface_name(link: &netlink_packet_route::link::LinkMessage) -> Option<String> {
    link.attributes.iter().find_map(|attr| match attr {
        LinkAttribute::IfName(name) => Some(name.clone()),
        _ => None,
    })
}

fn link_to_event(link: &netlink_packet_route::link::LinkMessage) -> Option<IngestEvent> {
    let id = interface_name(link)?;
    let flags = link.header.flags;
    Some(IngestEvent::LinkState {
        id,
        admin_up: flags.contains(LinkFlags::Up),
        running: flags.contains(LinkFlags::Running),
        carrier: flags.contains(LinkFlags::LowerUp),
    })
}
