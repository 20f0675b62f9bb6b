//! Wireless-event ingester (spec.md §4.7). Resolves the `nl80211`
//! generic-netlink family, discovers its `mlme`/`ap` multicast group ids
//! from the same `CTRL_CMD_GETFAMILY` reply, and joins both groups on a
//! dedicated generic-netlink socket. No crate in this workspace's stack
//! carries typed nl80211 attribute definitions (`netlink-packet-generic`
//! only models the `ctrl` family), so notifications are hand-parsed the
//! way `signal_nl80211.c`'s `nla_ok`/`nla_next` walk does.

use std::collections::HashMap;

use genetlink::new_connection;
use netlink_packet_core::NetlinkPayload;
use netlink_packet_generic::ctrl::nlas::{GenlCtrlAttrs, McastGrpAttrs};
use netlink_packet_generic::ctrl::{GenlCtrl, GenlCtrlCmd};
use netlink_packet_generic::GenlMessage;
use netlink_sys::{constants::NETLINK_GENERIC, AsyncSocket, SocketAddr, TokioSocket};

use crate::error::KernelError;
use crate::ingest::IngestEvent;

const NL80211_CMD_START_AP: u8 = 15;
const NL80211_CMD_STOP_AP: u8 = 16;
const NL80211_CMD_CONNECT: u8 = 46;
const NL80211_CMD_DISCONNECT: u8 = 48;
const NL80211_ATTR_IFINDEX: u16 = 3;

/// One raw wireless notification: a generic-netlink command plus the
/// ifindex it was reported against. The reactor resolves the ifindex to
/// an interface name (via the rtnetlink ingester) before calling
/// `translate`, since this module has no link-name cache of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawWirelessEvent {
    pub cmd: u8,
    pub ifindex: u32,
}

pub struct Nl80211Ingester {
    family_id: u16,
    socket: TokioSocket,
}

impl Nl80211Ingester {
    pub async fn new() -> Result<Self, KernelError> {
        let (connection, _handle, _events) =
            new_connection().map_err(|e| KernelError::Netlink(e.to_string()))?;
        let (family_id, groups) = resolve_family(&connection, "nl80211")
            .await
            .ok_or_else(|| KernelError::Unsupported("nl80211 family not present".to_string()))?;

        let mut socket =
            TokioSocket::new(NETLINK_GENERIC).map_err(|e| KernelError::Netlink(e.to_string()))?;
        socket
            .bind(&SocketAddr::new(0, 0))
            .map_err(|e| KernelError::Netlink(e.to_string()))?;
        for group_name in ["mlme", "ap"] {
            if let Some(group_id) = groups.get(group_name) {
                socket
                    .add_membership(*group_id)
                    .map_err(|e| KernelError::Netlink(e.to_string()))?;
            }
        }

        Ok(Nl80211Ingester { family_id, socket })
    }

    pub fn family_id(&self) -> u16 {
        self.family_id
    }

    /// Waits for the next nl80211 notification addressed to this family,
    /// discarding anything else arriving on the socket.
    pub async fn next_raw_event(&mut self) -> Option<RawWirelessEvent> {
        let mut buf = vec![0u8; 8192];
        loop {
            let n = self.socket.recv(&mut buf).await.ok()?;
            if let Some(event) = parse_datagram(&buf[..n], self.family_id) {
                return Some(event);
            }
        }
    }

}

/// Translates one raw generic-netlink command into the graph-facing events
/// it implies, scoped to the resolved interface name. `CONNECT`/
/// `DISCONNECT` each produce two signals (`associated` and `connected`);
/// every other recognized command produces one.
pub fn translate(cmd: u8, ifname: &str) -> Vec<IngestEvent> {
    match cmd {
        NL80211_CMD_START_AP => vec![wireless(ifname, "beaconing", true)],
        NL80211_CMD_STOP_AP => vec![wireless(ifname, "beaconing", false)],
        NL80211_CMD_CONNECT => vec![
            wireless(ifname, "associated", true),
            wireless(ifname, "connected", true),
        ],
        NL80211_CMD_DISCONNECT => vec![
            wireless(ifname, "associated", false),
            wireless(ifname, "connected", false),
        ],
        _ => Vec::new(),
    }
}

fn wireless(ifname: &str, signal: &'static str, value: bool) -> IngestEvent {
    IngestEvent::Wireless {
        id: ifname.to_string(),
        signal,
        value,
    }
}

/// Resolves the nl80211 family id and its multicast group name→id table
/// from one `CTRL_CMD_GETFAMILY` round-trip.
async fn resolve_family(
    connection: &genetlink::GenericConnection,
    name: &str,
) -> Option<(u16, HashMap<String, u32>)> {
    let mut message = GenlMessage::from_payload(GenlCtrl {
        cmd: GenlCtrlCmd::GetFamily,
        nlas: vec![GenlCtrlAttrs::FamilyName(name.to_string())],
    });
    message.set_resolved_family_id(netlink_packet_generic::ctrl::GENL_ID_CTRL);
    let response = connection.clone().request(message).await.ok()?;

    let mut family_id = None;
    let mut groups = HashMap::new();
    for msg in response {
        if let NetlinkPayload::InnerMessage(reply) = msg.payload {
            for nla in &reply.payload.nlas {
                match nla {
                    GenlCtrlAttrs::FamilyId(id) => family_id = Some(*id),
                    GenlCtrlAttrs::McastGroups(grps) => {
                        for grp in grps {
                            let mut grp_name = None;
                            let mut grp_id = None;
                            for attr in grp {
                                match attr {
                                    McastGrpAttrs::Name(n) => grp_name = Some(n.clone()),
                                    McastGrpAttrs::Id(id) => grp_id = Some(*id),
                                    _ => {}
                                }
                            }
                            if let (Some(n), Some(id)) = (grp_name, grp_id) {
                                groups.insert(n, id);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    family_id.map(|id| (id, groups))
}

/// Hand-parses one datagram: `nlmsghdr` (16 bytes) + `genlmsghdr` (4 bytes)
/// + a TLV attribute list, looking for `NL80211_ATTR_IFINDEX`. Mirrors
/// `signal_nl80211.c`'s `nla_ok`/`nla_next`/`nla_get_u32`.
fn parse_datagram(buf: &[u8], family_id: u16) -> Option<RawWirelessEvent> {
    const NLMSG_HDR_LEN: usize = 16;
    const GENL_HDR_LEN: usize = 4;

    if buf.len() < NLMSG_HDR_LEN + GENL_HDR_LEN {
        return None;
    }
    let nlmsg_len = u32::from_ne_bytes(buf[0..4].try_into().ok()?) as usize;
    let nlmsg_type = u16::from_ne_bytes(buf[4..6].try_into().ok()?);
    if nlmsg_type != family_id || nlmsg_len < NLMSG_HDR_LEN + GENL_HDR_LEN || nlmsg_len > buf.len() {
        return None;
    }

    let cmd = buf[NLMSG_HDR_LEN];
    let mut rem = &buf[NLMSG_HDR_LEN + GENL_HDR_LEN..nlmsg_len];
    let mut ifindex = None;

    while rem.len() >= 4 {
        let attr_len = u16::from_ne_bytes(rem[0..2].try_into().ok()?) as usize;
        let attr_type = u16::from_ne_bytes(rem[2..4].try_into().ok()?) & 0x3fff;
        if attr_len < 4 || attr_len > rem.len() {
            break;
        }
        if attr_type == NL80211_ATTR_IFINDEX && attr_len >= 8 {
            ifindex = Some(u32::from_ne_bytes(rem[4..8].try_into().ok()?));
        }
        let aligned = (attr_len + 3) & !3;
        if aligned == 0 || aligned >= rem.len() {
            break;
        }
        rem = &rem[aligned..];
    }

    ifindex.map(|ifindex| RawWirelessEvent { cmd, ifindex })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_attr(buf: &mut Vec<u8>, attr_type: u16, value: &[u8]) {
        let attr_len = (4 + value.len()) as u16;
        buf.extend_from_slice(&attr_len.to_ne_bytes());
        buf.extend_from_slice(&attr_type.to_ne_bytes());
        buf.extend_from_slice(value);
        let padding = (4 - (value.len() % 4)) % 4;
        buf.extend(std::iter::repeat(0u8).take(padding));
    }

    fn build_datagram(family_id: u16, cmd: u8, ifindex: u32) -> Vec<u8> {
        let mut attrs = Vec::new();
        push_attr(&mut attrs, NL80211_ATTR_IFINDEX, &ifindex.to_ne_bytes());

        let total_len = 16 + 4 + attrs.len();
        let mut buf = Vec::new();
        buf.extend_from_slice(&(total_len as u32).to_ne_bytes());
        buf.extend_from_slice(&family_id.to_ne_bytes());
        buf.extend_from_slice(&0u16.to_ne_bytes());
        buf.extend_from_slice(&0u32.to_ne_bytes());
        buf.extend_from_slice(&0u32.to_ne_bytes());
        buf.push(cmd);
        buf.push(1);
        buf.extend_from_slice(&0u16.to_ne_bytes());
        buf.extend_from_slice(&attrs);
        buf
    }

    #[test]
    fn parses_ifindex_out_of_connect_event() {
        let datagram = build_datagram(42, NL80211_CMD_CONNECT, 7);
        let event = parse_datagram(&datagram, 42).unwrap();
        assert_eq!(event.cmd, NL80211_CMD_CONNECT);
        assert_eq!(event.ifindex, 7);
    }

    #[test]
    fn ignores_datagram_for_a_different_family() {
        let datagram = build_datagram(42, NL80211_CMD_CONNECT, 7);
        assert!(parse_datagram(&datagram, 99).is_none());
    }

    #[test]
    fn connect_emits_associated_and_connected() {
        let events = translate(NL80211_CMD_CONNECT, "wlan0");
        assert_eq!(
            events,
            vec![
                IngestEvent::Wireless { id: "wlan0".to_string(), signal: "associated", value: true },
                IngestEvent::Wireless { id: "wlan0".to_string(), signal: "connected", value: true },
            ]
        );
    }

    #[test]
    fn disconnect_emits_associated_and_connected_false() {
        let events = translate(NL80211_CMD_DISCONNECT, "wlan0");
        assert_eq!(
            events,
            vec![
                IngestEvent::Wireless { id: "wlan0".to_string(), signal: "associated", value: false },
                IngestEvent::Wireless { id: "wlan0".to_string(), signal: "connected", value: false },
            ]
        );
    }

    #[test]
    fn start_ap_emits_beaconing() {
        let events = translate(NL80211_CMD_START_AP, "wlan0");
        assert_eq!(events, vec![IngestEvent::Wireless { id: "wlan0".to_string(), signal: "beaconing", value: true }]);
    }
}
