//! Bridge VLAN (`IFLA_AF_SPEC` / `AF_BRIDGE`) wire encoding.
//!
//! `rtnetlink`'s high-level builders don't cover per-port VLAN membership,
//! so these two calls go through a raw `RTM_SETLINK` request carrying a
//! `BRIDGE_VLAN_INFO` attribute, the same shape the kernel's `bridge vlan
//! add/del` tooling uses.

use futures::stream::StreamExt;
use netlink_packet_core::{NetlinkHeader, NetlinkMessage, NetlinkPayload, NLM_F_ACK, NLM_F_REQUEST};
use netlink_packet_route::link::af_spec::{AfSpecBridge, BridgeVlanInfo, BridgeVlanInfoFlags};
use netlink_packet_route::link::{LinkAttribute, LinkHeader, LinkMessage};
use netlink_packet_route::{AddressFamily, RouteNetlinkMessage};
use rtnetlink::Handle;

use crate::error::KernelError;

#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeVlanFlags {
    pub pvid: bool,
    pub untagged: bool,
}

impl BridgeVlanFlags {
    fn to_kernel_flags(self) -> BridgeVlanInfoFlags {
        let mut flags = BridgeVlanInfoFlags::empty();
        if self.pvid {
            flags |= BridgeVlanInfoFlags::Pvid;
        }
        if self.untagged {
            flags |= BridgeVlanInfoFlags::Untagged;
        }
        flags
    }
}

pub async fn set_bridge_vlan(
    handle: &Handle,
    port_index: u32,
    vid: u16,
    flags: BridgeVlanFlags,
) -> Result<(), KernelError> {
    let entry = BridgeVlanInfo {
        flags: flags.to_kernel_flags(),
        vid,
    };
    send(handle, port_index, vec![entry]).await
}

pub async fn del_bridge_vlan(handle: &Handle, port_index: u32, vid: u16) -> Result<(), KernelError> {
    let entry = BridgeVlanInfo {
        flags: BridgeVlanInfoFlags::empty(),
        vid,
    };
    send(handle, port_index, vec![entry]).await
}

async fn send(handle: &Handle, port_index: u32, vlans: Vec<BridgeVlanInfo>) -> Result<(), KernelError> {
    let mut link = LinkMessage::default();
    link.header = LinkHeader {
        interface_family: AddressFamily::Bridge,
        index: port_index,
        ..Default::default()
    };
    link.attributes.push(LinkAttribute::AfSpecBridge(AfSpecBridge::VlanInfo(vlans)));

    let mut req = NetlinkMessage::new(
        NetlinkHeader::default(),
        NetlinkPayload::from(RouteNetlinkMessage::SetLink(link)),
    );
    req.header.flags = NLM_F_REQUEST | NLM_F_ACK;
    req.finalize();

    let mut response = handle.request(req).map_err(|e| KernelError::Netlink(e.to_string()))?;
    while let Some(message) = response.next().await {
        if let NetlinkPayload::Error(err) = message.payload {
            if err.code.is_some() {
                return Err(KernelError::Netlink(format!("{err:?}")));
            }
        }
    }
    Ok(())
}
