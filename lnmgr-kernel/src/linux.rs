//! rtnetlink-backed `KernelAdapter`. Every call resolves the node id to an
//! ifindex first (links are looked up by name) and issues a single netlink
//! request; there is no caching, so this is a conversation per call, not a
//! persistent mirror — matching the façade the spec chooses over the two
//! competing paths in the original (`OPEN QUESTION (a)`).

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use netlink_packet_route::link::{
    InfoBridge, InfoData, InfoKind, LinkAttribute, LinkFlags, LinkInfo, LinkMessage,
};
use rtnetlink::{Handle, LinkBridge};

use crate::adapter::KernelAdapter;
use crate::error::KernelError;
use crate::vlan::{self, BridgeVlanFlags};

pub struct LinuxKernelAdapter {
    handle: Handle,
}

impl LinuxKernelAdapter {
    /// Opens a netlink route socket and spawns its I/O loop on the caller's
    /// runtime. Mirrors the connection setup in the reactor's rtnetlink
    /// ingester, but this handle is used for writes, not for event reads.
    pub fn new() -> Result<Self, KernelError> {
        let (connection, handle, _) =
            rtnetlink::new_connection().map_err(|e| KernelError::Netlink(e.to_string()))?;
        tokio::spawn(connection);
        Ok(LinuxKernelAdapter { handle })
    }

    async fn resolve(&self, name: &str) -> Result<LinkMessage, KernelError> {
        let mut links = self.handle.link().get().match_name(name.to_string()).execute();
        match links
            .try_next()
            .await
            .map_err(|e| KernelError::Netlink(e.to_string()))?
        {
            Some(link) => Ok(link),
            None => Err(KernelError::LinkNotFound(name.to_string())),
        }
    }

    async fn resolve_index(&self, name: &str) -> Result<u32, KernelError> {
        Ok(self.resolve(name).await?.header.index)
    }
}

#[async_trait]
impl KernelAdapter for LinuxKernelAdapter {
    async fn link_set_up(&self, id: &str) -> Result<(), KernelError> {
        let index = self.resolve_index(id).await?;
        self.handle
            .link()
            .set(index)
            .up()
            .execute()
            .await
            .map_err(|e| KernelError::Netlink(e.to_string()))
    }

    async fn link_set_down(&self, id: &str) -> Result<(), KernelError> {
        let index = self.resolve_index(id).await?;
        self.handle
            .link()
            .set(index)
            .down()
            .execute()
            .await
            .map_err(|e| KernelError::Netlink(e.to_string()))
    }

    async fn link_is_up(&self, id: &str) -> Result<bool, KernelError> {
        let link = self.resolve(id).await?;
        Ok(link.header.flags.contains(LinkFlags::Up))
    }

    async fn link_exists(&self, id: &str) -> Result<bool, KernelError> {
        match self.resolve(id).await {
            Ok(_) => Ok(true),
            Err(KernelError::LinkNotFound(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    async fn link_ifindex(&self, id: &str) -> Result<u32, KernelError> {
        self.resolve_index(id).await
    }

    async fn bridge_create(&self, id: &str) -> Result<(), KernelError> {
        if self.link_exists(id).await? {
            return Ok(());
        }
        self.handle
            .link()
            .add(LinkBridge::new(id).build())
            .execute()
            .await
            .map_err(|e| KernelError::Netlink(e.to_string()))
    }

    async fn bridge_set_vlan_filtering(&self, id: &str, on: bool) -> Result<(), KernelError> {
        let index = self.resolve_index(id).await?;
        let mut message = LinkBridge::new(id).build();
        message.header.index = index;
        for attr in &mut message.attributes {
            if let LinkAttribute::LinkInfo(infos) = attr {
                infos.push(LinkInfo::Kind(InfoKind::Bridge));
                infos.push(LinkInfo::Data(InfoData::Bridge(vec![InfoBridge::VlanFiltering(on)])));
            }
        }
        self.handle
            .link()
            .add(message)
            .replace()
            .execute()
            .await
            .map_err(|e| KernelError::Netlink(e.to_string()))
    }

    async fn bridge_add_port(&self, bridge_id: &str, port_id: &str) -> Result<(), KernelError> {
        let bridge_index = self.resolve_index(bridge_id).await?;
        let port_index = self.resolve_index(port_id).await?;
        self.handle
            .link()
            .set(port_index)
            .controller(bridge_index)
            .execute()
            .await
            .map_err(|e| KernelError::Netlink(e.to_string()))
    }

    async fn bridge_vlan_add(
        &self,
        _bridge_id: &str,
        port_id: &str,
        vid: u16,
        tagged: bool,
        pvid: bool,
    ) -> Result<(), KernelError> {
        let port_index = self.resolve_index(port_id).await?;
        vlan::set_bridge_vlan(
            &self.handle,
            port_index,
            vid,
            BridgeVlanFlags {
                pvid,
                untagged: !tagged,
            },
        )
        .await
    }

    async fn bridge_vlan_del(&self, _bridge_id: &str, port_id: &str, vid: u16) -> Result<(), KernelError> {
        let port_index = self.resolve_index(port_id).await?;
        vlan::del_bridge_vlan(&self.handle, port_index, vid).await
    }
}
