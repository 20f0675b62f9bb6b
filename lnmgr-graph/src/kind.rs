//! Static kind registry (spec.md §4.1).
//!
//! `Kind` is the concrete implementation kind a node is declared with in
//! config (`ethernet`, `bridge`, ...). Every kind belongs to exactly one
//! `SemanticType` and carries a `Capabilities` bitset. The table below is
//! the single source of truth; everything else (config loader, status
//! projector, action dispatch) looks kinds up through it rather than
//! matching on `Kind` directly.

use bitflags::bitflags;

bitflags! {
    /// Capability flags a kind may advertise.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const HAS_PORTS   = 0b0000_0001;
        const HAS_VLANS   = 0b0000_0010;
        const HAS_IP      = 0b0000_0100;
        const PRODUCES_L2 = 0b0000_1000;
        const PRODUCES_L3 = 0b0001_0000;
    }
}

/// The semantic type a kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Link,
    L2Aggregate,
    L3Network,
    Service,
}

/// Concrete node kinds in scope for the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Ethernet,
    Wifi,
    DsaPort,
    Bridge,
    Bond,
    Ipv4Network,
    DhcpClient,
}

#[derive(Debug, Clone, Copy)]
pub struct KindInfo {
    pub kind: Kind,
    pub semantic_type: SemanticType,
    pub config_name: &'static str,
    pub flags: Capabilities,
}

const KIND_TABLE: &[KindInfo] = &[
    KindInfo {
        kind: Kind::Ethernet,
        semantic_type: SemanticType::Link,
        config_name: "ethernet",
        flags: Capabilities::PRODUCES_L2,
    },
    KindInfo {
        kind: Kind::Wifi,
        semantic_type: SemanticType::Link,
        config_name: "wifi",
        flags: Capabilities::PRODUCES_L2,
    },
    KindInfo {
        kind: Kind::DsaPort,
        semantic_type: SemanticType::Link,
        config_name: "dsa-port",
        flags: Capabilities::PRODUCES_L2,
    },
    KindInfo {
        kind: Kind::Bridge,
        semantic_type: SemanticType::L2Aggregate,
        config_name: "bridge",
        flags: Capabilities::from_bits_truncate(
            Capabilities::HAS_PORTS.bits() | Capabilities::HAS_VLANS.bits() | Capabilities::PRODUCES_L2.bits(),
        ),
    },
    KindInfo {
        kind: Kind::Bond,
        semantic_type: SemanticType::L2Aggregate,
        config_name: "bond",
        flags: Capabilities::from_bits_truncate(
            Capabilities::HAS_PORTS.bits() | Capabilities::PRODUCES_L2.bits(),
        ),
    },
    KindInfo {
        kind: Kind::Ipv4Network,
        semantic_type: SemanticType::L3Network,
        config_name: "ipv4",
        flags: Capabilities::from_bits_truncate(
            Capabilities::HAS_IP.bits() | Capabilities::PRODUCES_L3.bits(),
        ),
    },
    KindInfo {
        kind: Kind::DhcpClient,
        semantic_type: SemanticType::Service,
        config_name: "dhcp-client",
        flags: Capabilities::HAS_IP,
    },
];

/// Look up a kind's static info by its enum tag. Panics if a kind was added
/// to `Kind` without a matching `KIND_TABLE` row — a build-time bug, not a
/// runtime condition.
pub fn lookup_kind(kind: Kind) -> &'static KindInfo {
    KIND_TABLE
        .iter()
        .find(|info| info.kind == kind)
        .expect("kind missing from KIND_TABLE")
}

/// Look up a kind's static info by its config-file name (e.g. `"bridge"`).
pub fn lookup_kind_by_name(name: &str) -> Option<&'static KindInfo> {
    KIND_TABLE.iter().find(|info| info.config_name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_table_row() {
        for kind in [
            Kind::Ethernet,
            Kind::Wifi,
            Kind::DsaPort,
            Kind::Bridge,
            Kind::Bond,
            Kind::Ipv4Network,
            Kind::DhcpClient,
        ] {
            lookup_kind(kind);
        }
    }

    #[test]
    fn bridge_has_ports_and_vlans() {
        let info = lookup_kind(Kind::Bridge);
        assert!(info.flags.contains(Capabilities::HAS_PORTS));
        assert!(info.flags.contains(Capabilities::HAS_VLANS));
    }

    #[test]
    fn lookup_by_name_roundtrips() {
        let info = lookup_kind_by_name("bridge").unwrap();
        assert_eq!(info.kind, Kind::Bridge);
        assert!(lookup_kind_by_name("no-such-kind").is_none());
    }
}
