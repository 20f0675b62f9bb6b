//! Platform capability probe wired into `lnmgr_config::prepare` (spec.md
//! §4.3 phase 4). Bridging and 802.1Q VLAN filtering have been mainline
//! since long-supported kernels; the probe exists as a seam, not because
//! either capability is commonly absent.

use lnmgr_graph::CapabilityProbe;

pub struct RuntimeCapabilityProbe;

impl CapabilityProbe for RuntimeCapabilityProbe {
    fn supports_vlan_filtering(&self) -> bool {
        std::path::Path::new("/sys/class/net").is_dir()
    }

    fn supports_bridging(&self) -> bool {
        std::path::Path::new("/sys/class/net").is_dir()
    }
}
