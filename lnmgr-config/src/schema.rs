//! Config file schema (spec.md §6). Deserialized with `serde_json`; the
//! token-level JSON grammar itself is out of scope — this is just the
//! typed shape the loader walks.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub version: u32,
    #[serde(default)]
    pub flush: bool,
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub signals: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    pub master: Option<String>,
    #[serde(default)]
    pub bridge: Option<BridgeSpec>,
    #[serde(default)]
    pub port: Option<PortSpec>,
    pub vlan: Option<VlanDomainSpec>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BridgeSpec {
    #[serde(default)]
    pub vlan_filtering: bool,
    #[serde(default)]
    pub vlans: Vec<VlanSpec>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PortSpec {
    #[serde(default)]
    pub vlans: Vec<VlanSpec>,
}

#[derive(Debug, Deserialize)]
pub struct VlanSpec {
    pub vid: u16,
    #[serde(default)]
    pub tagged: bool,
    #[serde(default)]
    pub pvid: bool,
}

#[derive(Debug, Deserialize)]
pub struct VlanDomainSpec {
    pub vid: u16,
}
