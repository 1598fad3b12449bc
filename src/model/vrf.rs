//! VRF resource type and its template configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use super::attachment::Attachment;

/// Lowest VRF id the controller accepts.
pub const MIN_VRF_ID: u32 = 1;

/// Highest VRF id the controller accepts.
pub const MAX_VRF_ID: u32 = 16_777_214;

/// Lowest usable VLAN id.
pub const MIN_VLAN_ID: u16 = 2;

/// Highest usable VLAN id.
pub const MAX_VLAN_ID: u16 = 4094;

/// Template used for new VRFs when the task names none.
pub const DEFAULT_VRF_TEMPLATE: &str = "Default_VRF_Universal";

/// Extension template used for new VRFs when the task names none.
pub const DEFAULT_VRF_EXTENSION_TEMPLATE: &str = "Default_VRF_Extension_Universal";

const DEFAULT_ROUTE_TAG: u32 = 12345;
const DEFAULT_MTU: u32 = 9216;
const DEFAULT_MAX_BGP_PATHS: u32 = 1;
const DEFAULT_MAX_IBGP_PATHS: u32 = 2;

/// Template-config keys owned by the VRF itself rather than the bag.
const RESERVED_TEMPLATE_KEYS: &[&str] = &["vrfName", "vrfVlanId"];

/// A VRF as declared in a task or reported by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vrf {
    /// Fabric the VRF lives in.
    pub fabric: String,
    /// VRF name, unique within the fabric.
    pub vrf_name: String,
    /// Numeric VRF id (L3 VNI). `None` lets the controller allocate one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf_id: Option<u32>,
    /// VRF VLAN id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u16>,
    /// VRF template name.
    pub vrf_template: String,
    /// VRF extension template name.
    pub vrf_extension_template: String,
    /// Service VRF template name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_vrf_template: Option<String>,
    /// Template parameters.
    pub template_config: VrfTemplateConfig,
    /// Controller-reported deployment status.
    pub status: VrfStatus,
    /// Switch attachments. `None` means the task did not mention them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

/// Controller-reported deployment status of a VRF.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VrfStatus {
    /// Not deployed anywhere.
    Na,
    /// Deployment in progress.
    Pending,
    /// Deployed and in sync.
    Deployed,
    /// Deployed but the switch configuration diverged.
    OutOfSync,
    /// A status this crate does not know, kept as the controller sent it.
    /// Empty when no status was reported.
    Unknown(String),
}

impl Default for VrfStatus {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

/// Template parameters of a VRF.
///
/// Only fields that are set take part in comparisons, so a task can pin a
/// single parameter without fighting values the controller fills in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VrfTemplateConfig {
    /// VXLAN segment id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf_segment_id: Option<u32>,
    /// VLAN name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf_vlan_name: Option<String>,
    /// Interface description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf_intf_description: Option<String>,
    /// VRF description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf_description: Option<String>,
    /// Interface MTU.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    /// Loopback route tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<u32>,
    /// BGP autonomous system number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
    /// Maximum BGP paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bgp_paths: Option<u32>,
    /// Maximum iBGP paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ibgp_paths: Option<u32>,
    /// Route-target import list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_target_import: Option<String>,
    /// Route-target export list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_target_export: Option<String>,
    /// Advertise host routes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertise_host_route_flag: Option<bool>,
    /// Advertise a default route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertise_default_route_flag: Option<bool>,
    /// Enable IPv6 link-local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_link_local_flag: Option<bool>,
    /// Any other template key, passed through verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Vrf {
    /// Creates a VRF with default templates and no parameters.
    #[must_use]
    pub fn new(fabric: impl Into<String>, vrf_name: impl Into<String>) -> Self {
        Self {
            fabric: fabric.into(),
            vrf_name: vrf_name.into(),
            vrf_id: None,
            vlan_id: None,
            vrf_template: String::from(DEFAULT_VRF_TEMPLATE),
            vrf_extension_template: String::from(DEFAULT_VRF_EXTENSION_TEMPLATE),
            service_vrf_template: None,
            template_config: VrfTemplateConfig::default(),
            status: VrfStatus::default(),
            attachments: None,
        }
    }

    /// Returns the `(fabric, vrf_name)` identity.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.fabric, &self.vrf_name)
    }

    /// Returns the attachments, treating "not mentioned" as empty.
    #[must_use]
    pub fn attachment_list(&self) -> &[Attachment] {
        self.attachments.as_deref().unwrap_or_default()
    }

    /// Looks up an attachment by switch address.
    #[must_use]
    pub fn attachment(&self, ip_address: &str) -> Option<&Attachment> {
        self.attachment_list()
            .iter()
            .find(|a| a.ip_address == ip_address)
    }

    /// Returns the VRF with this task's parameters laid over `base`.
    ///
    /// Used for `merged` updates so unset parameters keep their current
    /// controller values.
    #[must_use]
    pub fn overlay_on(&self, base: &Self) -> Self {
        let mut wire = base.template_config.to_wire();
        wire.extend(self.template_config.to_wire());

        Self {
            fabric: self.fabric.clone(),
            vrf_name: self.vrf_name.clone(),
            vrf_id: self.vrf_id.or(base.vrf_id),
            vlan_id: self.vlan_id.or(base.vlan_id),
            vrf_template: self.vrf_template.clone(),
            vrf_extension_template: self.vrf_extension_template.clone(),
            service_vrf_template: self
                .service_vrf_template
                .clone()
                .or_else(|| base.service_vrf_template.clone()),
            template_config: VrfTemplateConfig::from_wire_strings(&wire),
            status: base.status.clone(),
            attachments: self.attachments.clone(),
        }
    }

    /// Builds the create/update request body.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let mut config: Map<String, Value> = self
            .template_config
            .with_defaults()
            .to_wire()
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        config.insert(String::from("vrfName"), json!(self.vrf_name));
        if let Some(vlan) = self.vlan_id {
            config.insert(String::from("vrfVlanId"), json!(vlan.to_string()));
        }
        if let Some(segment) = self.vrf_id {
            config
                .entry(String::from("vrfSegmentId"))
                .or_insert_with(|| json!(segment.to_string()));
        }

        json!({
            "fabric": self.fabric,
            "vrfName": self.vrf_name,
            "vrfId": self.vrf_id,
            "vrfTemplate": self.vrf_template,
            "vrfExtensionTemplate": self.vrf_extension_template,
            "serviceVrfTemplate": self.service_vrf_template,
            "vrfTemplateConfig": Value::Object(config).to_string(),
        })
    }
}

impl VrfStatus {
    /// Parses a controller status string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_ascii_uppercase().as_str() {
            "NA" | "NOT_DEPLOYED" | "" => Self::Na,
            "PENDING" | "IN PROGRESS" => Self::Pending,
            "DEPLOYED" => Self::Deployed,
            "OUT-OF-SYNC" | "OUT_OF_SYNC" => Self::OutOfSync,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    /// Returns true for statuses a deployment wait stops on.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Deployed | Self::OutOfSync)
    }
}

impl std::fmt::Display for VrfStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Na => "NA",
            Self::Pending => "PENDING",
            Self::Deployed => "DEPLOYED",
            Self::OutOfSync => "OUT-OF-SYNC",
            Self::Unknown(raw) if raw.is_empty() => "UNKNOWN",
            Self::Unknown(raw) => raw.as_str(),
        };
        write!(f, "{s}")
    }
}

impl From<String> for VrfStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<VrfStatus> for String {
    fn from(status: VrfStatus) -> Self {
        status.to_string()
    }
}

impl VrfTemplateConfig {
    /// Returns a copy with controller defaults filled into unset fields.
    #[must_use]
    pub fn with_defaults(&self) -> Self {
        let mut config = self.clone();
        config.tag.get_or_insert(DEFAULT_ROUTE_TAG);
        config.mtu.get_or_insert(DEFAULT_MTU);
        config.max_bgp_paths.get_or_insert(DEFAULT_MAX_BGP_PATHS);
        config.max_ibgp_paths.get_or_insert(DEFAULT_MAX_IBGP_PATHS);
        config
    }

    /// Returns the set fields keyed by their controller names, values as strings.
    #[must_use]
    pub fn to_wire(&self) -> BTreeMap<String, String> {
        let mut wire = BTreeMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                wire.insert(key.to_string(), value);
            }
        };

        put("vrfSegmentId", self.vrf_segment_id.map(|v| v.to_string()));
        put("vrfVlanName", self.vrf_vlan_name.clone());
        put("vrfIntfDescription", self.vrf_intf_description.clone());
        put("vrfDescription", self.vrf_description.clone());
        put("mtu", self.mtu.map(|v| v.to_string()));
        put("tag", self.tag.map(|v| v.to_string()));
        put("asn", self.asn.clone());
        put("maxBgpPaths", self.max_bgp_paths.map(|v| v.to_string()));
        put("maxIbgpPaths", self.max_ibgp_paths.map(|v| v.to_string()));
        put("routeTargetImport", self.route_target_import.clone());
        put("routeTargetExport", self.route_target_export.clone());
        put("advertiseHostRouteFlag", self.advertise_host_route_flag.map(|v| v.to_string()));
        put("advertiseDefaultRouteFlag", self.advertise_default_route_flag.map(|v| v.to_string()));
        put("ipv6LinkLocalFlag", self.ipv6_link_local_flag.map(|v| v.to_string()));

        for (key, value) in &self.extra {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            wire.insert(key.clone(), value);
        }

        wire
    }

    /// Parses a controller template-config object.
    ///
    /// Numbers and flags arrive as strings or as JSON scalars depending on
    /// the controller release; both are accepted.
    #[must_use]
    pub fn from_wire(map: &Map<String, Value>) -> Self {
        let strings: BTreeMap<String, String> = map
            .iter()
            .filter(|(k, _)| !RESERVED_TEMPLATE_KEYS.contains(&k.as_str()))
            .filter_map(|(k, v)| {
                let s = match v {
                    Value::String(s) => s.clone(),
                    Value::Null => return None,
                    other => other.to_string(),
                };
                Some((k.clone(), s))
            })
            .collect();
        Self::from_wire_strings(&strings)
    }

    fn from_wire_strings(wire: &BTreeMap<String, String>) -> Self {
        let mut config = Self::default();

        for (key, value) in wire {
            let value = value.trim();
            match key.as_str() {
                "vrfSegmentId" => config.vrf_segment_id = value.parse().ok(),
                "vrfVlanName" => config.vrf_vlan_name = non_empty(value),
                "vrfIntfDescription" => config.vrf_intf_description = non_empty(value),
                "vrfDescription" => config.vrf_description = non_empty(value),
                "mtu" => config.mtu = value.parse().ok(),
                "tag" => config.tag = value.parse().ok(),
                "asn" => config.asn = non_empty(value),
                "maxBgpPaths" => config.max_bgp_paths = value.parse().ok(),
                "maxIbgpPaths" => config.max_ibgp_paths = value.parse().ok(),
                "routeTargetImport" => config.route_target_import = non_empty(value),
                "routeTargetExport" => config.route_target_export = non_empty(value),
                "advertiseHostRouteFlag" => config.advertise_host_route_flag = parse_flag(value),
                "advertiseDefaultRouteFlag" => {
                    config.advertise_default_route_flag = parse_flag(value);
                }
                "ipv6LinkLocalFlag" => config.ipv6_link_local_flag = parse_flag(value),
                _ => {
                    config
                        .extra
                        .insert(key.clone(), Value::String(value.to_string()));
                }
            }
        }

        config
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
