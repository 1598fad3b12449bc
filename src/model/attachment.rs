//! Switch attachment of a VRF, including VRF-LITE extensions.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Jython template the controller uses for VRF-LITE links.
const VRF_LITE_TEMPLATE: &str = "Ext_VRF_Lite_Jython";

/// A VRF bound to one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Switch management address.
    pub ip_address: String,
    /// Switch serial number, resolved from the fabric inventory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// VLAN used on this switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u16>,
    /// Deploy after attaching.
    pub deployment: bool,
    /// VRF-LITE links. `None` means unspecified (or not reported).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf_lite: Option<Vec<VrfLiteConnection>>,
    /// Free-form switch configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_config: Option<String>,
    /// Per-switch instance values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_values: Option<InstanceValues>,
    /// Controller-reported attachment state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// One VRF-LITE link on an attached switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VrfLiteConnection {
    /// VRF name on the peer device.
    pub peer_vrf_name: Option<String>,
    /// Local interface.
    pub if_name: Option<String>,
    /// Local IPv4 address with mask.
    pub ip_mask: Option<String>,
    /// Local IPv6 address with mask.
    pub ipv6_mask: Option<String>,
    /// Neighbor IPv4 address.
    pub neighbor_ip: Option<String>,
    /// Neighbor IPv6 address.
    pub ipv6_neighbor: Option<String>,
    /// Neighbor ASN.
    pub neighbor_asn: Option<String>,
    /// 802.1Q tag.
    pub dot1q_id: Option<u16>,
}

/// Per-switch instance values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceValues {
    /// Loopback interface id.
    pub loopback_id: Option<u32>,
    /// Loopback IPv4 address.
    pub loopback_ip_address: Option<String>,
    /// Loopback IPv6 address.
    pub loopback_ipv6_address: Option<String>,
    /// EVPN route-target import on this switch.
    pub switch_route_target_import_evpn: Option<String>,
    /// EVPN route-target export on this switch.
    pub switch_route_target_export_evpn: Option<String>,
}

impl Attachment {
    /// Creates an attachment with no VLAN override and no extensions.
    #[must_use]
    pub fn new(ip_address: impl Into<String>, deployment: bool) -> Self {
        Self {
            ip_address: ip_address.into(),
            serial_number: None,
            vlan_id: None,
            deployment,
            vrf_lite: None,
            freeform_config: None,
            instance_values: None,
            state: None,
        }
    }

    /// Returns true if the attachment carries VRF-LITE links.
    #[must_use]
    pub fn has_vrf_lite(&self) -> bool {
        self.vrf_lite.as_ref().is_some_and(|links| !links.is_empty())
    }

    /// Builds one `lanAttachList` entry.
    #[must_use]
    pub fn to_payload(&self, fabric: &str, vrf_name: &str, serial_number: &str, deployment: bool) -> Value {
        json!({
            "fabric": fabric,
            "vrfName": vrf_name,
            "serialNumber": serial_number,
            "vlanId": self.vlan_id.map_or(0, i64::from),
            "deployment": deployment,
            "extensionValues": self.extension_values_json(),
            "freeformConfig": self.freeform_config.clone().unwrap_or_default(),
            "instanceValues": self
                .instance_values
                .as_ref()
                .map(InstanceValues::to_wire_string)
                .unwrap_or_default(),
        })
    }

    /// Encodes the extension values the way the controller nests them:
    /// a JSON string whose members are JSON strings themselves.
    #[must_use]
    pub fn extension_values_json(&self) -> String {
        let Some(links) = self.vrf_lite.as_ref().filter(|l| !l.is_empty()) else {
            return String::new();
        };

        let conns: Vec<Value> = links.iter().map(VrfLiteConnection::to_wire).collect();
        let vrf_lite = json!({ "VRF_LITE_CONN": conns }).to_string();
        let multisite = json!({ "MULTISITE_CONN": [] }).to_string();

        json!({
            "VRF_LITE_CONN": vrf_lite,
            "MULTISITE_CONN": multisite,
        })
        .to_string()
    }

    /// Decodes the controller's nested extension-values string.
    ///
    /// Returns `None` when nothing is reported, so the diff does not
    /// compare VRF-LITE links it cannot see.
    #[must_use]
    pub fn parse_extension_values(raw: &Value) -> Option<Vec<VrfLiteConnection>> {
        let outer = decode_nested(raw)?;
        let inner = decode_nested(outer.get("VRF_LITE_CONN")?)?;
        let conns = inner.get("VRF_LITE_CONN")?.as_array()?;
        Some(conns.iter().map(VrfLiteConnection::from_wire).collect())
    }
}

impl VrfLiteConnection {
    /// Encodes one link with the controller's upper-case keys.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        json!({
            "IF_NAME": self.if_name.clone().unwrap_or_default(),
            "DOT1Q_ID": self.dot1q_id.map(|v| v.to_string()).unwrap_or_default(),
            "IP_MASK": self.ip_mask.clone().unwrap_or_default(),
            "NEIGHBOR_IP": self.neighbor_ip.clone().unwrap_or_default(),
            "NEIGHBOR_ASN": self.neighbor_asn.clone().unwrap_or_default(),
            "IPV6_MASK": self.ipv6_mask.clone().unwrap_or_default(),
            "IPV6_NEIGHBOR": self.ipv6_neighbor.clone().unwrap_or_default(),
            "PEER_VRF_NAME": self.peer_vrf_name.clone().unwrap_or_default(),
            "AUTO_VRF_LITE_FLAG": "true",
            "VRF_LITE_JYTHON_TEMPLATE": VRF_LITE_TEMPLATE,
        })
    }

    /// Decodes one link from the controller's upper-case keys.
    #[must_use]
    pub fn from_wire(value: &Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        Self {
            peer_vrf_name: field("PEER_VRF_NAME"),
            if_name: field("IF_NAME"),
            ip_mask: field("IP_MASK"),
            ipv6_mask: field("IPV6_MASK"),
            neighbor_ip: field("NEIGHBOR_IP"),
            ipv6_neighbor: field("IPV6_NEIGHBOR"),
            neighbor_asn: field("NEIGHBOR_ASN"),
            dot1q_id: field("DOT1Q_ID").and_then(|s| s.parse().ok()),
        }
    }
}

impl InstanceValues {
    /// Encodes the values as the JSON string the controller expects.
    #[must_use]
    pub fn to_wire_string(&self) -> String {
        json!({
            "loopbackId": self.loopback_id.map(|v| v.to_string()).unwrap_or_default(),
            "loopbackIpAddress": self.loopback_ip_address.clone().unwrap_or_default(),
            "loopbackIpV6Address": self.loopback_ipv6_address.clone().unwrap_or_default(),
            "switchRouteTargetImportEvpn": self.switch_route_target_import_evpn.clone().unwrap_or_default(),
            "switchRouteTargetExportEvpn": self.switch_route_target_export_evpn.clone().unwrap_or_default(),
        })
        .to_string()
    }
}

/// Accepts either an embedded JSON string or an already-decoded object.
fn decode_nested(raw: &Value) -> Option<Value> {
    match raw {
        Value::String(s) if !s.trim().is_empty() => serde_json::from_str(s).ok(),
        Value::Object(_) => Some(raw.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lite_attachment() -> Attachment {
        let mut attachment = Attachment::new("10.10.10.227", true);
        attachment.vlan_id = Some(500);
        attachment.vrf_lite = Some(vec![VrfLiteConnection {
            peer_vrf_name: Some(String::from("ansible-vrf-int1")),
            if_name: Some(String::from("Ethernet1/16")),
            ip_mask: Some(String::from("10.33.0.2/30")),
            neighbor_ip: Some(String::from("10.33.0.1")),
            dot1q_id: Some(2),
            ..VrfLiteConnection::default()
        }]);
        attachment
    }

    #[test]
    fn test_extension_values_nesting() {
        let attachment = lite_attachment();
        let raw = attachment.extension_values_json();

        let outer: Value = serde_json::from_str(&raw).expect("outer json");
        let inner: Value =
            serde_json::from_str(outer["VRF_LITE_CONN"].as_str().expect("string")).expect("inner");
        assert_eq!(inner["VRF_LITE_CONN"][0]["IF_NAME"], json!("Ethernet1/16"));
        assert_eq!(inner["VRF_LITE_CONN"][0]["DOT1Q_ID"], json!("2"));
        assert_eq!(
            inner["VRF_LITE_CONN"][0]["VRF_LITE_JYTHON_TEMPLATE"],
            json!("Ext_VRF_Lite_Jython")
        );

        let parsed = Attachment::parse_extension_values(&Value::String(raw));
        assert_eq!(parsed, attachment.vrf_lite);
    }

    #[test]
    fn test_no_extension_values() {
        let attachment = Attachment::new("10.10.10.224", false);
        assert_eq!(attachment.extension_values_json(), "");
        assert!(Attachment::parse_extension_values(&json!("")).is_none());
        assert!(Attachment::parse_extension_values(&Value::Null).is_none());
    }

    #[test]
    fn test_payload_shape() {
        let payload = lite_attachment().to_payload("f1", "vrf1", "FDO123", false);
        assert_eq!(payload["serialNumber"], json!("FDO123"));
        assert_eq!(payload["vlanId"], json!(500));
        assert_eq!(payload["deployment"], json!(false));
        assert_eq!(payload["instanceValues"], json!(""));
    }
}
