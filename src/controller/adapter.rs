//! Per-release decoding of controller responses.
//!
//! DCNM 11 wraps payloads in a `DATA` envelope and always sends template
//! parameters as a JSON string. NDFC 12 returns bare arrays, may nest the
//! VRF fields under `parent`, and sends template parameters either way.
//! Each release gets its own [`ResponseAdapter`]; the reader never looks at
//! raw shapes.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ControllerError, Result};
use crate::model::{Attachment, Vrf, VrfStatus, VrfTemplateConfig};

use super::paths::{ApiVersion, V11_VERSION_PATH, V12_VERSION_PATH};
use super::transport::{ControllerRequest, ControllerTransport};
use super::types::SwitchInfo;

/// Attachment states that mean the VRF configuration reached the switch.
const DEPLOYED_ATTACH_STATES: &[&str] = &["DEPLOYED", "IN PROGRESS", "OUT-OF-SYNC"];

/// Decodes controller responses of one API release.
pub trait ResponseAdapter: Send + Sync + std::fmt::Debug {
    /// Release this adapter decodes.
    fn version(&self) -> ApiVersion;

    /// Decodes a VRF list.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a VRF list.
    fn vrfs(&self, fabric: &str, data: &Value) -> Result<Vec<Vrf>>;

    /// Decodes an attachment list into `(vrf_name, attachment)` pairs.
    ///
    /// Switches the VRF is not attached to are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not an attachment list.
    fn attachments(&self, data: &Value) -> Result<Vec<(String, Attachment)>>;

    /// Decodes a switch inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a switch list.
    fn switches(&self, data: &Value) -> Result<Vec<SwitchInfo>> {
        Ok(records(data, "switch inventory")?
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| SwitchInfo {
                ip_address: string_field(obj, "ipAddress").unwrap_or_default(),
                serial_number: string_field(obj, "serialNumber").unwrap_or_default(),
                role: string_field(obj, "switchRole"),
                name: string_field(obj, "logicalName"),
            })
            .collect())
    }

    /// Decodes the next free VRF id from a `vrfinfo` answer.
    fn next_vrf_id(&self, data: &Value) -> Option<u32> {
        let info = data.get("DATA").unwrap_or(data);
        scalar_string(info.get("l3vni")?)?.parse().ok()
    }
}

/// Adapter for DCNM 11.
#[derive(Debug, Default, Clone, Copy)]
pub struct V11Adapter;

/// Adapter for NDFC 12.
#[derive(Debug, Default, Clone, Copy)]
pub struct V12Adapter;

impl ResponseAdapter for V11Adapter {
    fn version(&self) -> ApiVersion {
        ApiVersion::V11
    }

    fn vrfs(&self, fabric: &str, data: &Value) -> Result<Vec<Vrf>> {
        Ok(records(data, "VRF list")?
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                let config = match obj.get("vrfTemplateConfig") {
                    Some(Value::String(raw)) => parse_config_string(raw),
                    _ => Map::new(),
                };
                vrf_from_object(fabric, obj, &config)
            })
            .collect())
    }

    fn attachments(&self, data: &Value) -> Result<Vec<(String, Attachment)>> {
        Ok(records(data, "attachment list")?
            .iter()
            .filter_map(Value::as_object)
            .flat_map(attachments_from_item)
            .collect())
    }
}

impl ResponseAdapter for V12Adapter {
    fn version(&self) -> ApiVersion {
        ApiVersion::V12
    }

    fn vrfs(&self, fabric: &str, data: &Value) -> Result<Vec<Vrf>> {
        Ok(records(data, "VRF list")?
            .iter()
            .filter_map(Value::as_object)
            .map(|item| {
                let obj = merged_parent(item);
                let config = match obj.get("vrfTemplateConfig") {
                    Some(Value::String(raw)) => parse_config_string(raw),
                    Some(Value::Object(map)) => map.clone(),
                    _ => Map::new(),
                };
                vrf_from_object(fabric, &obj, &config)
            })
            .collect())
    }

    fn attachments(&self, data: &Value) -> Result<Vec<(String, Attachment)>> {
        Ok(records(data, "attachment list")?
            .iter()
            .filter_map(Value::as_object)
            .map(merged_parent)
            .flat_map(|item| attachments_from_item(&item))
            .collect())
    }
}

/// Returns the adapter for a release.
#[must_use]
pub fn adapter_for(version: ApiVersion) -> Box<dyn ResponseAdapter> {
    match version {
        ApiVersion::V11 => Box::new(V11Adapter),
        ApiVersion::V12 => Box::new(V12Adapter),
    }
}

/// Asks the controller which API release it speaks.
///
/// The NDFC 12 version endpoint is tried first; a DCNM 11 controller
/// answers only on the older path.
///
/// # Errors
///
/// Returns an error if neither endpoint answers.
pub async fn probe_version(transport: &dyn ControllerTransport) -> Result<ApiVersion> {
    let response = transport.send(ControllerRequest::get(V12_VERSION_PATH)).await?;
    let reported = response
        .is_success()
        .then(|| version_string(&response.data))
        .flatten();
    if let Some(version) = reported {
        debug!("Controller reports version {version}");
        if major_version(&version).is_some_and(|major| major >= 12) {
            return Ok(ApiVersion::V12);
        }
    }

    let response = transport.send(ControllerRequest::get(V11_VERSION_PATH)).await?;
    if response.is_success() {
        debug!("Controller answers on the DCNM 11 version endpoint");
        return Ok(ApiVersion::V11);
    }

    Err(ControllerError::invalid_response("unable to determine controller version").into())
}

/// Unwraps the record list of a response.
fn records<'a>(data: &'a Value, what: &str) -> Result<&'a [Value]> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(&[]),
        Value::Object(obj) => match obj.get("DATA") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) => Ok(&[]),
            None if obj.is_empty() => Ok(&[]),
            _ => Err(ControllerError::invalid_response(format!("expected {what}")).into()),
        },
        _ => Err(ControllerError::invalid_response(format!("expected {what}")).into()),
    }
}

/// Lifts the fields nested under `parent` to the item's top level.
///
/// Top-level fields win: NDFC reports live status next to `parent`.
fn merged_parent(item: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = item
        .get("parent")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    for (key, value) in item {
        if key != "parent" {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

fn parse_config_string(raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            warn!("Ignoring unparsable vrfTemplateConfig");
            Map::new()
        }
    }
}

fn vrf_from_object(fabric: &str, obj: &Map<String, Value>, config: &Map<String, Value>) -> Vrf {
    let mut vrf = Vrf::new(
        string_field(obj, "fabric").unwrap_or_else(|| fabric.to_string()),
        string_field(obj, "vrfName").unwrap_or_default(),
    );
    vrf.vrf_id = obj
        .get("vrfId")
        .and_then(scalar_string)
        .and_then(|s| s.parse().ok());
    vrf.vlan_id = config
        .get("vrfVlanId")
        .and_then(scalar_string)
        .and_then(|s| s.parse().ok());
    if let Some(template) = string_field(obj, "vrfTemplate") {
        vrf.vrf_template = template;
    }
    if let Some(template) = string_field(obj, "vrfExtensionTemplate") {
        vrf.vrf_extension_template = template;
    }
    vrf.service_vrf_template = string_field(obj, "serviceVrfTemplate");
    vrf.template_config = VrfTemplateConfig::from_wire(config);
    vrf.status = string_field(obj, "vrfStatus").map_or_else(VrfStatus::default, |s| VrfStatus::parse(&s));
    vrf
}

/// Decodes one `{vrfName, lanAttachList}` item.
fn attachments_from_item(item: &Map<String, Value>) -> Vec<(String, Attachment)> {
    let vrf_name = string_field(item, "vrfName").unwrap_or_default();
    let Some(list) = item.get("lanAttachList").and_then(Value::as_array) else {
        return Vec::new();
    };

    list.iter()
        .filter_map(Value::as_object)
        .filter(|entry| entry.get("isLanAttached").and_then(Value::as_bool).unwrap_or(true))
        .filter_map(|entry| {
            let ip_address = string_field(entry, "ipAddress")?;
            let state = string_field(entry, "lanAttachState");
            let deployment = entry
                .get("deployment")
                .and_then(Value::as_bool)
                .unwrap_or_else(|| {
                    state
                        .as_deref()
                        .is_some_and(|s| DEPLOYED_ATTACH_STATES.contains(&s.to_ascii_uppercase().as_str()))
                });

            let mut attachment = Attachment::new(ip_address, deployment);
            attachment.serial_number = string_field(entry, "serialNumber");
            attachment.vlan_id = entry
                .get("vlanId")
                .and_then(scalar_string)
                .and_then(|s| s.parse().ok());
            attachment.vrf_lite = entry
                .get("extensionValues")
                .and_then(Attachment::parse_extension_values);
            attachment.freeform_config = string_field(entry, "freeformConfig");
            attachment.state = state;

            Some((
                string_field(entry, "vrfName").unwrap_or_else(|| vrf_name.clone()),
                attachment,
            ))
        })
        .collect()
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Returns a string or number as a string.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn version_string(data: &Value) -> Option<String> {
    data.get("version")
        .or_else(|| data.get("DATA").and_then(|d| d.get("version")))
        .and_then(scalar_string)
}

fn major_version(version: &str) -> Option<u32> {
    version.split('.').next()?.trim().parse().ok()
}
