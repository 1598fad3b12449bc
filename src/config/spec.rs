//! Task file schema types.
//!
//! This module defines the structure of a `fabric-vrf.yaml` task: the
//! controller connection, the verb, and the list of VRF entries.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::{InstanceValues, Verb, VrfLiteConnection, VrfTemplateConfig};

/// Root task configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaskConfig {
    /// Controller connection settings.
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Reconciliation verb.
    #[serde(default)]
    pub state: Verb,

    /// VRF entries. Absent and empty are both rejected.
    #[serde(default)]
    pub config: Option<Vec<VrfEntry>>,

    /// Deployment wait settings.
    #[serde(default)]
    pub wait: WaitConfig,

    /// Fetched-state cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Compute the diff without issuing mutating calls.
    #[serde(default)]
    pub check_mode: bool,
}

/// Controller connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Base URL, e.g. `https://ndfc.example.net`.
    pub url: Option<String>,

    /// API release to talk to.
    pub version: VersionSetting,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Skip TLS certificate verification (lab controllers).
    pub accept_invalid_certs: bool,

    /// User name sent with an API key.
    pub username: Option<String>,
}

/// Controller API release selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSetting {
    /// Probe the controller.
    #[default]
    Auto,
    /// DCNM 11 paths and response shapes.
    V11,
    /// NDFC 12 paths and response shapes.
    V12,
}

/// Deployment wait settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Poll after a query until deployment settles.
    pub enabled: bool,

    /// Maximum number of polls.
    pub retries: u32,

    /// Delay between polls in seconds.
    pub delay_secs: u64,
}

/// Fetched-state cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds.
    pub ttl_secs: i64,
}

/// One VRF entry of the task, as written by the user.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct VrfEntry {
    /// Fabric name.
    #[validate(length(min = 1, max = 64, message = "fabric must be 1 to 64 characters"))]
    pub fabric: Option<String>,

    /// VRF name.
    #[validate(length(min = 1, max = 32, message = "vrf_name must be 1 to 32 characters"))]
    pub vrf_name: Option<String>,

    /// VRF id. Range-checked by the validator against the model limits.
    pub vrf_id: Option<i64>,

    /// VRF VLAN id.
    pub vlan_id: Option<i64>,

    /// VRF template name.
    pub vrf_template: Option<String>,

    /// VRF extension template name.
    pub vrf_extension_template: Option<String>,

    /// Service VRF template name.
    pub service_vrf_template: Option<String>,

    /// Template parameters.
    pub vrf_template_config: VrfTemplateConfig,

    /// Switch attachments.
    #[serde(alias = "lan_attach_list")]
    #[validate(nested)]
    pub attach: Option<Vec<AttachEntry>>,
}

/// One switch attachment of a VRF entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct AttachEntry {
    /// Switch management address.
    #[validate(length(min = 1, message = "ip_address is required"))]
    pub ip_address: Option<String>,

    /// VLAN on this switch; defaults to the VRF VLAN.
    pub vlan_id: Option<i64>,

    /// Deploy after attaching.
    pub deployment: bool,

    /// Extension values.
    pub extension_values: Option<ExtensionValuesEntry>,

    /// Free-form switch configuration.
    pub freeform_config: Option<String>,

    /// Per-switch instance values.
    pub instance_values: Option<InstanceValues>,
}

/// Extension values of an attachment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtensionValuesEntry {
    /// VRF-LITE links.
    #[serde(alias = "VRF_LITE_CONN")]
    pub vrf_lite_conn: Vec<VrfLiteConnection>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            url: None,
            version: VersionSetting::Auto,
            timeout_secs: 30,
            accept_invalid_certs: false,
            username: None,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            retries: 30,
            delay_secs: 5,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl TaskConfig {
    /// Returns the entries, treating an absent list as empty.
    #[must_use]
    pub fn entries(&self) -> &[VrfEntry] {
        self.config.as_deref().unwrap_or_default()
    }

    /// Returns the distinct fabrics named by the entries, in first-seen order.
    #[must_use]
    pub fn fabrics(&self) -> Vec<&str> {
        let mut fabrics: Vec<&str> = Vec::new();
        for fabric in self.entries().iter().filter_map(|e| e.fabric.as_deref()) {
            if !fabrics.contains(&fabric) {
                fabrics.push(fabric);
            }
        }
        fabrics
    }
}

impl std::fmt::Display for VersionSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::V11 => "v11",
            Self::V12 => "v12",
        };
        write!(f, "{s}")
    }
}
