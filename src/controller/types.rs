//! Controller-reported fabric data that is not part of the VRF model.

use serde::Serialize;

/// A switch in the fabric inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchInfo {
    /// Management address.
    pub ip_address: String,
    /// Serial number.
    pub serial_number: String,
    /// Fabric role (leaf, border, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Host name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Switches of one fabric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwitchInventory {
    /// Known switches.
    pub switches: Vec<SwitchInfo>,
}

impl SwitchInventory {
    /// Creates an inventory from a switch list.
    #[must_use]
    pub const fn new(switches: Vec<SwitchInfo>) -> Self {
        Self { switches }
    }

    /// Looks up a switch by management address.
    #[must_use]
    pub fn find(&self, ip_address: &str) -> Option<&SwitchInfo> {
        self.switches.iter().find(|s| s.ip_address == ip_address)
    }

    /// Returns the serial number of a switch.
    #[must_use]
    pub fn serial_for(&self, ip_address: &str) -> Option<&str> {
        self.find(ip_address).map(|s| s.serial_number.as_str())
    }
}
