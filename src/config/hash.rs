//! Task hashing for plan identification.
//!
//! Plans are stamped with a hash of the task they were computed from so
//! two runs of the same task can be told apart from runs of an edited one.

use sha2::{Digest, Sha256};

use crate::model::{Attachment, Vrf};

use super::spec::TaskConfig;

/// Hasher for computing task hashes.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new task hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the whole task.
    ///
    /// Controller connection settings are left out: the same task against
    /// another controller is still the same desired state.
    #[must_use]
    pub fn hash_task(&self, task: &TaskConfig) -> String {
        let mut hasher = Sha256::new();

        hasher.update(task.state.as_str().as_bytes());
        for entry in task.entries() {
            // Entry types serialize with a fixed field order.
            if let Ok(bytes) = serde_json::to_vec(entry) {
                hasher.update(&bytes);
            }
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash of one VRF's declared state.
    ///
    /// Attachments are sorted by switch address so declaration order does
    /// not matter.
    #[must_use]
    pub fn hash_vrf(&self, vrf: &Vrf) -> String {
        let mut hasher = Sha256::new();

        hasher.update(vrf.fabric.as_bytes());
        hasher.update(vrf.vrf_name.as_bytes());
        if let Some(id) = vrf.vrf_id {
            hasher.update(id.to_be_bytes());
        }
        if let Some(vlan) = vrf.vlan_id {
            hasher.update(vlan.to_be_bytes());
        }
        hasher.update(vrf.vrf_template.as_bytes());
        hasher.update(vrf.vrf_extension_template.as_bytes());

        for (key, value) in vrf.template_config.to_wire() {
            hasher.update(key.as_bytes());
            hasher.update(value.as_bytes());
        }

        let mut attachments: Vec<&Attachment> = vrf.attachment_list().iter().collect();
        attachments.sort_by(|a, b| a.ip_address.cmp(&b.ip_address));
        for attachment in attachments {
            hasher.update(attachment.ip_address.as_bytes());
            hasher.update([u8::from(attachment.deployment)]);
            if let Some(vlan) = attachment.vlan_id {
                hasher.update(vlan.to_be_bytes());
            }
            hasher.update(attachment.extension_values_json().as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}
