//! Resource model for VRFs and their switch attachments.
//!
//! These types are the single normalized shape the rest of the crate works
//! with: the task file is validated into them, controller responses are
//! adapted into them, and the diff engine compares them.

mod attachment;
mod vrf;

use serde::{Deserialize, Serialize};

pub use attachment::{Attachment, InstanceValues, VrfLiteConnection};
pub use vrf::{
    DEFAULT_VRF_EXTENSION_TEMPLATE, DEFAULT_VRF_TEMPLATE, MAX_VLAN_ID, MAX_VRF_ID, MIN_VLAN_ID,
    MIN_VRF_ID, Vrf, VrfStatus, VrfTemplateConfig,
};

/// The reconciliation verb a task runs with.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    /// Create or update the named VRFs and attachments, never remove anything.
    #[default]
    Merged,
    /// Like merged, and detach attachments not listed on the named VRFs.
    Replaced,
    /// Make the fabric hold exactly the listed VRFs.
    Overridden,
    /// Delete the named VRFs, or every VRF of a fabric-only entry.
    Deleted,
    /// Read current state without changing anything.
    Query,
}

impl Verb {
    /// Returns true if this verb may issue mutating calls.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Query)
    }

    /// Returns true if attachments missing from the task are detached.
    #[must_use]
    pub const fn detaches_unlisted(self) -> bool {
        matches!(self, Self::Replaced | Self::Overridden)
    }

    /// Returns the verb name as written in task files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::Replaced => "replaced",
            Self::Overridden => "overridden",
            Self::Deleted => "deleted",
            Self::Query => "query",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
