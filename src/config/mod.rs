//! Configuration module for the fabric VRF reconciler.
//!
//! This module handles all task-related functionality:
//! - Parsing and deserializing `fabric-vrf.yaml`
//! - Per-verb validation into typed desired state
//! - Computing task hashes for plan identification

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{
    AttachEntry, CacheConfig, ControllerConfig, ExtensionValuesEntry, TaskConfig, VersionSetting,
    VrfEntry, WaitConfig,
};
pub use parser::{ConfigParser, Credentials, find_config_file};
pub use self::validator::{ConfigValidator, Target, ValidatedConfig, ValidationError, VerbConfig};
pub use hash::ConfigHasher;
