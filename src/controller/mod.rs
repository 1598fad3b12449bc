//! Controller access for the fabric VRF reconciler.
//!
//! This module owns everything that talks to the controller:
//! - The transport seam and its REST implementation
//! - Versioned endpoint paths and per-release response decoding
//! - Request-scoped caching of fetched state
//! - Reading current state and waiting for deployments

mod adapter;
mod cache;
mod client;
mod paths;
mod reader;
mod transport;
mod types;
mod waiter;

#[cfg(test)]
pub(crate) mod fake;

pub use adapter::{ResponseAdapter, V11Adapter, V12Adapter, adapter_for, probe_version};
pub use cache::{CacheStats, DEFAULT_TTL_SECS, StateCache};
pub use client::RestClient;
pub use paths::{ApiPaths, ApiVersion};
pub use reader::{FabricCheck, StateReader};
pub use transport::{ControllerRequest, ControllerResponse, ControllerTransport, HttpMethod};
pub use types::{SwitchInfo, SwitchInventory};
pub use waiter::{DeploymentWaiter, WaitOutcome, WaitReport};

#[cfg(test)]
pub(crate) use transport::MockControllerTransport;
