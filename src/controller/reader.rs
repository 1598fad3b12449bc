//! Reads current fabric state from the controller.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{ControllerError, FabricError, Result};
use crate::model::{Attachment, Vrf};

use super::adapter::ResponseAdapter;
use super::cache::StateCache;
use super::paths::ApiPaths;
use super::transport::{ControllerRequest, ControllerResponse, ControllerTransport};
use super::types::SwitchInventory;

/// Result of a fabric existence check.
#[derive(Debug, Clone, PartialEq)]
pub enum FabricCheck {
    /// The fabric exists.
    Present,
    /// The controller does not know the fabric; carries its answer.
    Missing(ControllerResponse),
}

/// Fetches VRFs, attachments and inventory through the transport.
#[derive(Clone, Copy)]
pub struct StateReader<'a> {
    transport: &'a dyn ControllerTransport,
    adapter: &'a dyn ResponseAdapter,
    paths: ApiPaths,
}

impl std::fmt::Debug for StateReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReader")
            .field("adapter", &self.adapter)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl<'a> StateReader<'a> {
    /// Creates a reader speaking the adapter's API release.
    #[must_use]
    pub fn new(transport: &'a dyn ControllerTransport, adapter: &'a dyn ResponseAdapter) -> Self {
        Self {
            transport,
            adapter,
            paths: ApiPaths::for_version(adapter.version()),
        }
    }

    /// Returns the transport calls go through.
    #[must_use]
    pub const fn transport(&self) -> &'a dyn ControllerTransport {
        self.transport
    }

    /// Returns the endpoint paths of the reader's API release.
    #[must_use]
    pub const fn paths(&self) -> &ApiPaths {
        &self.paths
    }

    /// Checks that a fabric exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller cannot be reached.
    pub async fn check_fabric(&self, fabric: &str) -> Result<FabricCheck> {
        let response = self
            .transport
            .send(ControllerRequest::get(self.paths.fabric(fabric)))
            .await?;

        if response.is_success() {
            Ok(FabricCheck::Present)
        } else {
            info!("Fabric {fabric} not found (HTTP {})", response.return_code);
            Ok(FabricCheck::Missing(response))
        }
    }

    /// Fetches the VRFs of a fabric with their attachments.
    ///
    /// With `vrf_name` set only that VRF is returned (or nothing). A fabric
    /// without VRFs answers 404 on some releases; that reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects the read or answers with
    /// an unexpected shape.
    pub async fn fetch(
        &self,
        cache: &mut StateCache,
        fabric: &str,
        vrf_name: Option<&str>,
    ) -> Result<Vec<Vrf>> {
        let vrfs = match cache.vrfs(fabric) {
            Some(vrfs) => vrfs,
            None => {
                let vrfs = self.fetch_uncached(fabric).await?;
                cache.store_vrfs(fabric, vrfs.clone());
                vrfs
            }
        };

        Ok(match vrf_name {
            Some(name) => vrfs.into_iter().filter(|v| v.vrf_name == name).collect(),
            None => vrfs,
        })
    }

    /// Fetches one VRF that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::VrfNotFound`] if the fabric has no such VRF.
    pub async fn fetch_exact(&self, cache: &mut StateCache, fabric: &str, vrf_name: &str) -> Result<Vrf> {
        self.fetch(cache, fabric, Some(vrf_name))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                FabricError::Controller(ControllerError::VrfNotFound {
                    fabric: fabric.to_string(),
                    vrf_name: vrf_name.to_string(),
                })
            })
    }

    /// Fetches the switch inventory of a fabric.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects the read.
    pub async fn switch_inventory(&self, cache: &mut StateCache, fabric: &str) -> Result<SwitchInventory> {
        if let Some(inventory) = cache.inventory(fabric) {
            return Ok(inventory);
        }

        let response = self.read(self.paths.inventory(fabric)).await?;
        let inventory = SwitchInventory::new(self.adapter.switches(&response.data)?);
        debug!("Fabric {fabric} has {} switches", inventory.switches.len());
        cache.store_inventory(fabric, inventory.clone());
        Ok(inventory)
    }

    /// Asks the controller for the next free VRF id of a fabric.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects the read or does not
    /// report an id.
    pub async fn next_vrf_id(&self, fabric: &str) -> Result<u32> {
        let response = self.read(self.paths.vrf_info(fabric)).await?;
        self.adapter.next_vrf_id(&response.data).ok_or_else(|| {
            ControllerError::invalid_response(format!("no VRF id offered for fabric {fabric}")).into()
        })
    }

    async fn fetch_uncached(&self, fabric: &str) -> Result<Vec<Vrf>> {
        let response = self
            .transport
            .send(ControllerRequest::get(self.paths.vrfs(fabric)))
            .await?;
        if response.return_code == 404 {
            return Ok(Vec::new());
        }
        let response = ensure_success(response)?;
        let mut vrfs = self.adapter.vrfs(fabric, &response.data)?;
        if vrfs.is_empty() {
            return Ok(vrfs);
        }

        let names: Vec<&str> = vrfs.iter().map(|v| v.vrf_name.as_str()).collect();
        let response = self.read(self.paths.attachments_for(fabric, &names)).await?;

        let mut by_vrf: HashMap<String, Vec<Attachment>> = HashMap::new();
        for (vrf_name, attachment) in self.adapter.attachments(&response.data)? {
            by_vrf.entry(vrf_name).or_default().push(attachment);
        }
        for vrf in &mut vrfs {
            vrf.attachments = Some(by_vrf.remove(&vrf.vrf_name).unwrap_or_default());
        }

        debug!("Fetched {} VRFs from fabric {fabric}", vrfs.len());
        Ok(vrfs)
    }

    async fn read(&self, path: String) -> Result<ControllerResponse> {
        ensure_success(self.transport.send(ControllerRequest::get(path)).await?)
    }
}

fn ensure_success(response: ControllerResponse) -> Result<ControllerResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ControllerError::from_response(response).into())
    }
}
