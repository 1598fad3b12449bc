//! Plan executor for applying reconcile plans.
//!
//! This module turns each planned intent into controller calls, records
//! every mutating answer, and skips intents whose dependencies failed.

use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::controller::{
    ControllerRequest, ControllerResponse, HttpMethod, StateCache, StateReader, SwitchInventory,
};
use crate::error::{ControllerError, PlanError, Result};
use crate::model::{Attachment, Vrf};

use super::plan::{IntentKind, PlannedIntent, ReconcilePlan};

/// Executor for reconcile plans.
#[derive(Debug)]
pub struct RequestExecutor<'a> {
    reader: StateReader<'a>,
}

/// Outcome of a single intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    /// The controller accepted the intent.
    Succeeded,
    /// The intent failed; carries the reason.
    Failed(String),
    /// The intent was not attempted because a dependency failed.
    Skipped(String),
}

/// Result of executing a single intent.
#[derive(Debug, Clone)]
pub struct IntentResult {
    /// Intent index in the plan.
    pub index: usize,
    /// Fabric name.
    pub fabric: String,
    /// VRF name.
    pub vrf_name: String,
    /// Short name of the intent.
    pub label: &'static str,
    /// How it went.
    pub status: IntentStatus,
}

/// Result of executing the entire plan.
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Every mutating answer, in call order.
    pub records: Vec<ControllerResponse>,
    /// Individual intent results.
    pub results: Vec<IntentResult>,
    /// Set when a fatal error ended execution early.
    pub aborted: Option<String>,
}

impl<'a> RequestExecutor<'a> {
    /// Creates a new executor calling through `reader`'s transport.
    #[must_use]
    pub const fn new(reader: StateReader<'a>) -> Self {
        Self { reader }
    }

    /// Executes a reconcile plan.
    ///
    /// A failed intent fails only itself and the intents depending on it.
    /// A fatal error (network, authentication) stops execution.
    pub async fn execute(&self, plan: &ReconcilePlan, cache: &mut StateCache) -> ExecutionResult {
        info!("Executing reconcile plan with {} actions", plan.actions.len());

        let mut outcome = ExecutionResult::default();
        let mut failed_indices: HashSet<usize> = HashSet::new();

        for (idx, intent) in plan.actions.iter().enumerate() {
            let deps_failed = intent
                .dependencies
                .iter()
                .any(|dep| failed_indices.contains(dep));

            if deps_failed {
                warn!("Skipping action {idx} due to failed dependencies");
                let reason = PlanError::DependencyFailed {
                    vrf_name: intent.vrf_name.clone(),
                    intent: intent.kind.label().to_string(),
                };
                outcome.push(idx, intent, IntentStatus::Skipped(reason.to_string()));
                failed_indices.insert(idx);
                continue;
            }

            debug!("Running action {idx}: {intent}");
            match self.run_intent(intent, cache, &mut outcome.records).await {
                Ok(()) => {
                    cache.invalidate(&intent.fabric);
                    outcome.push(idx, intent, IntentStatus::Succeeded);
                }
                Err(e) if e.is_fatal() => {
                    error!("Aborting after action {idx}: {e}");
                    outcome.records.extend(e.response().cloned());
                    outcome.push(idx, intent, IntentStatus::Failed(e.to_string()));
                    outcome.aborted = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    error!("Action {idx} failed: {e}");
                    outcome.records.extend(e.response().cloned());
                    failed_indices.insert(idx);
                    outcome.push(idx, intent, IntentStatus::Failed(e.to_string()));
                }
            }
        }

        info!(
            "Plan executed: {} succeeded, {} failed",
            outcome.succeeded(),
            outcome.errors().len()
        );
        outcome
    }

    async fn run_intent(
        &self,
        intent: &PlannedIntent,
        cache: &mut StateCache,
        records: &mut Vec<ControllerResponse>,
    ) -> Result<()> {
        let paths = self.reader.paths();
        let fabric = intent.fabric.as_str();
        let vrf_name = intent.vrf_name.as_str();

        match &intent.kind {
            IntentKind::CreateVrf(vrf) => {
                let body = self.creation_body(vrf).await?;
                self.call(ControllerRequest::with_body(HttpMethod::Post, paths.vrfs(fabric), body), records)
                    .await?;
            }
            IntentKind::UpdateVrf(vrf) => {
                let request =
                    ControllerRequest::with_body(HttpMethod::Put, paths.vrf(fabric, vrf_name), vrf.to_payload());
                self.call(request, records).await?;
            }
            IntentKind::Attach(list) => {
                let inventory = self.reader.switch_inventory(cache, fabric).await?;
                let body = attach_body(fabric, vrf_name, list, &inventory, true)?;
                let response = self
                    .call(ControllerRequest::with_body(HttpMethod::Post, paths.attachments(fabric), body), records)
                    .await?;
                check_switch_results(&response)?;
            }
            IntentKind::Deploy => {
                let request = ControllerRequest::with_body(
                    HttpMethod::Post,
                    paths.deployments(fabric),
                    json!({ "vrfNames": vrf_name }),
                );
                self.call(request, records).await?;
            }
            IntentKind::Detach(list) => {
                let inventory = self.reader.switch_inventory(cache, fabric).await?;
                let body = attach_body(fabric, vrf_name, list, &inventory, false)?;
                self.call(
                    ControllerRequest::with_body(HttpMethod::Delete, paths.attachments(fabric), body),
                    records,
                )
                .await?;
            }
            IntentKind::DeleteVrf => {
                self.call(ControllerRequest::delete(paths.vrf(fabric, vrf_name)), records)
                    .await?;
            }
        }

        info!("{}", intent.description());
        Ok(())
    }

    /// Fills in a controller-assigned id when the task left it out.
    async fn creation_body(&self, vrf: &Vrf) -> Result<Value> {
        if vrf.vrf_id.is_some() {
            return Ok(vrf.to_payload());
        }
        let id = self.reader.next_vrf_id(&vrf.fabric).await?;
        debug!("Controller assigned VRF id {id} to {}", vrf.vrf_name);
        let mut vrf = vrf.clone();
        vrf.vrf_id = Some(id);
        Ok(vrf.to_payload())
    }

    /// Sends one mutating call and records its answer.
    async fn call(&self, request: ControllerRequest, records: &mut Vec<ControllerResponse>) -> Result<ControllerResponse> {
        let response = self.reader.transport().send(request).await?;
        records.push(response.clone());

        if response.is_success() {
            Ok(response)
        } else {
            Err(ControllerError::rejected(
                response.method.as_str(),
                response.path.clone(),
                response.return_code,
                response.reason(),
            )
            .into())
        }
    }
}

/// Builds the `[{vrfName, lanAttachList}]` body for attach and detach.
fn attach_body(
    fabric: &str,
    vrf_name: &str,
    list: &[Attachment],
    inventory: &SwitchInventory,
    attach: bool,
) -> Result<Value> {
    let entries = list
        .iter()
        .map(|a| {
            let serial = a
                .serial_number
                .as_deref()
                .or_else(|| inventory.serial_for(&a.ip_address))
                .ok_or_else(|| ControllerError::SwitchNotFound {
                    fabric: fabric.to_string(),
                    ip_address: a.ip_address.clone(),
                })?;
            let deployment = attach && a.deployment;
            Ok(a.to_payload(fabric, vrf_name, serial, deployment))
        })
        .collect::<Result<Vec<Value>>>()?;

    Ok(json!([{ "vrfName": vrf_name, "lanAttachList": entries }]))
}

/// A 2xx attach answer still lists a result per switch; any switch not
/// reported as `SUCCESS` fails the intent.
fn check_switch_results(response: &ControllerResponse) -> Result<()> {
    let Some(results) = response.data.as_object() else {
        return Ok(());
    };

    let failures: Vec<String> = results
        .iter()
        .filter_map(|(switch, status)| {
            status
                .as_str()
                .filter(|s| !s.eq_ignore_ascii_case("SUCCESS"))
                .map(|s| format!("{switch}: {s}"))
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ControllerError::rejected(
            response.method.as_str(),
            response.path.clone(),
            response.return_code,
            failures.join("; "),
        )
        .into())
    }
}

impl ExecutionResult {
    fn push(&mut self, index: usize, intent: &PlannedIntent, status: IntentStatus) {
        self.results.push(IntentResult {
            index,
            fabric: intent.fabric.clone(),
            vrf_name: intent.vrf_name.clone(),
            label: intent.kind.label(),
            status,
        });
    }

    /// Number of intents the controller accepted.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == IntentStatus::Succeeded)
            .count()
    }

    /// Returns true if at least one mutating call succeeded.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.succeeded() > 0
    }

    /// Failure messages, prefixed with their VRF.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| match &r.status {
                IntentStatus::Failed(reason) => {
                    Some(format!("{}/{} {}: {reason}", r.fabric, r.vrf_name, r.label))
                }
                IntentStatus::Succeeded | IntentStatus::Skipped(_) => None,
            })
            .collect()
    }

    /// Names of VRFs with at least one succeeded intent of the given label.
    #[must_use]
    pub fn vrfs_with(&self, label: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for r in &self.results {
            if r.label == label && r.status == IntentStatus::Succeeded && !names.contains(&r.vrf_name) {
                names.push(r.vrf_name.clone());
            }
        }
        names
    }
}
