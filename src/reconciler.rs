//! Reconciler driving one run from task to result.
//!
//! This module checks the fabrics, reads current state, dispatches on the
//! verb, and assembles the [`ModuleResult`].

use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{
    ConfigHasher, ConfigValidator, ControllerConfig, Target, TaskConfig, ValidatedConfig,
    VerbConfig, VersionSetting, WaitConfig,
};
use crate::controller::{
    ApiVersion, ControllerTransport, DeploymentWaiter, FabricCheck, ResponseAdapter, StateCache,
    StateReader, WaitReport, adapter_for, probe_version,
};
use crate::error::{ControllerError, ReconcileError, Result};
use crate::model::Vrf;
use crate::planner::{DiffEngine, DiffResult, ReconcilePlan, RequestExecutor};
use crate::result::{DiffEntry, ModuleResult, ResponseRecord, change_summary};

/// Settings of one run that do not describe desired state.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Compute the plan without issuing mutating calls.
    pub check_mode: bool,
    /// Deployment wait settings used by `query`.
    pub wait: WaitConfig,
    /// Cache entry lifetime in seconds.
    pub cache_ttl_secs: i64,
}

/// Reconciler for VRFs and their attachments.
pub struct Reconciler<'a> {
    transport: &'a dyn ControllerTransport,
    adapter: Box<dyn ResponseAdapter>,
    hasher: ConfigHasher,
    diff_engine: DiffEngine,
}

impl std::fmt::Debug for Reconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

impl RunOptions {
    /// Takes the run settings from a task.
    #[must_use]
    pub fn from_task(task: &TaskConfig) -> Self {
        Self {
            check_mode: task.check_mode,
            wait: task.wait.clone(),
            cache_ttl_secs: task.cache.ttl_secs,
        }
    }
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler decoding answers with `adapter`.
    #[must_use]
    pub fn new(transport: &'a dyn ControllerTransport, adapter: Box<dyn ResponseAdapter>) -> Self {
        Self {
            transport,
            adapter,
            hasher: ConfigHasher::new(),
            diff_engine: DiffEngine::new(),
        }
    }

    /// Creates a reconciler for the configured API release, probing the
    /// controller when the release is `auto`.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe cannot tell the release.
    pub async fn connect(transport: &'a dyn ControllerTransport, config: &ControllerConfig) -> Result<Self> {
        let version = match config.version {
            VersionSetting::Auto => probe_version(transport).await?,
            VersionSetting::V11 => ApiVersion::V11,
            VersionSetting::V12 => ApiVersion::V12,
        };
        info!("Using controller API {version}");
        Ok(Self::new(transport, adapter_for(version)))
    }

    /// Validates and runs a task.
    ///
    /// Task-level problems (an empty `config` list) come back as a failed
    /// result, not an error.
    pub async fn run_task(&self, task: &TaskConfig) -> ModuleResult {
        match ConfigValidator::new().validate(task) {
            Ok(validated) => {
                let config_hash = self.hasher.hash_task(task);
                self.run(&validated, &config_hash, &RunOptions::from_task(task))
                    .await
            }
            Err(e) => {
                warn!("Task rejected: {e}");
                ModuleResult::failure(e.to_string())
            }
        }
    }

    /// Runs validated desired state.
    pub async fn run(&self, validated: &ValidatedConfig, config_hash: &str, options: &RunOptions) -> ModuleResult {
        let run_id = Uuid::new_v4();
        let verb = validated.verb();
        let span = info_span!("run", %run_id, %verb);

        async move {
            info!(
                "Starting {verb} run for {} entries (config {})",
                validated.desired.len(),
                self.hasher.short_hash(config_hash)
            );

            let mut result = ModuleResult::new();
            for e in &validated.errors {
                result.add_error(format!("{}: {}", e.field, e.message));
            }

            let mut cache = StateCache::new(options.cache_ttl_secs);
            let reader = StateReader::new(self.transport, self.adapter.as_ref());

            let summary = match self.check_fabrics(&reader, &validated.fabrics(), &mut result).await {
                Ok(true) => match &validated.desired {
                    VerbConfig::Query(targets) => {
                        self.query(&reader, &mut cache, targets, &options.wait, &mut result)
                            .await
                    }
                    _ => {
                        self.reconcile(&reader, &mut cache, validated, config_hash, options, &mut result)
                            .await
                    }
                },
                Ok(false) => None,
                Err(e) => {
                    error!("Run aborted: {e}");
                    result.add_failure(&e);
                    None
                }
            };

            let stats = cache.stats();
            debug!("Cache: {} hits, {} misses", stats.hits, stats.misses);

            result.finish(summary);
            info!(
                "Run finished: changed={} failed={}",
                result.changed, result.failed
            );
            result
        }
        .instrument(span)
        .await
    }

    /// Computes the diff and plan for a task without touching the
    /// controller's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a fabric is missing or state cannot be read.
    pub async fn plan(&self, validated: &ValidatedConfig, config_hash: &str) -> Result<(DiffResult, ReconcilePlan)> {
        let reader = StateReader::new(self.transport, self.adapter.as_ref());
        let mut cache = StateCache::default();

        for fabric in validated.fabrics() {
            if let FabricCheck::Missing(_) = reader.check_fabric(&fabric).await? {
                return Err(ControllerError::FabricNotFound { fabric }.into());
            }
        }

        let current = self.current_state(&reader, &mut cache, &validated.fabrics()).await?;
        let diff = self
            .diff_engine
            .compute_keeping(&validated.desired, &validated.rejected, &current);
        let plan = ReconcilePlan::from_diff(&diff, validated.verb(), config_hash);
        Ok((diff, plan))
    }

    /// Waits for one VRF to finish deploying.
    ///
    /// # Errors
    ///
    /// Returns an error if the VRF does not exist or a read fails.
    pub async fn wait_for(&self, fabric: &str, vrf_name: &str, wait: &WaitConfig) -> Result<WaitReport> {
        let reader = StateReader::new(self.transport, self.adapter.as_ref());
        DeploymentWaiter::from_config(reader, wait)
            .wait(&mut StateCache::default(), fabric, vrf_name)
            .await
    }

    /// Returns `Ok(false)` after recording the first missing fabric.
    async fn check_fabrics(
        &self,
        reader: &StateReader<'_>,
        fabrics: &[String],
        result: &mut ModuleResult,
    ) -> Result<bool> {
        for fabric in fabrics {
            if let FabricCheck::Missing(response) = reader.check_fabric(fabric).await? {
                error!("Fabric {fabric} is missing on the controller");
                result.record([response]);
                result.add_error(ControllerError::FabricNotFound { fabric: fabric.clone() }.to_string());
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn current_state(
        &self,
        reader: &StateReader<'_>,
        cache: &mut StateCache,
        fabrics: &[String],
    ) -> Result<Vec<Vrf>> {
        let mut current = Vec::new();
        for fabric in fabrics {
            current.extend(reader.fetch(cache, fabric, None).await?);
        }
        debug!("Read {} current VRFs", current.len());
        Ok(current)
    }

    async fn reconcile(
        &self,
        reader: &StateReader<'_>,
        cache: &mut StateCache,
        validated: &ValidatedConfig,
        config_hash: &str,
        options: &RunOptions,
        result: &mut ModuleResult,
    ) -> Option<String> {
        let desired = &validated.desired;
        let fabrics = desired.fabrics();
        let current = match self.current_state(reader, cache, &fabrics).await {
            Ok(current) => current,
            Err(e) => {
                result.add_failure(&e);
                return None;
            }
        };

        if let VerbConfig::Merged(vrfs) | VerbConfig::Replaced(vrfs) | VerbConfig::Overridden(vrfs) = desired {
            for vrf in vrfs {
                debug!(
                    "Desired {}/{} ({})",
                    vrf.fabric,
                    vrf.vrf_name,
                    self.hasher.short_hash(&self.hasher.hash_vrf(vrf))
                );
            }
        }

        let diff = self
            .diff_engine
            .compute_keeping(desired, &validated.rejected, &current);
        info!(
            "Diff: {} creates, {} updates, {} deletes, {} unchanged",
            diff.creates, diff.updates, diff.deletes, diff.unchanged
        );
        for conflict in &diff.conflicts {
            warn!("{conflict}");
            result.add_error(conflict.to_string());
        }
        result.diff = diff.changes().into_iter().map(DiffEntry::from).collect();
        result.response = Some(Vec::new());

        let plan = ReconcilePlan::from_diff(&diff, desired.verb(), config_hash);
        if plan.is_empty() {
            info!("No changes required - state is converged");
            return Some(change_summary(&[]));
        }

        if options.check_mode {
            info!("Check mode: {} actions not applied", plan.action_count());
            result.changed = true;
            return Some(format!("Would apply {} actions", plan.action_count()));
        }

        let executed = RequestExecutor::new(*reader).execute(&plan, cache).await;
        result.changed = executed.changed();
        result.record(executed.records.iter().cloned());
        for e in executed.errors() {
            result.add_error(e);
        }
        if let Some(reason) = &executed.aborted {
            result.add_error(ReconcileError::Aborted { reason: reason.clone() }.to_string());
        }

        Some(change_summary(&[
            ("Created VRFs", executed.vrfs_with("create")),
            ("Updated VRFs", executed.vrfs_with("update")),
            ("Attached VRFs", executed.vrfs_with("attach")),
            ("Deployed VRFs", executed.vrfs_with("deploy")),
            ("Detached VRFs", executed.vrfs_with("detach")),
            ("Deleted VRFs", executed.vrfs_with("delete")),
        ]))
    }

    /// Reads the targets. A query that only names VRFs and finds none
    /// leaves `response` unset.
    async fn query(
        &self,
        reader: &StateReader<'_>,
        cache: &mut StateCache,
        targets: &[Target],
        wait: &WaitConfig,
        result: &mut ModuleResult,
    ) -> Option<String> {
        let found = match read_targets(reader, cache, targets).await {
            Ok(found) => found,
            Err(e) => {
                result.add_failure(&e);
                return None;
            }
        };

        let found = if wait.enabled && !found.is_empty() {
            let waiter = DeploymentWaiter::from_config(*reader, wait);
            for vrf in &found {
                match waiter.wait(cache, &vrf.fabric, &vrf.vrf_name).await {
                    Ok(report) => {
                        result.waits.push(report.clone());
                        if let Err(e) = report.into_result() {
                            warn!("{e}");
                            result.add_error(e.to_string());
                        }
                    }
                    Err(e) => result.add_failure(&e),
                }
            }
            match read_targets(reader, cache, targets).await {
                Ok(found) => found,
                Err(e) => {
                    result.add_failure(&e);
                    return None;
                }
            }
        } else {
            found
        };

        let all_named = targets.iter().all(|t| t.vrf_name.is_some());
        if found.is_empty() && all_named {
            info!("No queried VRF exists");
        } else {
            let records = found
                .iter()
                .map(|vrf| {
                    ResponseRecord::read(
                        reader.paths().vrf(&vrf.fabric, &vrf.vrf_name),
                        serde_json::to_value(vrf).unwrap_or_default(),
                    )
                })
                .collect();
            result.response = Some(records);
        }

        Some(format!("Queried {} VRFs", found.len()))
    }
}

async fn read_targets(reader: &StateReader<'_>, cache: &mut StateCache, targets: &[Target]) -> Result<Vec<Vrf>> {
    let mut found: Vec<Vrf> = Vec::new();
    for target in targets {
        for vrf in reader.fetch(cache, &target.fabric, target.vrf_name.as_deref()).await? {
            if !found.iter().any(|f| f.key() == vrf.key()) {
                found.push(vrf);
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;
    use crate::controller::fake::FakeController;
    use crate::controller::{HttpMethod, V12Adapter};

    fn task(yaml: &str) -> TaskConfig {
        ConfigParser::new().parse_yaml(yaml, None).expect("valid task")
    }

    fn reconciler(fake: &FakeController) -> Reconciler<'_> {
        Reconciler::new(fake, Box::new(V12Adapter))
    }

    fn fabric() -> FakeController {
        let fake = FakeController::new();
        fake.add_fabric("f1", &[("10.0.0.1", "S1"), ("10.0.0.2", "S2")]);
        fake
    }

    const MERGED: &str = r"
state: merged
config:
  - fabric: f1
    vrf_name: vrf1
    vrf_id: 9008011
    vlan_id: 500
    attach:
      - ip_address: 10.0.0.1
        deployment: true
";

    #[tokio::test]
    async fn test_merged_create_attach_deploy_then_idempotent() {
        let fake = fabric();
        let reconciler = reconciler(&fake);

        let first = reconciler.run_task(&task(MERGED)).await;
        assert!(first.changed, "{:?}", first.errors);
        assert!(!first.failed);
        let calls: Vec<(HttpMethod, u16)> = first
            .response
            .iter()
            .flatten()
            .map(|r| (r.method, r.return_code))
            .collect();
        assert_eq!(calls, [(HttpMethod::Post, 200), (HttpMethod::Post, 200), (HttpMethod::Post, 200)]);
        let paths: Vec<&str> = first.response.iter().flatten().map(|r| r.request_path.as_str()).collect();
        assert!(paths[0].ends_with("/fabrics/f1/vrfs"));
        assert!(paths[1].ends_with("/vrfs/attachments"));
        assert!(paths[2].ends_with("/vrfs/deployments"));
        assert!(first.msg.as_deref().is_some_and(|m| m.contains("Created VRFs: vrf1")));

        let mutations = fake.mutating_calls().len();
        let second = reconciler.run_task(&task(MERGED)).await;
        assert!(!second.changed);
        assert_eq!(second.response, Some(Vec::new()));
        assert_eq!(second.msg.as_deref(), Some("No changes needed"));
        assert_eq!(fake.mutating_calls().len(), mutations);
    }

    #[tokio::test]
    async fn test_vrf_id_conflict_is_reported() {
        let fake = fabric();
        fake.seed_vrf("f1", "vrf1", 9_008_011, 500);
        let yaml = MERGED.replace("9008011", "9008012");

        let result = reconciler(&fake).run_task(&task(&yaml)).await;
        assert!(!result.changed);
        assert!(result.failed);
        assert!(
            result
                .msg
                .as_deref()
                .is_some_and(|m| m.contains("cannot be updated to a different value"))
        );
        assert!(fake.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_vrf_id_is_rejected() {
        let fake = fabric();
        let yaml = MERGED.replace("9008011", "9008012000000000");

        let result = reconciler(&fake).run_task(&task(&yaml)).await;
        assert!(!result.changed);
        let msg = result.msg.unwrap_or_default();
        assert!(msg.contains("vrf_id"));
        assert!(msg.contains("16777214"));
    }

    #[tokio::test]
    async fn test_overridden_replaces_fabric_vrf_set() {
        let fake = fabric();
        fake.seed_vrf("f1", "vrf1", 9_008_011, 500);
        fake.seed_attachment("f1", "vrf1", "10.0.0.1", true);

        let result = reconciler(&fake)
            .run_task(&task(
                r"
state: overridden
config:
  - fabric: f1
    vrf_name: vrf2
    vrf_id: 9008012
    vlan_id: 501
",
            ))
            .await;
        assert!(result.changed, "{:?}", result.errors);
        assert_eq!(fake.vrf_names("f1"), ["vrf2"]);

        let methods: Vec<HttpMethod> = fake.mutating_calls().into_iter().map(|(m, _)| m).collect();
        assert_eq!(methods, [HttpMethod::Delete, HttpMethod::Delete, HttpMethod::Post]);

        let query = reconciler(&fake)
            .run_task(&task("state: query\nconfig:\n  - fabric: f1\n"))
            .await;
        let records = query.response.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data["vrf_name"], "vrf2");
    }

    #[tokio::test]
    async fn test_deleted_with_empty_config_fails() {
        let fake = fabric();
        let result = reconciler(&fake).run_task(&task("state: deleted\nconfig: []\n")).await;

        assert!(result.failed);
        assert!(!result.changed);
        assert!(result.msg.unwrap_or_default().contains("config: element is required"));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_query_missing_named_vrf_has_no_response() {
        let fake = fabric();
        let result = reconciler(&fake)
            .run_task(&task("state: query\nconfig:\n  - fabric: f1\n    vrf_name: ghost\n"))
            .await;

        assert!(!result.changed);
        assert!(!result.failed);
        assert!(result.response.is_none());
    }

    #[tokio::test]
    async fn test_replaced_detaches_unlisted_switch() {
        let fake = fabric();
        fake.seed_vrf("f1", "vrf1", 9_008_011, 500);
        fake.seed_attachment("f1", "vrf1", "10.0.0.1", true);
        fake.seed_attachment("f1", "vrf1", "10.0.0.2", true);

        let yaml = MERGED.replace("state: merged", "state: replaced");
        let result = reconciler(&fake).run_task(&task(&yaml)).await;

        assert!(result.changed, "{:?}", result.errors);
        assert_eq!(fake.attachments("f1", "vrf1"), [(String::from("S1"), true)]);
        assert_eq!(result.diff[0].detach, ["10.0.0.2"]);
    }

    #[tokio::test]
    async fn test_merged_keeps_unset_template_values() {
        let fake = fabric();
        fake.seed_vrf("f1", "vrf1", 9_008_011, 500);
        fake.seed_config_value("f1", "vrf1", "tag", "12345");

        let yaml = r"
state: merged
config:
  - fabric: f1
    vrf_name: vrf1
    vrf_template_config:
      mtu: 1500
";
        let result = reconciler(&fake).run_task(&task(yaml)).await;
        assert!(result.changed, "{:?}", result.errors);

        let update = fake
            .calls()
            .into_iter()
            .find(|c| c.method == HttpMethod::Put)
            .and_then(|c| c.body)
            .expect("update call");
        let config = update["vrfTemplateConfig"].as_str().unwrap_or_default();
        assert!(config.contains("\"tag\":\"12345\""));
        assert!(config.contains("\"mtu\":\"1500\""));
    }

    #[tokio::test]
    async fn test_missing_fabric_ends_run() {
        let fake = fabric();
        let yaml = MERGED.replace("fabric: f1", "fabric: ghost");

        let result = reconciler(&fake).run_task(&task(&yaml)).await;
        assert!(result.failed);
        assert!(!result.changed);
        let records = result.response.expect("records");
        assert_eq!(records[0].method, HttpMethod::Get);
        assert_eq!(records[0].return_code, 404);
        assert!(fake.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_delete_fails_only_that_vrf() {
        let fake = fabric();
        fake.seed_vrf("f1", "vrf1", 9_008_011, 500);
        fake.seed_vrf("f1", "vrf2", 9_008_012, 501);
        fake.fail_on(HttpMethod::Delete, "/vrfs/vrf1", 400);

        let result = reconciler(&fake)
            .run_task(&task("state: deleted\nconfig:\n  - fabric: f1\n"))
            .await;

        assert!(result.failed);
        assert!(result.changed);
        assert_eq!(fake.vrf_names("f1"), ["vrf1"]);
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_check_mode_issues_no_mutations() {
        let fake = fabric();
        let yaml = format!("{MERGED}check_mode: true\n");

        let result = reconciler(&fake).run_task(&task(&yaml)).await;
        assert!(result.changed);
        assert_eq!(result.diff.len(), 1);
        assert!(fake.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_query_waits_for_deployment() {
        let fake = fabric();
        fake.seed_vrf("f1", "vrf1", 9_008_011, 500);
        fake.script_status("f1", "vrf1", &["PENDING", "DEPLOYED"]);

        let yaml = "state: query\nconfig:\n  - fabric: f1\n    vrf_name: vrf1\nwait:\n  enabled: true\n  retries: 5\n  delay_secs: 0\n";
        let result = reconciler(&fake).run_task(&task(yaml)).await;

        assert!(!result.failed, "{:?}", result.errors);
        assert_eq!(result.waits.len(), 1);
        assert!(result.waits[0].outcome.is_converged());
        let records = result.response.expect("records");
        assert_eq!(records[0].data["status"], "DEPLOYED");
    }

    #[tokio::test]
    async fn test_network_loss_fails_run() {
        let fake = fabric();
        fake.go_offline();

        let result = reconciler(&fake).run_task(&task(MERGED)).await;
        assert!(result.failed);
        assert!(result.msg.unwrap_or_default().contains("Network error"));
    }

    #[tokio::test]
    async fn test_overridden_keeps_vrf_whose_entry_was_rejected() {
        let fake = fabric();
        fake.seed_vrf("f1", "vrf1", 9_008_011, 500);
        fake.seed_vrf("f1", "vrf2", 9_008_012, 501);

        let result = reconciler(&fake)
            .run_task(&task(
                r"
state: overridden
config:
  - fabric: f1
    vrf_name: vrf1
    vrf_id: 99999999
  - fabric: f1
    vrf_name: vrf2
    vrf_id: 9008012
    vlan_id: 501
",
            ))
            .await;

        assert!(result.failed);
        assert!(result.errors[0].contains("vrf_id must be between"));
        assert_eq!(fake.vrf_names("f1"), ["vrf1", "vrf2"]);
        assert!(
            fake.mutating_calls()
                .iter()
                .all(|(method, _)| *method != HttpMethod::Delete)
        );
    }

    #[tokio::test]
    async fn test_deleted_with_attach_list_only_detaches() {
        let fake = fabric();
        fake.seed_vrf("f1", "vrf1", 9_008_011, 500);
        fake.seed_attachment("f1", "vrf1", "10.0.0.1", true);
        fake.seed_attachment("f1", "vrf1", "10.0.0.2", true);

        let result = reconciler(&fake)
            .run_task(&task(
                r"
state: deleted
config:
  - fabric: f1
    vrf_name: vrf1
    attach:
      - ip_address: 10.0.0.2
",
            ))
            .await;

        assert!(result.changed, "{:?}", result.errors);
        assert!(!result.failed);
        assert_eq!(fake.vrf_names("f1"), ["vrf1"]);
        assert_eq!(fake.attachments("f1", "vrf1"), [(String::from("S1"), true)]);
        let methods: Vec<(HttpMethod, String)> = fake.mutating_calls();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].0, HttpMethod::Delete);
        assert!(methods[0].1.ends_with("/vrfs/attachments"));
        assert_eq!(result.msg.as_deref(), Some("Detached VRFs: vrf1"));
    }

    #[tokio::test]
    async fn test_failed_read_keeps_controller_answer() {
        let fake = fabric();
        fake.fail_on(HttpMethod::Get, "/fabrics/f1/vrfs", 500);

        let result = reconciler(&fake).run_task(&task(MERGED)).await;

        assert!(result.failed);
        assert!(!result.changed);
        let records = result.response.expect("records");
        let failed = records.iter().find(|r| r.return_code == 500).expect("500 answer recorded");
        assert_eq!(failed.method, HttpMethod::Get);
        assert_eq!(failed.data["message"], "injected failure");
        assert!(fake.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_vrf_lite_attach_spares_sibling() {
        let fake = fabric();
        fake.fail_on_body(HttpMethod::Post, "/vrfs/attachments", "VRF_LITE_CONN", 400);

        let yaml = r"
state: merged
config:
  - fabric: f1
    vrf_name: vrf1
    vrf_id: 9008011
    vlan_id: 500
    attach:
      - ip_address: 10.0.0.1
        deployment: true
        extension_values:
          vrf_lite_conn:
            - if_name: Ethernet1/16
              dot1q_id: 2
              ip_mask: 10.33.0.2/30
              neighbor_ip: 10.33.0.1
  - fabric: f1
    vrf_name: vrf2
    vrf_id: 9008012
    vlan_id: 501
    attach:
      - ip_address: 10.0.0.2
        deployment: true
";
        let result = reconciler(&fake).run_task(&task(yaml)).await;

        assert!(result.changed);
        assert!(result.failed);
        let records = result.response.expect("records");
        let rejected: Vec<_> = records.iter().filter(|r| r.return_code == 400).collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].method, HttpMethod::Post);
        assert_eq!(rejected[0].data["message"], "injected failure");

        assert!(fake.attachments("f1", "vrf1").is_empty());
        assert_eq!(fake.attachments("f1", "vrf2"), [(String::from("S2"), true)]);
        let deploys: Vec<String> = fake
            .calls()
            .into_iter()
            .filter(|c| c.path.ends_with("/vrfs/deployments"))
            .filter_map(|c| c.body.map(|b| b["vrfNames"].to_string()))
            .collect();
        assert_eq!(deploys, ["\"vrf2\""]);
    }

    #[tokio::test]
    async fn test_query_wait_timeout_reports_last_status() {
        let fake = fabric();
        fake.seed_vrf("f1", "vrf1", 9_008_011, 500);
        fake.script_status("f1", "vrf1", &["PENDING"]);

        let yaml = "state: query\nconfig:\n  - fabric: f1\n    vrf_name: vrf1\nwait:\n  enabled: true\n  retries: 2\n  delay_secs: 0\n";
        let result = reconciler(&fake).run_task(&task(yaml)).await;

        assert!(result.failed);
        assert_eq!(result.waits.len(), 1);
        assert!(result.errors[0].contains("last status PENDING"));
    }

    #[test]
    fn test_auto_version_is_probed() {
        let fake = fabric();
        let reconciler = tokio_test::block_on(Reconciler::connect(&fake, &ControllerConfig::default()))
            .expect("probe");
        assert_eq!(reconciler.adapter.version(), ApiVersion::V12);
    }
}
