//! Diff engine for comparing desired vs current VRF state.
//!
//! This module computes, per VRF, what has to change on the controller and,
//! per switch, what has to happen to its attachment.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::config::{Target, VerbConfig};
use crate::error::PlanError;
use crate::model::{Attachment, Verb, Vrf, VrfLiteConnection, VrfStatus};

/// Engine for computing diffs between desired and current states.
#[derive(Debug, Default)]
pub struct DiffEngine;

/// Difference for a single VRF.
#[derive(Debug, Clone)]
pub struct VrfDiff {
    /// Fabric name.
    pub fabric: String,
    /// VRF name.
    pub vrf_name: String,
    /// What happens to the VRF itself.
    pub action: VrfAction,
    /// Fields that differ.
    pub details: Vec<DiffDetail>,
    /// Per-switch attachment changes.
    pub attachments: Vec<AttachmentDiff>,
    /// Desired VRF (absent for deletions).
    pub desired: Option<Vrf>,
    /// Current VRF (absent for creations).
    pub current: Option<Vrf>,
    /// Whether a deployment must be triggered.
    pub deploy: bool,
}

/// Action on a VRF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VrfAction {
    /// VRF needs to be created.
    Create,
    /// VRF needs to be updated.
    Update,
    /// VRF is unchanged.
    NoOp,
    /// VRF needs to be torn down and deleted.
    Delete,
}

/// Difference for one switch attachment.
#[derive(Debug, Clone)]
pub struct AttachmentDiff {
    /// Switch management address.
    pub ip_address: String,
    /// What happens to the attachment.
    pub action: AttachAction,
    /// Desired attachment.
    pub desired: Option<Attachment>,
    /// Current attachment.
    pub current: Option<Attachment>,
}

/// Action on an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachAction {
    /// Attach, or re-attach with new values.
    Attach,
    /// Detach from the switch.
    Detach,
    /// Only the deployment flag changes.
    UpdateDeployFlag,
    /// Nothing to do.
    NoOp,
}

/// Detail about a specific difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffDetail {
    /// Field that differs.
    pub field: String,
    /// Current value.
    pub old_value: Option<String>,
    /// Desired value.
    pub new_value: Option<String>,
}

/// Complete diff result.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Per-VRF diffs; deletions first, then desired order.
    pub vrfs: Vec<VrfDiff>,
    /// VRFs left out because they would change an immutable field.
    pub conflicts: Vec<PlanError>,
    /// Number of VRFs to create.
    pub creates: usize,
    /// Number of VRFs to update.
    pub updates: usize,
    /// Number of VRFs to delete.
    pub deletes: usize,
    /// Number of unchanged VRFs.
    pub unchanged: usize,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between desired config and current controller state.
    ///
    /// `current` holds the VRFs of every fabric the desired config touches.
    #[must_use]
    pub fn compute(&self, desired: &VerbConfig, current: &[Vrf]) -> DiffResult {
        self.compute_keeping(desired, &[], current)
    }

    /// Like [`Self::compute`], but `overridden` never deletes the
    /// `(fabric, vrf_name)` pairs in `keep`.
    #[must_use]
    pub fn compute_keeping(&self, desired: &VerbConfig, keep: &[(String, String)], current: &[Vrf]) -> DiffResult {
        let current_by_key: HashMap<(&str, &str), &Vrf> =
            current.iter().map(|v| (v.key(), v)).collect();

        let mut result = DiffResult::default();

        match desired {
            VerbConfig::Merged(vrfs) => {
                Self::upserts(vrfs, &current_by_key, Verb::Merged, &mut result);
            }
            VerbConfig::Replaced(vrfs) => {
                Self::upserts(vrfs, &current_by_key, Verb::Replaced, &mut result);
            }
            VerbConfig::Overridden(vrfs) => {
                let mut named: HashSet<(&str, &str)> = vrfs.iter().map(Vrf::key).collect();
                named.extend(keep.iter().map(|(fabric, name)| (fabric.as_str(), name.as_str())));
                let fabrics: HashSet<&str> = vrfs.iter().map(|v| v.fabric.as_str()).collect();
                for vrf in current {
                    if fabrics.contains(vrf.fabric.as_str()) && !named.contains(&vrf.key()) {
                        debug!("Found unnamed VRF: {}/{}", vrf.fabric, vrf.vrf_name);
                        result.vrfs.push(Self::deletion(vrf));
                    }
                }
                Self::upserts(vrfs, &current_by_key, Verb::Overridden, &mut result);
            }
            VerbConfig::Deleted(targets) => Self::deletions(targets, current, &mut result),
            VerbConfig::Query(_) => {}
        }

        for diff in &result.vrfs {
            match diff.action {
                VrfAction::Create => result.creates += 1,
                VrfAction::Update => result.updates += 1,
                VrfAction::Delete => result.deletes += 1,
                VrfAction::NoOp => result.unchanged += 1,
            }
        }

        result
    }

    fn upserts(
        desired: &[Vrf],
        current: &HashMap<(&str, &str), &Vrf>,
        verb: Verb,
        result: &mut DiffResult,
    ) {
        for vrf in desired {
            match current.get(&vrf.key()) {
                None => result.vrfs.push(Self::creation(vrf)),
                Some(existing) => {
                    if let (Some(want), Some(have)) = (vrf.vrf_id, existing.vrf_id)
                        && want != have
                    {
                        result.conflicts.push(PlanError::ImmutableField {
                            fabric: vrf.fabric.clone(),
                            vrf_name: vrf.vrf_name.clone(),
                            field: String::from("vrf_id"),
                            current: have.to_string(),
                            desired: want.to_string(),
                        });
                        continue;
                    }
                    result
                        .vrfs
                        .push(Self::comparison(vrf, existing, verb.detaches_unlisted()));
                }
            }
        }
    }

    fn deletions(targets: &[Target], current: &[Vrf], result: &mut DiffResult) {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();

        for target in targets {
            let selected = current.iter().filter(|v| {
                v.fabric == target.fabric
                    && target.vrf_name.as_deref().is_none_or(|name| v.vrf_name == name)
            });
            for vrf in selected {
                if !seen.insert(vrf.key()) {
                    continue;
                }
                if target.switches.is_empty() {
                    result.vrfs.push(Self::deletion(vrf));
                } else {
                    result.vrfs.push(Self::detachment(vrf, &target.switches));
                }
            }
        }
    }

    /// Detaches the listed switches and keeps the VRF. Switches that are
    /// not attached are ignored.
    fn detachment(current: &Vrf, switches: &[String]) -> VrfDiff {
        VrfDiff {
            fabric: current.fabric.clone(),
            vrf_name: current.vrf_name.clone(),
            action: VrfAction::NoOp,
            details: Vec::new(),
            attachments: current
                .attachment_list()
                .iter()
                .filter(|a| switches.contains(&a.ip_address))
                .map(|a| AttachmentDiff {
                    ip_address: a.ip_address.clone(),
                    action: AttachAction::Detach,
                    desired: None,
                    current: Some(a.clone()),
                })
                .collect(),
            desired: None,
            current: Some(current.clone()),
            deploy: false,
        }
    }

    fn creation(desired: &Vrf) -> VrfDiff {
        let attachments: Vec<AttachmentDiff> = desired
            .attachment_list()
            .iter()
            .map(|a| AttachmentDiff {
                ip_address: a.ip_address.clone(),
                action: AttachAction::Attach,
                desired: Some(a.clone()),
                current: None,
            })
            .collect();

        let mut details = vec![detail("vrf_name", None, Some(desired.vrf_name.clone()))];
        if let Some(id) = desired.vrf_id {
            details.push(detail("vrf_id", None, Some(id.to_string())));
        }
        if let Some(vlan) = desired.vlan_id {
            details.push(detail("vlan_id", None, Some(vlan.to_string())));
        }

        VrfDiff {
            fabric: desired.fabric.clone(),
            vrf_name: desired.vrf_name.clone(),
            action: VrfAction::Create,
            details,
            deploy: desired.attachment_list().iter().any(|a| a.deployment),
            attachments,
            desired: Some(desired.clone()),
            current: None,
        }
    }

    fn deletion(current: &Vrf) -> VrfDiff {
        VrfDiff {
            fabric: current.fabric.clone(),
            vrf_name: current.vrf_name.clone(),
            action: VrfAction::Delete,
            details: vec![detail("vrf_name", Some(current.vrf_name.clone()), None)],
            attachments: current
                .attachment_list()
                .iter()
                .map(|a| AttachmentDiff {
                    ip_address: a.ip_address.clone(),
                    action: AttachAction::Detach,
                    desired: None,
                    current: Some(a.clone()),
                })
                .collect(),
            desired: None,
            current: Some(current.clone()),
            deploy: false,
        }
    }

    fn comparison(desired: &Vrf, current: &Vrf, detach_unlisted: bool) -> VrfDiff {
        let details = Self::field_details(desired, current);
        let attachments = Self::attachment_diffs(desired, current, detach_unlisted);

        let flag_raised = attachments.iter().any(|a| {
            matches!(a.action, AttachAction::Attach | AttachAction::UpdateDeployFlag)
                && a.desired.as_ref().is_some_and(|d| d.deployment)
        });
        let out_of_sync = current.status == VrfStatus::OutOfSync
            && desired.attachment_list().iter().any(|a| a.deployment);

        VrfDiff {
            fabric: desired.fabric.clone(),
            vrf_name: desired.vrf_name.clone(),
            action: if details.is_empty() {
                VrfAction::NoOp
            } else {
                VrfAction::Update
            },
            details,
            attachments,
            desired: Some(desired.clone()),
            current: Some(current.clone()),
            deploy: flag_raised || out_of_sync,
        }
    }

    /// Compares the mutable fields. Template parameters are compared only
    /// where the desired VRF sets them.
    fn field_details(desired: &Vrf, current: &Vrf) -> Vec<DiffDetail> {
        let mut details = Vec::new();

        if let Some(vlan) = desired.vlan_id
            && current.vlan_id != Some(vlan)
        {
            details.push(detail(
                "vlan_id",
                current.vlan_id.map(|v| v.to_string()),
                Some(vlan.to_string()),
            ));
        }
        if desired.vrf_template != current.vrf_template {
            details.push(detail(
                "vrf_template",
                Some(current.vrf_template.clone()),
                Some(desired.vrf_template.clone()),
            ));
        }
        if desired.vrf_extension_template != current.vrf_extension_template {
            details.push(detail(
                "vrf_extension_template",
                Some(current.vrf_extension_template.clone()),
                Some(desired.vrf_extension_template.clone()),
            ));
        }
        if let Some(template) = &desired.service_vrf_template
            && current.service_vrf_template.as_ref() != Some(template)
        {
            details.push(detail(
                "service_vrf_template",
                current.service_vrf_template.clone(),
                Some(template.clone()),
            ));
        }

        let have = current.template_config.to_wire();
        for (key, want) in desired.template_config.to_wire() {
            if have.get(&key) != Some(&want) {
                details.push(DiffDetail {
                    field: key.clone(),
                    old_value: have.get(&key).cloned(),
                    new_value: Some(want),
                });
            }
        }

        details
    }

    fn attachment_diffs(desired: &Vrf, current: &Vrf, detach_unlisted: bool) -> Vec<AttachmentDiff> {
        if desired.attachments.is_none() && !detach_unlisted {
            return Vec::new();
        }

        let mut diffs: Vec<AttachmentDiff> = desired
            .attachment_list()
            .iter()
            .map(|want| {
                let have = current.attachment(&want.ip_address);
                let action = have.map_or(AttachAction::Attach, |have| attach_action(want, have));
                AttachmentDiff {
                    ip_address: want.ip_address.clone(),
                    action,
                    desired: Some(want.clone()),
                    current: have.cloned(),
                }
            })
            .collect();

        if detach_unlisted {
            for have in current.attachment_list() {
                if desired.attachment(&have.ip_address).is_none() {
                    diffs.push(AttachmentDiff {
                        ip_address: have.ip_address.clone(),
                        action: AttachAction::Detach,
                        desired: None,
                        current: Some(have.clone()),
                    });
                }
            }
        }

        diffs
    }
}

/// Decides what an attachment present on both sides needs.
fn attach_action(want: &Attachment, have: &Attachment) -> AttachAction {
    let vlan_differs = matches!((want.vlan_id, have.vlan_id), (Some(w), Some(h)) if w != h);
    let lite_differs = match (&want.vrf_lite, &have.vrf_lite) {
        (Some(w), Some(h)) => !links_match(w, h),
        (Some(w), None) => !w.is_empty(),
        _ => false,
    };
    let freeform_differs = want
        .freeform_config
        .as_ref()
        .is_some_and(|w| have.freeform_config.as_ref() != Some(w));

    if vlan_differs || lite_differs || freeform_differs {
        AttachAction::Attach
    } else if want.deployment != have.deployment {
        AttachAction::UpdateDeployFlag
    } else {
        AttachAction::NoOp
    }
}

/// VRF-LITE links match when every desired link has a reported link on
/// the same interface agreeing on every field the desired link sets.
fn links_match(want: &[VrfLiteConnection], have: &[VrfLiteConnection]) -> bool {
    fn agrees<T: PartialEq>(want: Option<&T>, have: Option<&T>) -> bool {
        want.is_none() || want == have
    }

    want.len() == have.len()
        && want.iter().all(|w| {
            have.iter().any(|h| {
                w.if_name == h.if_name
                    && agrees(w.dot1q_id.as_ref(), h.dot1q_id.as_ref())
                    && agrees(w.ip_mask.as_ref(), h.ip_mask.as_ref())
                    && agrees(w.ipv6_mask.as_ref(), h.ipv6_mask.as_ref())
                    && agrees(w.neighbor_ip.as_ref(), h.neighbor_ip.as_ref())
                    && agrees(w.ipv6_neighbor.as_ref(), h.ipv6_neighbor.as_ref())
                    && agrees(w.neighbor_asn.as_ref(), h.neighbor_asn.as_ref())
                    && agrees(w.peer_vrf_name.as_ref(), h.peer_vrf_name.as_ref())
            })
        })
}

fn detail(field: &str, old_value: Option<String>, new_value: Option<String>) -> DiffDetail {
    DiffDetail {
        field: field.to_string(),
        old_value,
        new_value,
    }
}

impl VrfDiff {
    /// Returns true if anything has to be sent to the controller.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.action != VrfAction::NoOp
            || self.deploy
            || self.attachments.iter().any(|a| a.action != AttachAction::NoOp)
    }

    /// Returns the attachments with the given action.
    #[must_use]
    pub fn attachments_with(&self, action: AttachAction) -> Vec<&AttachmentDiff> {
        self.attachments.iter().filter(|a| a.action == action).collect()
    }
}

impl DiffResult {
    /// Returns true if nothing has to change.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.vrfs.iter().all(|d| !d.has_changes())
    }

    /// Returns the diffs that require controller calls.
    #[must_use]
    pub fn changes(&self) -> Vec<&VrfDiff> {
        self.vrfs.iter().filter(|d| d.has_changes()).collect()
    }
}

impl std::fmt::Display for VrfAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::NoOp => "no-op",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for AttachAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::UpdateDeployFlag => "update-deploy-flag",
            Self::NoOp => "no-op",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vrf(name: &str, id: u32) -> Vrf {
        let mut vrf = Vrf::new("f1", name);
        vrf.vrf_id = Some(id);
        vrf.vlan_id = Some(500);
        vrf
    }

    fn attached(mut vrf: Vrf, ips: &[(&str, bool)]) -> Vrf {
        vrf.attachments = Some(
            ips.iter()
                .map(|(ip, deploy)| {
                    let mut a = Attachment::new(*ip, *deploy);
                    a.vlan_id = Some(500);
                    a
                })
                .collect(),
        );
        vrf
    }

    #[test]
    fn test_missing_vrf_is_created_and_deployed() {
        let desired = VerbConfig::Merged(vec![attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)])]);
        let diff = DiffEngine::new().compute(&desired, &[]);

        assert_eq!(diff.creates, 1);
        assert_eq!(diff.vrfs[0].action, VrfAction::Create);
        assert_eq!(diff.vrfs[0].attachments_with(AttachAction::Attach).len(), 1);
        assert!(diff.vrfs[0].deploy);
    }

    #[test]
    fn test_converged_state_has_no_changes() {
        let current = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)]);
        let desired = VerbConfig::Merged(vec![current.clone()]);
        let diff = DiffEngine::new().compute(&desired, &[current]);

        assert!(diff.is_converged());
        assert_eq!(diff.unchanged, 1);
    }

    #[test]
    fn test_vrf_id_change_is_a_conflict() {
        let current = vrf("vrf1", 9_008_011);
        let desired = VerbConfig::Merged(vec![vrf("vrf1", 9_008_012), vrf("vrf2", 9_008_013)]);
        let diff = DiffEngine::new().compute(&desired, &[current]);

        assert_eq!(diff.conflicts.len(), 1);
        assert!(diff.conflicts[0].to_string().contains("cannot be updated to a different value"));
        assert_eq!(diff.vrfs.len(), 1, "sibling still planned");
        assert_eq!(diff.vrfs[0].vrf_name, "vrf2");
    }

    #[test]
    fn test_only_set_template_keys_are_compared() {
        let mut current = vrf("vrf1", 9_008_011);
        current.template_config.mtu = Some(9216);
        current.template_config.tag = Some(12345);

        let mut desired = vrf("vrf1", 9_008_011);
        desired.template_config.mtu = Some(1500);

        let diff = DiffEngine::new().compute(&VerbConfig::Merged(vec![desired]), &[current]);
        assert_eq!(diff.vrfs[0].action, VrfAction::Update);
        assert_eq!(diff.vrfs[0].details.len(), 1);
        assert_eq!(diff.vrfs[0].details[0].field, "mtu");
        assert_eq!(diff.vrfs[0].details[0].old_value.as_deref(), Some("9216"));
    }

    #[test]
    fn test_merged_leaves_unlisted_attachments() {
        let current = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true), ("10.0.0.2", true)]);
        let desired = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)]);

        let merged = DiffEngine::new().compute(&VerbConfig::Merged(vec![desired.clone()]), &[current.clone()]);
        assert!(merged.is_converged());

        let replaced = DiffEngine::new().compute(&VerbConfig::Replaced(vec![desired]), &[current]);
        let detached = replaced.vrfs[0].attachments_with(AttachAction::Detach);
        assert_eq!(detached.len(), 1);
        assert_eq!(detached[0].ip_address, "10.0.0.2");
    }

    #[test]
    fn test_replaced_without_attach_list_detaches_everything() {
        let current = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)]);
        let desired = vrf("vrf1", 9_008_011);

        let diff = DiffEngine::new().compute(&VerbConfig::Replaced(vec![desired]), &[current]);
        assert_eq!(diff.vrfs[0].attachments_with(AttachAction::Detach).len(), 1);
    }

    #[test]
    fn test_deploy_flag_flip() {
        let current = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", false)]);
        let desired = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)]);

        let diff = DiffEngine::new().compute(&VerbConfig::Merged(vec![desired]), &[current]);
        assert_eq!(diff.vrfs[0].action, VrfAction::NoOp);
        assert_eq!(diff.vrfs[0].attachments_with(AttachAction::UpdateDeployFlag).len(), 1);
        assert!(diff.vrfs[0].deploy);
    }

    #[test]
    fn test_vlan_change_reattaches() {
        let current = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)]);
        let mut desired = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)]);
        if let Some(list) = desired.attachments.as_mut() {
            list[0].vlan_id = Some(600);
        }

        let diff = DiffEngine::new().compute(&VerbConfig::Merged(vec![desired]), &[current]);
        assert_eq!(diff.vrfs[0].attachments_with(AttachAction::Attach).len(), 1);
    }

    #[test]
    fn test_out_of_sync_redeploys() {
        let mut current = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)]);
        current.status = VrfStatus::OutOfSync;
        let desired = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)]);

        let diff = DiffEngine::new().compute(&VerbConfig::Merged(vec![desired]), &[current]);
        assert!(diff.vrfs[0].deploy);
        assert!(!diff.is_converged());
    }

    #[test]
    fn test_overridden_deletes_unnamed_vrfs_first() {
        let keep = vrf("vrf1", 9_008_011);
        let drop = attached(vrf("vrf2", 9_008_012), &[("10.0.0.1", true)]);
        let mut elsewhere = vrf("vrf3", 9_008_013);
        elsewhere.fabric = String::from("f2");

        let diff = DiffEngine::new().compute(
            &VerbConfig::Overridden(vec![keep.clone()]),
            &[keep, drop, elsewhere],
        );

        assert_eq!(diff.deletes, 1);
        assert_eq!(diff.vrfs[0].vrf_name, "vrf2");
        assert_eq!(diff.vrfs[0].action, VrfAction::Delete);
        assert_eq!(diff.vrfs[0].attachments_with(AttachAction::Detach).len(), 1);
    }

    #[test]
    fn test_deleted_whole_fabric_and_missing_names() {
        let current = [vrf("vrf1", 1), vrf("vrf2", 2)];
        let targets = vec![
            Target {
                fabric: String::from("f1"),
                vrf_name: Some(String::from("ghost")),
                switches: Vec::new(),
            },
            Target {
                fabric: String::from("f1"),
                vrf_name: None,
                switches: Vec::new(),
            },
            Target {
                fabric: String::from("f1"),
                vrf_name: Some(String::from("vrf1")),
                switches: Vec::new(),
            },
        ];

        let diff = DiffEngine::new().compute(&VerbConfig::Deleted(targets), &current);
        assert_eq!(diff.deletes, 2);
    }

    #[test]
    fn test_vrf_lite_compares_only_set_fields() {
        let mut want = Attachment::new("10.0.0.1", true);
        want.vrf_lite = Some(vec![VrfLiteConnection {
            if_name: Some(String::from("Ethernet1/16")),
            dot1q_id: Some(2),
            ..VrfLiteConnection::default()
        }]);
        let mut have = want.clone();
        have.vrf_lite = Some(vec![VrfLiteConnection {
            if_name: Some(String::from("Ethernet1/16")),
            dot1q_id: Some(2),
            ip_mask: Some(String::from("10.33.0.2/30")),
            ..VrfLiteConnection::default()
        }]);
        assert_eq!(attach_action(&want, &have), AttachAction::NoOp);

        if let Some(links) = want.vrf_lite.as_mut() {
            links[0].dot1q_id = Some(3);
        }
        assert_eq!(attach_action(&want, &have), AttachAction::Attach);
    }

    #[test]
    fn test_overridden_keeps_rejected_entries() {
        let listed = vrf("vrf2", 9_008_012);
        let rejected = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true)]);
        let keep = vec![(String::from("f1"), String::from("vrf1"))];

        let diff = DiffEngine::new().compute_keeping(
            &VerbConfig::Overridden(vec![listed.clone()]),
            &keep,
            &[rejected, listed],
        );

        assert_eq!(diff.deletes, 0);
        assert!(diff.vrfs.iter().all(|d| d.vrf_name != "vrf1"));
    }

    #[test]
    fn test_deleted_with_switches_only_detaches() {
        let current = attached(vrf("vrf1", 9_008_011), &[("10.0.0.1", true), ("10.0.0.2", true)]);
        let targets = vec![Target {
            fabric: String::from("f1"),
            vrf_name: Some(String::from("vrf1")),
            switches: vec![String::from("10.0.0.2"), String::from("10.0.0.9")],
        }];

        let diff = DiffEngine::new().compute(&VerbConfig::Deleted(targets), &[current]);

        assert_eq!(diff.deletes, 0);
        assert_eq!(diff.vrfs[0].action, VrfAction::NoOp);
        let detached = diff.vrfs[0].attachments_with(AttachAction::Detach);
        assert_eq!(detached.len(), 1);
        assert_eq!(detached[0].ip_address, "10.0.0.2");
        assert!(!diff.is_converged());
    }
}
