//! Reconcile plan types and construction.
//!
//! A plan is an ordered list of intents. Each intent is one controller
//! operation on one VRF, and may depend on earlier intents.

use chrono::{DateTime, Utc};

use crate::model::{Attachment, Verb, Vrf};

use super::diff::{AttachAction, DiffResult, VrfAction, VrfDiff};

/// A complete reconcile plan.
#[derive(Debug)]
pub struct ReconcilePlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Hash of the task this plan is based on.
    pub config_hash: String,
    /// Verb the plan was computed for.
    pub verb: Verb,
    /// Planned intents in execution order.
    pub actions: Vec<PlannedIntent>,
}

/// A single planned intent.
#[derive(Debug, Clone)]
pub struct PlannedIntent {
    /// What to do.
    pub kind: IntentKind,
    /// Fabric name.
    pub fabric: String,
    /// VRF name.
    pub vrf_name: String,
    /// Reason for this intent.
    pub reason: String,
    /// Dependencies (intent indices that must succeed first).
    pub dependencies: Vec<usize>,
}

/// Kinds of intents in a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentKind {
    /// Create the VRF.
    CreateVrf(Vrf),
    /// Update the VRF to this body.
    UpdateVrf(Vrf),
    /// Attach (or re-attach) these switches.
    Attach(Vec<Attachment>),
    /// Trigger deployment of the VRF.
    Deploy,
    /// Detach these switches.
    Detach(Vec<Attachment>),
    /// Delete the VRF.
    DeleteVrf,
}

impl ReconcilePlan {
    /// Creates a plan from a diff result.
    ///
    /// Deletions come first. Each deleted VRF is detached before it is
    /// removed. Every other VRF gets a chain of
    /// create/update, attach, deploy and detach, each step depending on the
    /// one before it.
    #[must_use]
    pub fn from_diff(diff: &DiffResult, verb: Verb, config_hash: &str) -> Self {
        let mut actions: Vec<PlannedIntent> = Vec::new();

        for vrf_diff in diff.vrfs.iter().filter(|d| d.action == VrfAction::Delete) {
            let detached = attachments_of(vrf_diff, AttachAction::Detach);
            let mut dependencies = vec![];
            if !detached.is_empty() {
                dependencies.push(actions.len());
                actions.push(intent(
                    vrf_diff,
                    IntentKind::Detach(detached),
                    "Detaching before delete",
                    vec![],
                ));
            }
            actions.push(intent(vrf_diff, IntentKind::DeleteVrf, reason_for(verb), dependencies));
        }

        for vrf_diff in diff
            .vrfs
            .iter()
            .filter(|d| d.action != VrfAction::Delete && d.has_changes())
        {
            let mut chain: Vec<(IntentKind, String)> = Vec::new();

            match (vrf_diff.action, &vrf_diff.desired, &vrf_diff.current) {
                (VrfAction::Create, Some(desired), _) => {
                    chain.push((IntentKind::CreateVrf(desired.clone()), String::from("VRF not present")));
                }
                (VrfAction::Update, Some(desired), Some(current)) => {
                    let fields: Vec<&str> = vrf_diff.details.iter().map(|d| d.field.as_str()).collect();
                    chain.push((
                        IntentKind::UpdateVrf(update_body(verb, desired, current)),
                        format!("Changed: {}", fields.join(", ")),
                    ));
                }
                _ => {}
            }

            let mut attach = attachments_of(vrf_diff, AttachAction::Attach);
            attach.extend(attachments_of(vrf_diff, AttachAction::UpdateDeployFlag));
            if !attach.is_empty() {
                chain.push((IntentKind::Attach(attach), String::from("Attachments differ")));
            }

            if vrf_diff.deploy {
                chain.push((IntentKind::Deploy, String::from("Deployment requested")));
            }

            let detach = attachments_of(vrf_diff, AttachAction::Detach);
            if !detach.is_empty() {
                let reason = if verb == Verb::Deleted {
                    "Detach requested"
                } else {
                    "Switches not listed"
                };
                chain.push((IntentKind::Detach(detach), String::from(reason)));
            }

            let mut previous: Option<usize> = None;
            for (kind, reason) in chain {
                let idx = actions.len();
                actions.push(intent(vrf_diff, kind, &reason, previous.into_iter().collect()));
                previous = Some(idx);
            }
        }

        Self {
            created_at: Utc::now(),
            config_hash: config_hash.to_string(),
            verb,
            actions,
        }
    }

    /// Creates an empty plan (no changes needed).
    #[must_use]
    pub fn empty(verb: Verb, config_hash: &str) -> Self {
        Self {
            created_at: Utc::now(),
            config_hash: config_hash.to_string(),
            verb,
            actions: vec![],
        }
    }

    /// Returns true if the plan is empty (no changes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of intents.
    #[must_use]
    pub const fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns the number of intents of one kind, compared by label.
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.actions.iter().filter(|a| a.kind.label() == label).count()
    }
}

/// Builds the update body for an existing VRF.
///
/// `merged` keeps current values for everything the task leaves unset.
/// The other verbs send the task's values, keeping only the identity
/// fields the controller will not change.
fn update_body(verb: Verb, desired: &Vrf, current: &Vrf) -> Vrf {
    if verb == Verb::Merged {
        return desired.overlay_on(current);
    }

    let mut body = desired.clone();
    body.vrf_id = desired.vrf_id.or(current.vrf_id);
    body.vlan_id = desired.vlan_id.or(current.vlan_id);
    body
}

fn attachments_of(diff: &VrfDiff, action: AttachAction) -> Vec<Attachment> {
    diff.attachments_with(action)
        .into_iter()
        .filter_map(|a| match action {
            AttachAction::Detach => a.current.clone(),
            _ => a.desired.clone(),
        })
        .collect()
}

fn intent(diff: &VrfDiff, kind: IntentKind, reason: &str, dependencies: Vec<usize>) -> PlannedIntent {
    PlannedIntent {
        kind,
        fabric: diff.fabric.clone(),
        vrf_name: diff.vrf_name.clone(),
        reason: reason.to_string(),
        dependencies,
    }
}

const fn reason_for(verb: Verb) -> &'static str {
    match verb {
        Verb::Overridden => "VRF not in task",
        _ => "Deletion requested",
    }
}

impl IntentKind {
    /// Returns a short name for the intent.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CreateVrf(_) => "create",
            Self::UpdateVrf(_) => "update",
            Self::Attach(_) => "attach",
            Self::Deploy => "deploy",
            Self::Detach(_) => "detach",
            Self::DeleteVrf => "delete",
        }
    }
}

impl PlannedIntent {
    /// Returns a human-readable description of the intent.
    #[must_use]
    pub fn description(&self) -> String {
        let target = format!("{}/{}", self.fabric, self.vrf_name);
        match &self.kind {
            IntentKind::CreateVrf(_) => format!("Create VRF '{target}'"),
            IntentKind::UpdateVrf(_) => format!("Update VRF '{target}'"),
            IntentKind::Attach(list) => format!("Attach '{target}' to {}", switches(list)),
            IntentKind::Deploy => format!("Deploy VRF '{target}'"),
            IntentKind::Detach(list) => format!("Detach '{target}' from {}", switches(list)),
            IntentKind::DeleteVrf => format!("Delete VRF '{target}'"),
        }
    }
}

fn switches(list: &[Attachment]) -> String {
    list.iter()
        .map(|a| a.ip_address.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl std::fmt::Display for PlannedIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ReconcilePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Reconcile Plan, {} ({} actions):", self.verb, self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }
        Ok(())
    }
}
