//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidatedConfig;
use crate::controller::{WaitOutcome, WaitReport};
use crate::planner::{DiffResult, IntentKind, ReconcilePlan, VrfAction};
use crate::result::ModuleResult;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "VRF")]
    vrf: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Controller call row for table display.
#[derive(Tabled)]
struct ResponseRow {
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Code")]
    code: String,
}

/// Diff row for table display.
#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "VRF")]
    vrf: String,
    #[tabled(rename = "Change")]
    action: String,
    #[tabled(rename = "Fields")]
    fields: String,
    #[tabled(rename = "Switches")]
    switches: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a validation outcome.
    #[must_use]
    pub fn format_validation(&self, validated: &ValidatedConfig) -> String {
        match self.format {
            OutputFormat::Json => {
                let errors: Vec<_> = validated
                    .errors
                    .iter()
                    .map(|e| serde_json::json!({ "field": e.field, "message": e.message }))
                    .collect();
                let json = serde_json::json!({
                    "state": validated.verb(),
                    "valid": validated.is_valid(),
                    "entries": validated.desired.len(),
                    "fabrics": validated.fabrics(),
                    "errors": errors,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if validated.is_valid() {
                    format!("{} Task is valid.\n", "✓".green())
                } else {
                    format!("{} Task has errors:\n", "✗".red())
                };
                for error in &validated.errors {
                    let _ = writeln!(output, "   - {}: {}", error.field, error.message);
                }

                let _ = write!(
                    output,
                    "\nState: {}\nValid entries: {}\nFabrics: {}\n",
                    validated.verb(),
                    validated.desired.len(),
                    validated.fabrics().join(", ")
                );
                output
            }
        }
    }

    /// Formats a reconcile plan with the diff it came from.
    #[must_use]
    pub fn format_plan(&self, plan: &ReconcilePlan, diff: &DiffResult) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::new(plan, diff)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(plan, diff),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &ReconcilePlan, diff: &DiffResult) -> String {
        let mut output = String::new();

        for conflict in &diff.conflicts {
            let _ = writeln!(output, "{} {conflict}", "⚠".yellow());
        }

        if plan.is_empty() {
            let _ = writeln!(
                output,
                "{} No changes required - fabric is up to date.",
                "✓".green()
            );
            return output;
        }

        let _ = write!(output, "\nReconcile Plan ({})\n", plan.verb);
        let _ = write!(
            output,
            "   Config hash: {}\n\n",
            &plan.config_hash[..8.min(plan.config_hash.len())]
        );

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_intent(&a.kind),
                vrf: format!("{}/{}", a.fabric, a.vrf_name),
                reason: Self::truncate(&a.reason, 40),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to update, {} to delete, {} unchanged\n",
            diff.creates.to_string().green(),
            diff.updates.to_string().yellow(),
            diff.deletes.to_string().red(),
            diff.unchanged
        );

        output
    }

    /// Formats the result of a run.
    #[must_use]
    pub fn format_result(&self, result: &ModuleResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = if result.failed {
                    format!("{} Run failed", "✗".red())
                } else if result.changed {
                    format!("{} Changed", "✓".yellow())
                } else {
                    format!("{} Unchanged", "✓".green())
                };
                if let Some(msg) = &result.msg {
                    let _ = write!(output, ": {msg}");
                }
                output.push_str("\n\n");

                if !result.diff.is_empty() {
                    let rows: Vec<DiffRow> = result
                        .diff
                        .iter()
                        .map(|d| DiffRow {
                            vrf: format!("{}/{}", d.fabric, d.vrf_name),
                            action: Self::format_vrf_action(d.action),
                            fields: Self::truncate(
                                &d.fields.iter().map(|f| f.field.as_str()).collect::<Vec<_>>().join(", "),
                                30,
                            ),
                            switches: Self::switch_summary(&d.attach, &d.detach, &d.deploy_flag),
                        })
                        .collect();
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                if let Some(records) = result.response.as_ref().filter(|r| !r.is_empty()) {
                    let rows: Vec<ResponseRow> = records
                        .iter()
                        .map(|r| ResponseRow {
                            method: r.method.to_string(),
                            path: Self::truncate(&r.request_path, 60),
                            code: Self::format_code(r.return_code),
                        })
                        .collect();
                    output.push('\n');
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                for report in &result.waits {
                    let _ = writeln!(output, "   {}", self.format_wait(report));
                }

                if !result.errors.is_empty() {
                    let _ = write!(output, "\n{} Errors:\n", "⚠".yellow());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                }

                output
            }
        }
    }

    /// Formats a deployment wait report.
    #[must_use]
    pub fn format_wait(&self, report: &WaitReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                let marker = match report.outcome {
                    WaitOutcome::Converged(_) => "✓".green(),
                    WaitOutcome::Failed(_) => "✗".red(),
                    WaitOutcome::TimedOut(_) => "⚠".yellow(),
                };
                format!("{marker} {report}")
            }
        }
    }

    fn format_intent(kind: &IntentKind) -> String {
        match kind {
            IntentKind::CreateVrf(_) => "+create".green().to_string(),
            IntentKind::UpdateVrf(_) => "~update".yellow().to_string(),
            IntentKind::Attach(list) => format!("+attach ({})", list.len()).green().to_string(),
            IntentKind::Deploy => "deploy".cyan().to_string(),
            IntentKind::Detach(list) => format!("-detach ({})", list.len()).red().to_string(),
            IntentKind::DeleteVrf => "-delete".red().to_string(),
        }
    }

    fn format_vrf_action(action: VrfAction) -> String {
        match action {
            VrfAction::Create => "create".green().to_string(),
            VrfAction::Update => "update".yellow().to_string(),
            VrfAction::Delete => "delete".red().to_string(),
            VrfAction::NoOp => "attachments".dimmed().to_string(),
        }
    }

    fn format_code(code: u16) -> String {
        if (200..300).contains(&code) {
            code.to_string().green().to_string()
        } else {
            code.to_string().red().to_string()
        }
    }

    fn switch_summary(attach: &[String], detach: &[String], flip: &[String]) -> String {
        let mut parts = Vec::new();
        if !attach.is_empty() {
            parts.push(format!("+{}", attach.join(",")));
        }
        if !detach.is_empty() {
            parts.push(format!("-{}", detach.join(",")));
        }
        if !flip.is_empty() {
            parts.push(format!("~{}", flip.join(",")));
        }
        parts.join(" ")
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct PlanJson {
    config_hash: String,
    state: String,
    action_count: usize,
    creates: usize,
    updates: usize,
    deletes: usize,
    unchanged: usize,
    conflicts: Vec<String>,
    actions: Vec<ActionJson>,
}

#[derive(serde::Serialize)]
struct ActionJson {
    action: &'static str,
    fabric: String,
    vrf_name: String,
    reason: String,
    depends_on: Vec<usize>,
}

impl PlanJson {
    fn new(plan: &ReconcilePlan, diff: &DiffResult) -> Self {
        Self {
            config_hash: plan.config_hash.clone(),
            state: plan.verb.to_string(),
            action_count: plan.action_count(),
            creates: diff.creates,
            updates: diff.updates,
            deletes: diff.deletes,
            unchanged: diff.unchanged,
            conflicts: diff.conflicts.iter().map(ToString::to_string).collect(),
            actions: plan
                .actions
                .iter()
                .map(|a| ActionJson {
                    action: a.kind.label(),
                    fabric: a.fabric.clone(),
                    vrf_name: a.vrf_name.clone(),
                    reason: a.reason.clone(),
                    depends_on: a.dependencies.clone(),
                })
                .collect(),
        }
    }
}
