//! Result of one reconcile run.
//!
//! A [`ModuleResult`] is created empty when a run starts, filled in as the
//! run goes, and returned once. Its JSON form is the tool's output.

use serde::Serialize;
use serde_json::Value;

use crate::controller::{ControllerResponse, HttpMethod, WaitReport};
use crate::error::FabricError;
use crate::planner::{AttachAction, DiffDetail, VrfAction, VrfDiff};

/// One controller call as reported to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    /// HTTP method.
    #[serde(rename = "METHOD")]
    pub method: HttpMethod,
    /// Request path.
    #[serde(rename = "REQUEST_PATH")]
    pub request_path: String,
    /// HTTP status code.
    #[serde(rename = "RETURN_CODE")]
    pub return_code: u16,
    /// Status message.
    #[serde(rename = "MESSAGE")]
    pub message: String,
    /// Response body.
    #[serde(rename = "DATA")]
    pub data: Value,
}

/// Structured before/after of one touched VRF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    /// Fabric name.
    pub fabric: String,
    /// VRF name.
    pub vrf_name: String,
    /// What happens to the VRF.
    pub action: VrfAction,
    /// Changed fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DiffDetail>,
    /// Switches to attach or re-attach.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attach: Vec<String>,
    /// Switches to detach.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detach: Vec<String>,
    /// Switches whose deployment flag flips.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deploy_flag: Vec<String>,
    /// Whether a deployment is triggered.
    pub deploy: bool,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleResult {
    /// At least one mutating call succeeded.
    pub changed: bool,
    /// At least one error was reported.
    pub failed: bool,
    /// Human-readable summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Per-item error messages.
    pub errors: Vec<String>,
    /// Controller calls (mutating verbs) or queried state (`query`).
    pub response: Option<Vec<ResponseRecord>>,
    /// Per-VRF diff.
    pub diff: Vec<DiffEntry>,
    /// Deployment waits, when requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub waits: Vec<WaitReport>,
}

impl From<ControllerResponse> for ResponseRecord {
    fn from(response: ControllerResponse) -> Self {
        Self {
            method: response.method,
            request_path: response.path,
            return_code: response.return_code,
            message: response.message,
            data: response.data,
        }
    }
}

impl ResponseRecord {
    /// Builds a record for state read by a query.
    #[must_use]
    pub fn read(request_path: impl Into<String>, data: Value) -> Self {
        Self {
            method: HttpMethod::Get,
            request_path: request_path.into(),
            return_code: 200,
            message: String::from("OK"),
            data,
        }
    }
}

impl From<&VrfDiff> for DiffEntry {
    fn from(diff: &VrfDiff) -> Self {
        let ips = |action: AttachAction| {
            diff.attachments_with(action)
                .into_iter()
                .map(|a| a.ip_address.clone())
                .collect::<Vec<_>>()
        };

        Self {
            fabric: diff.fabric.clone(),
            vrf_name: diff.vrf_name.clone(),
            action: diff.action,
            fields: diff.details.clone(),
            attach: ips(AttachAction::Attach),
            detach: ips(AttachAction::Detach),
            deploy_flag: ips(AttachAction::UpdateDeployFlag),
            deploy: diff.deploy,
        }
    }
}

impl ModuleResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a failed result carrying a single error.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.add_error(message);
        result.finish(None);
        result
    }

    /// Records an error.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Records an error, logging the controller answer it carries.
    pub fn add_failure(&mut self, error: &FabricError) {
        if let Some(response) = error.response() {
            self.record([response.clone()]);
        }
        self.add_error(error.to_string());
    }

    /// Appends controller calls to the response log.
    pub fn record(&mut self, responses: impl IntoIterator<Item = ControllerResponse>) {
        self.response
            .get_or_insert_with(Vec::new)
            .extend(responses.into_iter().map(ResponseRecord::from));
    }

    /// Sets `failed` from the collected errors and fills in the message.
    ///
    /// A failed run reports its errors; otherwise `summary` is used.
    pub fn finish(&mut self, summary: Option<String>) {
        self.failed = !self.errors.is_empty();
        self.msg = if self.failed {
            Some(self.errors.join("; "))
        } else {
            summary
        };
    }
}

/// Builds a run summary such as `Created VRFs: vrf1; Deleted VRFs: vrf2`.
#[must_use]
pub fn change_summary(groups: &[(&str, Vec<String>)]) -> String {
    let parts: Vec<String> = groups
        .iter()
        .filter(|(_, names)| !names.is_empty())
        .map(|(title, names)| format!("{title}: {}", names.join(", ")))
        .collect();

    if parts.is_empty() {
        String::from("No changes needed")
    } else {
        parts.join("; ")
    }
}
