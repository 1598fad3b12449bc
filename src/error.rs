//! Error types for the fabric VRF reconciler.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration, controller access, planning, and reconciliation.

use std::path::PathBuf;
use thiserror::Error;

use crate::controller::ControllerResponse;

/// HTTP status codes the controller uses for a definitive rejection.
/// These are never retried.
pub const NON_RETRYABLE_CODES: &[u16] = &[400, 404, 409];

/// Returns true for controller status codes worth another attempt.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 && !NON_RETRYABLE_CODES.contains(&status)
}

/// The main error type for the fabric VRF reconciler.
#[derive(Debug, Error)]
pub enum FabricError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Controller API errors.
    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The task file was not found.
    #[error("Task file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The task file could not be parsed.
    #[error("Failed to parse task file: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("{message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// The `config` list is empty or absent.
    #[error("config: element is required for state {state}")]
    EmptyConfig {
        /// The verb the task was run with.
        state: String,
    },
}

/// Controller API errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Authentication failed.
    #[error("Controller authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// The controller answered with a non-success status.
    #[error("Controller rejected {method} {path}: {status} - {message}")]
    Rejected {
        /// HTTP method of the call.
        method: String,
        /// Request path of the call.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Error message from the controller.
        message: String,
        /// The answer itself, when the caller did not already log it.
        response: Option<Box<ControllerResponse>>,
    },

    /// Network error.
    #[error("Network error communicating with controller: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the controller.
    #[error("Invalid response from controller: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// The fabric does not exist on the controller.
    #[error("Fabric {fabric} not found on controller")]
    FabricNotFound {
        /// Name of the missing fabric.
        fabric: String,
    },

    /// A VRF the caller required does not exist.
    #[error("VRF {vrf_name} not found in fabric {fabric}")]
    VrfNotFound {
        /// Fabric name.
        fabric: String,
        /// Name of the missing VRF.
        vrf_name: String,
    },

    /// A switch IP is not part of the fabric inventory.
    #[error("Switch {ip_address} not found in fabric {fabric} inventory")]
    SwitchNotFound {
        /// Fabric name.
        fabric: String,
        /// Management address of the switch.
        ip_address: String,
    },

    /// Timeout waiting for a VRF to reach a deployment state.
    #[error(
        "Timeout waiting for VRF {vrf_name} to reach state {expected_state} after {attempts} attempts (last status {last_status})"
    )]
    Timeout {
        /// Name of the VRF.
        vrf_name: String,
        /// Expected state that was not reached.
        expected_state: String,
        /// Last status the controller reported.
        last_status: String,
        /// Number of polls made.
        attempts: u32,
    },

    /// A VRF settled in a state other than the one waited for.
    #[error("VRF {vrf_name} settled as {status} instead of {expected_state}")]
    DeploymentFailed {
        /// Name of the VRF.
        vrf_name: String,
        /// Expected state that was not reached.
        expected_state: String,
        /// Status the VRF settled in.
        status: String,
    },
}

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// An immutable field differs between desired and current state.
    #[error("{fabric}/{vrf_name}: {field} cannot be updated to a different value (current {current}, desired {desired})")]
    ImmutableField {
        /// Fabric name.
        fabric: String,
        /// VRF name.
        vrf_name: String,
        /// Name of the immutable field.
        field: String,
        /// Value on the controller.
        current: String,
        /// Value in the task file.
        desired: String,
    },

    /// An intent could not run because an earlier intent failed.
    #[error("Skipped {intent}: an earlier operation on {vrf_name} failed")]
    DependencyFailed {
        /// VRF name.
        vrf_name: String,
        /// Description of the skipped intent.
        intent: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reconciliation was aborted.
    #[error("Reconciliation aborted: {reason}")]
    Aborted {
        /// Reason for abort.
        reason: String,
    },
}

/// Result type alias for fabric VRF operations.
pub type Result<T> = std::result::Result<T, FabricError>;

impl FabricError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Controller(ControllerError::NetworkError { .. }) => true,
            Self::Controller(ControllerError::Rejected { status, .. }) => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Returns the controller answer carried by a rejection.
    #[must_use]
    pub fn response(&self) -> Option<&ControllerResponse> {
        match self {
            Self::Controller(ControllerError::Rejected { response, .. }) => response.as_deref(),
            _ => None,
        }
    }

    /// Returns true if this error must end the whole run rather than one VRF.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Controller(
                ControllerError::FabricNotFound { .. }
                    | ControllerError::NetworkError { .. }
                    | ControllerError::AuthenticationFailed { .. }
            ) | Self::Reconcile(_)
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ControllerError {
    /// Creates a rejection error.
    #[must_use]
    pub fn rejected(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            method: method.into(),
            path: path.into(),
            status,
            message: message.into(),
            response: None,
        }
    }

    /// Creates a rejection error that keeps the controller's answer.
    #[must_use]
    pub fn from_response(response: ControllerResponse) -> Self {
        Self::Rejected {
            method: response.method.as_str().to_string(),
            path: response.path.clone(),
            status: response.return_code,
            message: response.reason(),
            response: Some(Box::new(response)),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
