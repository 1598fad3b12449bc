//! Polling for asynchronous VRF deployment.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::WaitConfig;
use crate::error::{ControllerError, FabricError, Result};
use crate::model::VrfStatus;

use super::cache::StateCache;
use super::reader::StateReader;

/// How a deployment wait ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// The VRF reached `DEPLOYED`.
    Converged(VrfStatus),
    /// The VRF settled in a failed state.
    Failed(VrfStatus),
    /// Polls ran out; carries the last status seen.
    TimedOut(VrfStatus),
}

/// Result of waiting on one VRF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitReport {
    /// Fabric name.
    pub fabric: String,
    /// VRF name.
    pub vrf_name: String,
    /// How the wait ended.
    pub outcome: WaitOutcome,
    /// Number of polls made.
    pub attempts: u32,
}

/// Polls a VRF's status until it settles or a retry budget runs out.
#[derive(Debug)]
pub struct DeploymentWaiter<'a> {
    reader: StateReader<'a>,
    retries: u32,
    delay: Duration,
}

impl<'a> DeploymentWaiter<'a> {
    /// Creates a waiter polling through `reader`.
    #[must_use]
    pub const fn new(reader: StateReader<'a>, retries: u32, delay: Duration) -> Self {
        Self {
            reader,
            retries,
            delay,
        }
    }

    /// Creates a waiter from the task's wait settings.
    #[must_use]
    pub const fn from_config(reader: StateReader<'a>, config: &WaitConfig) -> Self {
        Self::new(reader, config.retries, Duration::from_secs(config.delay_secs))
    }

    /// Waits for a VRF to finish deploying.
    ///
    /// Every poll bypasses the cache. A wait that runs out of polls is an
    /// outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the VRF does not exist or a read fails.
    pub async fn wait(&self, cache: &mut StateCache, fabric: &str, vrf_name: &str) -> Result<WaitReport> {
        let attempts = self.retries.max(1);
        let mut last = VrfStatus::default();

        for attempt in 1..=attempts {
            cache.invalidate(fabric);
            last = self.reader.fetch_exact(cache, fabric, vrf_name).await?.status;
            debug!("{fabric}/{vrf_name} is {last} (poll {attempt}/{attempts})");

            if last.is_terminal() {
                info!("{fabric}/{vrf_name} settled as {last}");
                let outcome = if last == VrfStatus::Deployed {
                    WaitOutcome::Converged(last)
                } else {
                    WaitOutcome::Failed(last)
                };
                return Ok(report(fabric, vrf_name, outcome, attempt));
            }

            if attempt < attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        warn!("{fabric}/{vrf_name} still {last} after {attempts} polls");
        Ok(report(fabric, vrf_name, WaitOutcome::TimedOut(last), attempts))
    }
}

fn report(fabric: &str, vrf_name: &str, outcome: WaitOutcome, attempts: u32) -> WaitReport {
    WaitReport {
        fabric: fabric.to_string(),
        vrf_name: vrf_name.to_string(),
        outcome,
        attempts,
    }
}

impl WaitOutcome {
    /// Returns true if the VRF reached `DEPLOYED`.
    #[must_use]
    pub const fn is_converged(&self) -> bool {
        matches!(self, Self::Converged(_))
    }

    /// Returns the last status seen.
    #[must_use]
    pub const fn status(&self) -> &VrfStatus {
        match self {
            Self::Converged(s) | Self::Failed(s) | Self::TimedOut(s) => s,
        }
    }
}

impl WaitReport {
    /// Turns a non-converged report into an error.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::DeploymentFailed`] when the VRF settled
    /// out of sync and [`ControllerError::Timeout`] when polls ran out.
    pub fn into_result(self) -> Result<Self> {
        let expected_state = VrfStatus::Deployed.to_string();
        match self.outcome {
            WaitOutcome::Converged(_) => Ok(self),
            WaitOutcome::Failed(status) => Err(FabricError::Controller(ControllerError::DeploymentFailed {
                vrf_name: format!("{}/{}", self.fabric, self.vrf_name),
                expected_state,
                status: status.to_string(),
            })),
            WaitOutcome::TimedOut(status) => Err(FabricError::Controller(ControllerError::Timeout {
                vrf_name: format!("{}/{}", self.fabric, self.vrf_name),
                expected_state,
                last_status: status.to_string(),
                attempts: self.attempts,
            })),
        }
    }
}

impl std::fmt::Display for WaitReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = match self.outcome {
            WaitOutcome::Converged(_) => "converged",
            WaitOutcome::Failed(_) => "failed",
            WaitOutcome::TimedOut(_) => "timed out",
        };
        write!(
            f,
            "{}/{}: {verdict} ({}, {} polls)",
            self.fabric,
            self.vrf_name,
            self.outcome.status(),
            self.attempts
        )
    }
}
