// src/service.rs

//! Seams between the deployment lifecycle and the outside world.
//!
//! The orchestrator only talks to CodeDeploy, the clock and the filesystem
//! through these traits. Production implementations live in `client.rs`,
//! `waiter.rs` and [`FsReader`]; tests use the generated mocks.

use crate::revision::CreateDeploymentRequest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use mockall::automock;

/// Boxed error returned by boundary implementations.
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque identifier of a submitted deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(pub String);

impl DeploymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/* ---------------- status model ---------------- */

/// Output of `GetDeployment`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDeploymentOutput {
    pub deployment_info: Option<DeploymentInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub application_name: Option<String>,
    pub deployment_group_name: Option<String>,
    pub status: Option<DeploymentStatus>,
    pub error_information: Option<ErrorInformation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorInformation {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentStatus {
    Created,
    Queued,
    InProgress,
    Baking,
    Succeeded,
    Failed,
    Stopped,
    Ready,
    #[serde(other)]
    Unknown,
}

impl DeploymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeploymentStatus::Succeeded | DeploymentStatus::Failed | DeploymentStatus::Stopped
        )
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentStatus::Created => "Created",
            DeploymentStatus::Queued => "Queued",
            DeploymentStatus::InProgress => "InProgress",
            DeploymentStatus::Baking => "Baking",
            DeploymentStatus::Succeeded => "Succeeded",
            DeploymentStatus::Failed => "Failed",
            DeploymentStatus::Stopped => "Stopped",
            DeploymentStatus::Ready => "Ready",
            DeploymentStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Result of a status read.
///
/// The service layer may hand back a partially decoded output *and* an error
/// from the same call, so both channels are kept instead of a `Result`.
#[derive(Debug, Default)]
pub struct DeploymentLookup {
    pub output: Option<GetDeploymentOutput>,
    pub error: Option<ClientError>,
}

impl DeploymentLookup {
    pub fn ok(output: GetDeploymentOutput) -> Self {
        Self {
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(error: ClientError) -> Self {
        Self {
            output: None,
            error: Some(error),
        }
    }

    pub fn info(&self) -> Option<&DeploymentInfo> {
        self.output.as_ref()?.deployment_info.as_ref()
    }

    /// `errorInformation.message`, if the service populated it.
    pub fn error_message(&self) -> Option<&str> {
        self.info()?.error_information.as_ref()?.message.as_deref()
    }
}

/* ---------------- traits ---------------- */

/// Client for the deployment service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeploymentClient: Send + Sync {
    /// Submit a deployment and return its identifier.
    async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<DeploymentId, ClientError>;

    /// Read the current state of a deployment.
    async fn get_deployment(&self, id: &DeploymentId) -> DeploymentLookup;
}

/// Why a wait ended without success.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("wait for deployment cancelled")]
    Cancelled,

    #[error("exceeded max wait time for DeploymentSuccessful waiter ({max_wait:?})")]
    TimedOut { max_wait: Duration },

    #[error("waiter state transitioned to Failure (deployment status {status})")]
    DeploymentFailed { status: DeploymentStatus },

    #[error("cannot poll deployment status: {0}")]
    Poll(ClientError),
}

/// Blocks until a deployment succeeds, fails, times out or is cancelled.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeploymentWaiter: Send + Sync {
    async fn wait(
        &self,
        id: &DeploymentId,
        max_wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), WaitError>;
}

/// Source of descriptor files.
#[cfg_attr(test, automock)]
pub trait ContentReader: Send + Sync {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads descriptor files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl ContentReader for FsReader {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}
