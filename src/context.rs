// src/context.rs

//! Lifecycle of a single deployment.
//!
//! A [`DeploymentContext`] is created once per invocation and walks through
//! `Empty → Staged → Submitted → Succeeded | Failed`:
//!
//! - `stage*` stores the exact descriptor bytes (staging again overwrites)
//! - `submit` fingerprints those bytes and creates the deployment
//! - `await_completion` blocks on the waiter and, on failure, reads the
//!   deployment status once more to surface the service's own error message
//!
//! Nothing is retried here.

use crate::descriptor::Descriptor;
use crate::revision::{self, CreateDeploymentRequest};
use crate::service::{
    ClientError, ContentReader, DeploymentClient, DeploymentId, DeploymentLookup,
    DeploymentWaiter, WaitError,
};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Failures of the deployment lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("cannot stage app spec: {path:?} is empty")]
    EmptyInput { path: PathBuf },

    #[error("cannot read file {path:?}: {error}")]
    FileRead { path: PathBuf, error: std::io::Error },

    #[error("cannot marshal JSON: {0}")]
    Serialization(serde_json::Error),

    #[error("cannot create deployment: app spec is empty")]
    NotStaged,

    #[error("cannot create deployment: {0}")]
    Submission(ClientError),

    #[error(transparent)]
    Wait(WaitError),

    #[error("{detail} ({wait})")]
    WaitWithDetail { detail: String, wait: WaitError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentState {
    Empty,
    Staged,
    Submitted(DeploymentId),
    Succeeded,
    Failed,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentState::Empty => f.write_str("empty"),
            DeploymentState::Staged => f.write_str("staged"),
            DeploymentState::Submitted(id) => write!(f, "submitted ({id})"),
            DeploymentState::Succeeded => f.write_str("succeeded"),
            DeploymentState::Failed => f.write_str("failed"),
        }
    }
}

/// Owns the collaborators and the staged descriptor for one deployment.
pub struct DeploymentContext<C, W, R> {
    client: C,
    waiter: W,
    reader: R,
    staged: Option<Vec<u8>>,
    state: DeploymentState,
}

impl<C, W, R> DeploymentContext<C, W, R>
where
    C: DeploymentClient,
    W: DeploymentWaiter,
    R: ContentReader,
{
    pub fn new(client: C, waiter: W, reader: R) -> Self {
        Self {
            client,
            waiter,
            reader,
            staged: None,
            state: DeploymentState::Empty,
        }
    }

    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    /// Bytes that the next `submit` will send.
    #[cfg(test)]
    pub fn staged(&self) -> Option<&[u8]> {
        self.staged.as_deref()
    }

    /// Stage raw descriptor bytes verbatim.
    pub fn stage(&mut self, bytes: Vec<u8>) {
        debug!(bytes = bytes.len(), "app spec staged");
        self.staged = Some(bytes);
        self.state = DeploymentState::Staged;
    }

    /// Serialise a built descriptor and stage the result.
    pub fn stage_descriptor(&mut self, descriptor: &Descriptor) -> Result<(), DeployError> {
        let bytes = revision::serialize(descriptor).map_err(DeployError::Serialization)?;
        self.stage(bytes);
        Ok(())
    }

    /// Read a user-supplied descriptor through the content reader and stage it.
    pub fn stage_from_file(&mut self, path: &Path) -> Result<(), DeployError> {
        let bytes = read_descriptor(&self.reader, path)?;
        self.stage(bytes);
        Ok(())
    }

    /// Create the deployment from the staged bytes.
    ///
    /// The staged bytes are kept, so a second call resubmits the same content.
    pub async fn submit(
        &mut self,
        application_name: &str,
        deployment_group_name: &str,
    ) -> Result<DeploymentId, DeployError> {
        let content = self.staged.clone().ok_or(DeployError::NotStaged)?;

        let request =
            CreateDeploymentRequest::inline(application_name, deployment_group_name, content);

        debug!(
            sha256 = %request.revision.app_spec_content.sha256,
            "submitting inline revision"
        );

        let id = self
            .client
            .create_deployment(&request)
            .await
            .map_err(DeployError::Submission)?;

        self.state = DeploymentState::Submitted(id.clone());
        Ok(id)
    }

    /// Wait for the deployment to finish.
    ///
    /// When the wait fails for any reason other than cancellation, the status
    /// is read once more. The service's error message is folded into the
    /// returned error only if the lookup produced output carrying
    /// `errorInformation.message` *and* the lookup itself reported an error.
    /// In every other case the wait error is returned as-is.
    pub async fn await_completion(
        &mut self,
        id: &DeploymentId,
        max_wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), DeployError> {
        let wait_err = match self.waiter.wait(id, max_wait, cancel).await {
            Ok(()) => {
                self.state = DeploymentState::Succeeded;
                return Ok(());
            }
            Err(e) => e,
        };

        self.state = DeploymentState::Failed;

        if matches!(wait_err, WaitError::Cancelled) {
            warn!(deployment_id = %id, "wait cancelled, skipping status lookup");
            return Err(DeployError::Wait(wait_err));
        }

        let lookup = self.client.get_deployment(id).await;
        Err(reconcile(wait_err, lookup))
    }
}

/// Read a descriptor file, refusing empty content.
pub fn read_descriptor(reader: &dyn ContentReader, path: &Path) -> Result<Vec<u8>, DeployError> {
    let bytes = reader.read(path).map_err(|error| DeployError::FileRead {
        path: path.to_path_buf(),
        error,
    })?;

    if bytes.is_empty() {
        return Err(DeployError::EmptyInput {
            path: path.to_path_buf(),
        });
    }

    Ok(bytes)
}

fn reconcile(wait_err: WaitError, lookup: DeploymentLookup) -> DeployError {
    debug!(
        has_output = lookup.output.is_some(),
        has_error = lookup.error.is_some(),
        "status lookup after failed wait"
    );

    match (lookup.error_message(), &lookup.error) {
        (Some(detail), Some(_)) => {
            info!(detail, "deployment reported error information");
            DeployError::WaitWithDetail {
                detail: detail.to_string(),
                wait: wait_err,
            }
        }
        _ => DeployError::Wait(wait_err),
    }
}
