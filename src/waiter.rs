// src/waiter.rs

//! Polling implementation of [`DeploymentWaiter`].
//!
//! Mirrors the `DeploymentSuccessful` waiter semantics:
//! - `Succeeded` → success
//! - `Failed` / `Stopped` → failure
//! - a status read error → returned immediately
//! - anything else → sleep `interval` and poll again until `max_wait`
//!
//! Cancellation is checked before every poll and while sleeping. A `max_wait`
//! too large to be represented as a deadline means no deadline at all.

use crate::service::{DeploymentClient, DeploymentId, DeploymentStatus, DeploymentWaiter, WaitError};

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct PollingWaiter<C> {
    client: C,
    interval: Duration,
}

impl<C: DeploymentClient> PollingWaiter<C> {
    pub fn new(client: C, interval: Duration) -> Self {
        Self { client, interval }
    }
}

#[async_trait]
impl<C: DeploymentClient> DeploymentWaiter for PollingWaiter<C> {
    async fn wait(
        &self,
        id: &DeploymentId,
        max_wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), WaitError> {
        let deadline = Instant::now().checked_add(max_wait);
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(WaitError::Cancelled);
            }

            attempt += 1;

            let lookup = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(WaitError::Cancelled),
                lookup = self.client.get_deployment(id) => lookup,
            };

            if let Some(err) = lookup.error {
                return Err(WaitError::Poll(err));
            }

            let status = lookup
                .output
                .and_then(|o| o.deployment_info)
                .and_then(|i| i.status);

            debug!(deployment_id = %id, attempt, ?status, "polled deployment status");

            match status {
                Some(DeploymentStatus::Succeeded) => return Ok(()),
                Some(status) if status.is_terminal() => {
                    return Err(WaitError::DeploymentFailed { status });
                }
                _ => {}
            }

            if let Some(deadline) = deadline {
                let next_poll = Instant::now().checked_add(self.interval);
                if next_poll.map_or(true, |next| next > deadline) {
                    return Err(WaitError::TimedOut { max_wait });
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(WaitError::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
