// src/runner.rs

use crate::cli::{Cli, Command, DeployPlan, DescriptorArgs, DescriptorSource};
use crate::client::CodeDeployClient;
use crate::config::Config;
use crate::context::{read_descriptor, DeploymentContext};
use crate::revision::{self, fingerprint};
use crate::service::{ContentReader, DeploymentClient, DeploymentId, FsReader};
use crate::sigv4::Credentials;
use crate::util::format_duration;
use crate::waiter::PollingWaiter;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Entry point from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Deploy(args) => {
            let plan = args.validate()?;
            let cfg = Config::resolve(args.config.as_deref())?;
            deploy(plan, cfg).await
        }

        Command::Render(args) => render(&args, &FsReader),

        Command::Status {
            deployment_id,
            config,
        } => {
            let cfg = Config::resolve(config.as_deref())?;
            status(&DeploymentId::new(deployment_id), &client(&cfg)?).await
        }
    }
}

fn client(cfg: &Config) -> Result<CodeDeployClient> {
    let credentials = Credentials::from_env()?;
    CodeDeployClient::new(cfg, credentials)
}

/* ---------------- deploy ---------------- */

async fn deploy(plan: DeployPlan, cfg: Config) -> Result<()> {
    let client = client(&cfg)?;
    let waiter = PollingWaiter::new(client.clone(), cfg.poll_interval);
    let mut ctx = DeploymentContext::new(client, waiter, FsReader);

    info!(
        application = %plan.application_name,
        group = %plan.deployment_group_name,
        region = %cfg.region,
        "creating deployment"
    );

    match &plan.source {
        DescriptorSource::File(path) => ctx.stage_from_file(path)?,
        DescriptorSource::Built(descriptor) => ctx.stage_descriptor(descriptor)?,
    }

    let id = ctx
        .submit(&plan.application_name, &plan.deployment_group_name)
        .await?;

    info!(deployment_id = %id, "deployment created");
    debug!(state = %ctx.state(), "deployment state");
    info!(
        deployment_id = %id,
        max_wait = %format_duration(plan.max_wait),
        "waiting for deployment to finish"
    );

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("shutdown signal received, cancelling wait");
        cancel_on_signal.cancel();
    });

    let outcome = ctx.await_completion(&id, plan.max_wait, &cancel).await;
    signal_task.abort();
    debug!(deployment_id = %id, state = %ctx.state(), "wait finished");

    outcome.with_context(|| format!("deployment {} failed", id))?;

    info!(deployment_id = %id, "deployment finished successfully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/* ---------------- render ---------------- */

/// Dry run: print exactly what `deploy` would submit.
///
/// Content that `deploy` could not send is refused here too.
fn render(args: &DescriptorArgs, reader: &dyn ContentReader) -> Result<()> {
    let content = render_content(args, reader)?;
    let text = revision::content_text(&content)?;

    let out = serde_json::json!({
        "ok": true,
        "content": text,
        "sha256": fingerprint(&content),
        "bytes": content.len(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    Ok(())
}

fn render_content(args: &DescriptorArgs, reader: &dyn ContentReader) -> Result<Vec<u8>> {
    match args.validate()? {
        DescriptorSource::File(path) => Ok(read_descriptor(reader, &path)?),
        DescriptorSource::Built(descriptor) => {
            revision::serialize(&descriptor).context("Failed to serialise AppSpec")
        }
    }
}

/* ---------------- status ---------------- */

async fn status(id: &DeploymentId, client: &dyn DeploymentClient) -> Result<()> {
    let lookup = client.get_deployment(id).await;

    if let Some(e) = lookup.error {
        return Err(anyhow::anyhow!(e)).with_context(|| format!("cannot get deployment {}", id));
    }

    let info = lookup
        .output
        .and_then(|o| o.deployment_info)
        .with_context(|| format!("deployment {} returned no deployment info", id))?;

    let error = info.error_information.as_ref();
    let out = serde_json::json!({
        "deployment_id": id,
        "application_name": info.application_name,
        "deployment_group_name": info.deployment_group_name,
        "status": info.status,
        "error_code": error.and_then(|e| e.code.clone()),
        "error_message": error.and_then(|e| e.message.clone()),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    Ok(())
}
