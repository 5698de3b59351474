// src/main.rs

//! codedeploy-trigger
//!
//! Entry point for the codedeploy-trigger CLI.
//!
//! Builds (or reads) an AppSpec, creates a CodeDeploy deployment with the
//! AppSpec inline, and waits for it to finish. All real work is delegated to
//! the `runner` module.
//!
//! Responsibilities of this file:
//! - Load `.env` and initialise logging
//! - Parse CLI arguments
//! - Map the outcome to a process exit code

mod cli;
mod client;
mod config;
mod context;
mod descriptor;
mod revision;
mod runner;
mod service;
mod sigv4;
mod util;
mod waiter;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine-readable (render / status).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = cli::Cli::parse();

    match runner::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
