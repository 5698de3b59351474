// src/config.rs

use crate::util::{deserialize_opt_duration, read_to_string};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Optional YAML file passed with `--config`.
///
/// Example:
///
/// region: eu-west-1
/// endpoint: http://localhost:4566
/// poll_interval: 15s
/// request_timeout: 60s
///
/// Every key is optional. Anything missing falls back to the environment,
/// then to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub poll_interval: Option<Duration>,

    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub request_timeout: Option<Duration>,
}

impl ConfigFile {
    /// Load and parse a config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_to_string(path)?;

        let cfg: ConfigFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse YAML config {:?}", path))?;

        Ok(cfg)
    }
}

/// Fully resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub region: String,
    pub endpoint: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Resolve settings from an optional config file and the process environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => ConfigFile::load(p)?,
            None => ConfigFile::default(),
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Merge a config file with an environment lookup.
    ///
    /// Precedence: file → `AWS_REGION` → `AWS_DEFAULT_REGION` for the region,
    /// file → `AWS_ENDPOINT_URL_CODEDEPLOY` → `AWS_ENDPOINT_URL` → regional
    /// default for the endpoint.
    pub fn from_sources(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let region = file
            .region
            .or_else(|| non_empty("AWS_REGION"))
            .or_else(|| non_empty("AWS_DEFAULT_REGION"))
            .context("No AWS region configured (set `region` in the config file or AWS_REGION)")?;

        let endpoint = file
            .endpoint
            .or_else(|| non_empty("AWS_ENDPOINT_URL_CODEDEPLOY"))
            .or_else(|| non_empty("AWS_ENDPOINT_URL"))
            .unwrap_or_else(|| format!("https://codedeploy.{region}.amazonaws.com"));

        let poll_interval = file.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        let request_timeout = file.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        if poll_interval.is_zero() {
            bail!("poll_interval must be greater than zero");
        }
        if request_timeout.is_zero() {
            bail!("request_timeout must be greater than zero");
        }

        Ok(Self {
            region,
            endpoint,
            poll_interval,
            request_timeout,
        })
    }
}
