// src/cli.rs

use crate::descriptor::Descriptor;
use crate::util::parse_duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Create an AWS CodeDeploy deployment and wait for it to finish.
///
/// The AppSpec is either built from flags (ECS or Lambda) or read verbatim
/// from a file, then submitted inline together with its SHA-256.
#[derive(Parser, Debug)]
#[command(name = "codedeploy-trigger", version, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a deployment and block until it succeeds or fails.
    Deploy(DeployArgs),

    /// Print the AppSpec and its fingerprint without contacting CodeDeploy.
    Render(DescriptorArgs),

    /// Show the current status of an existing deployment.
    Status {
        /// Deployment ID returned by `deploy`
        #[arg(long, alias = "deploymentId")]
        deployment_id: String,

        /// Optional YAML file with region / endpoint overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// CodeDeploy application name
    #[arg(long, alias = "applicationName", default_value = "")]
    pub application_name: String,

    /// CodeDeploy deployment group name
    #[arg(long, alias = "deploymentGroupName", default_value = "")]
    pub deployment_group_name: String,

    /// Max wait duration for a deployment to finish
    ///
    /// Examples: 30m, 1h30m, 15m0s
    #[arg(
        long,
        alias = "maxWaitDuration",
        default_value = "30m",
        value_parser = parse_duration_arg
    )]
    pub max_wait_duration: Duration,

    /// Optional YAML file with region / endpoint / polling overrides
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub descriptor: DescriptorArgs,
}

/// Where the AppSpec comes from.
///
/// A file, when given, takes precedence and all kind-specific flags are
/// ignored.
#[derive(Args, Debug, Clone, Default)]
pub struct DescriptorArgs {
    /// Custom AppSpec file, submitted byte-for-byte
    #[arg(long, alias = "appSpecFileName")]
    pub app_spec_file_name: Option<PathBuf>,

    /// Deployment target (if --app-spec-file-name is unset)
    #[arg(long, value_enum)]
    pub target: Option<Target>,

    /// ECS task definition ARN
    #[arg(long, alias = "taskDefinitionARN", default_value = "")]
    pub task_definition_arn: String,

    /// ECS container name
    #[arg(long, alias = "containerName", default_value = "")]
    pub container_name: String,

    /// ECS container port
    #[arg(
        long,
        alias = "containerPort",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub container_port: i64,

    /// Lambda function name
    #[arg(long, alias = "functionName", default_value = "")]
    pub function_name: String,

    /// Lambda function alias
    #[arg(long, alias = "functionAlias", default_value = "")]
    pub function_alias: String,

    /// Current Lambda function version
    #[arg(long, alias = "currentVersion", default_value = "")]
    pub current_version: String,

    /// Target Lambda function version
    #[arg(long, alias = "targetVersion", default_value = "")]
    pub target_version: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    #[value(name = "ECS")]
    Ecs,
    #[value(name = "Lambda")]
    Lambda,
}

/// Validated AppSpec source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorSource {
    File(PathBuf),
    Built(Descriptor),
}

/// Validated `deploy` invocation.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub application_name: String,
    pub deployment_group_name: String,
    pub max_wait: Duration,
    pub source: DescriptorSource,
}

fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

/* ---------------- validation ---------------- */

pub fn check_not_empty<'a>(flag: &str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        bail!("attribute {:?} must not be empty", flag);
    }
    Ok(value)
}

pub fn check_port_range(flag: &str, value: i64) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| anyhow::anyhow!("attribute {:?} contains an invalid port number", flag))
}

pub fn check_duration(flag: &str, value: Duration) -> Result<Duration> {
    if value.is_zero() {
        bail!("attribute {:?} must be greater than zero", flag);
    }
    Ok(value)
}

pub fn check_target(flag: &str, value: Option<Target>) -> Result<Target> {
    value.ok_or_else(|| anyhow::anyhow!("attribute {:?} must be either \"ECS\" or \"Lambda\"", flag))
}

impl DescriptorArgs {
    pub fn validate(&self) -> Result<DescriptorSource> {
        if let Some(path) = &self.app_spec_file_name {
            check_not_empty("app-spec-file-name", &path.to_string_lossy())?;
            return Ok(DescriptorSource::File(path.clone()));
        }

        let descriptor = match check_target("target", self.target)? {
            Target::Ecs => Descriptor::ecs(
                check_not_empty("task-definition-arn", &self.task_definition_arn)?,
                check_not_empty("container-name", &self.container_name)?,
                check_port_range("container-port", self.container_port)?,
            ),
            Target::Lambda => Descriptor::lambda(
                check_not_empty("function-name", &self.function_name)?,
                check_not_empty("function-alias", &self.function_alias)?,
                check_not_empty("current-version", &self.current_version)?,
                check_not_empty("target-version", &self.target_version)?,
            ),
        };

        Ok(DescriptorSource::Built(descriptor))
    }
}

impl DeployArgs {
    pub fn validate(&self) -> Result<DeployPlan> {
        let max_wait = check_duration("max-wait-duration", self.max_wait_duration)?;
        let application_name = check_not_empty("application-name", &self.application_name)?;
        let deployment_group_name =
            check_not_empty("deployment-group-name", &self.deployment_group_name)?;

        Ok(DeployPlan {
            application_name: application_name.to_string(),
            deployment_group_name: deployment_group_name.to_string(),
            max_wait,
            source: self.descriptor.validate()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("codedeploy-trigger").chain(args.iter().copied()))
            .unwrap()
    }

    fn deploy_args(args: &[&str]) -> DeployArgs {
        match parse(args).command {
            Command::Deploy(a) => a,
            other => panic!("expected deploy, got {:?}", other),
        }
    }

    #[test]
    fn port_range_boundaries() {
        assert_eq!(check_port_range("p", 0).unwrap(), 0);
        assert_eq!(check_port_range("p", 65535).unwrap(), 65535);
        assert!(check_port_range("p", -1).is_err());
        assert!(check_port_range("p", 65536).is_err());
    }

    #[test]
    fn not_empty() {
        assert_eq!(check_not_empty("f", "foo").unwrap(), "foo");
        let err = check_not_empty("application-name", "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "attribute \"application-name\" must not be empty"
        );
    }

    #[test]
    fn duration_must_be_positive() {
        assert!(check_duration("d", Duration::from_nanos(1)).is_ok());
        assert!(check_duration("d", Duration::ZERO).is_err());
    }

    #[test]
    fn missing_target_is_rejected() {
        assert!(check_target("target", None).is_err());
        assert_eq!(check_target("target", Some(Target::Lambda)).unwrap(), Target::Lambda);
    }

    #[test]
    fn parses_every_flag() {
        let args = deploy_args(&[
            "deploy",
            "--max-wait-duration",
            "15m",
            "--application-name",
            "my-app",
            "--deployment-group-name",
            "my-group",
            "--target",
            "Lambda",
            "--app-spec-file-name",
            "my-file",
            "--task-definition-arn",
            "my-task-def",
            "--container-name",
            "my-container",
            "--container-port",
            "1337",
            "--function-name",
            "my-function",
            "--function-alias",
            "my-alias",
            "--current-version",
            "my-current-version",
            "--target-version",
            "my-target-version",
        ]);

        assert_eq!(args.max_wait_duration, Duration::from_secs(900));
        assert_eq!(args.application_name, "my-app");
        assert_eq!(args.deployment_group_name, "my-group");
        assert_eq!(args.descriptor.target, Some(Target::Lambda));
        assert_eq!(
            args.descriptor.app_spec_file_name,
            Some(PathBuf::from("my-file"))
        );
        assert_eq!(args.descriptor.task_definition_arn, "my-task-def");
        assert_eq!(args.descriptor.container_name, "my-container");
        assert_eq!(args.descriptor.container_port, 1337);
        assert_eq!(args.descriptor.function_name, "my-function");
        assert_eq!(args.descriptor.function_alias, "my-alias");
        assert_eq!(args.descriptor.current_version, "my-current-version");
        assert_eq!(args.descriptor.target_version, "my-target-version");
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        let args = deploy_args(&[
            "deploy",
            "--applicationName",
            "app",
            "--deploymentGroupName",
            "group",
            "--maxWaitDuration",
            "1h",
            "--appSpecFileName",
            "appspec.json",
        ]);

        assert_eq!(args.application_name, "app");
        assert_eq!(args.max_wait_duration, Duration::from_secs(3600));
    }

    #[test]
    fn default_max_wait_is_thirty_minutes() {
        let args = deploy_args(&["deploy"]);
        assert_eq!(args.max_wait_duration, Duration::from_secs(30 * 60));
    }

    #[test]
    fn file_takes_precedence_over_target() {
        let args = deploy_args(&[
            "deploy",
            "--application-name",
            "app",
            "--deployment-group-name",
            "group",
            "--target",
            "ECS",
            "--app-spec-file-name",
            "appspec.json",
        ]);

        let plan = args.validate().unwrap();
        assert_eq!(
            plan.source,
            DescriptorSource::File(PathBuf::from("appspec.json"))
        );
    }

    #[test]
    fn ecs_target_builds_descriptor() {
        let args = deploy_args(&[
            "deploy",
            "--application-name",
            "app",
            "--deployment-group-name",
            "group",
            "--target",
            "ECS",
            "--task-definition-arn",
            "arn:task",
            "--container-name",
            "web",
            "--container-port",
            "8080",
        ]);

        let plan = args.validate().unwrap();
        assert_eq!(
            plan.source,
            DescriptorSource::Built(Descriptor::ecs("arn:task", "web", 8080))
        );
    }

    #[test]
    fn ecs_target_rejects_out_of_range_port() {
        for port in ["-1", "65536"] {
            let args = deploy_args(&[
                "deploy",
                "--application-name",
                "app",
                "--deployment-group-name",
                "group",
                "--target",
                "ECS",
                "--task-definition-arn",
                "arn:task",
                "--container-name",
                "web",
                "--container-port",
                port,
            ]);

            let err = args.validate().unwrap_err();
            assert!(err.to_string().contains("invalid port number"), "{}", err);
        }
    }

    #[test]
    fn lambda_target_requires_versions() {
        let args = deploy_args(&[
            "deploy",
            "--application-name",
            "app",
            "--deployment-group-name",
            "group",
            "--target",
            "Lambda",
            "--function-name",
            "fn",
            "--function-alias",
            "live",
            "--current-version",
            "1",
        ]);

        let err = args.validate().unwrap_err();
        assert!(err.to_string().contains("target-version"));
    }

    #[test]
    fn unknown_target_is_a_parse_error() {
        let res = Cli::try_parse_from(["codedeploy-trigger", "deploy", "--target", "EC2"]);
        assert!(res.is_err());
    }

    #[test]
    fn missing_application_name_is_rejected_first() {
        let args = deploy_args(&["deploy", "--deployment-group-name", "group"]);
        let err = args.validate().unwrap_err();
        assert!(err.to_string().contains("application-name"));
    }

    #[test]
    fn zero_max_wait_is_rejected() {
        let args = deploy_args(&[
            "deploy",
            "--application-name",
            "app",
            "--deployment-group-name",
            "group",
            "--max-wait-duration",
            "0s",
            "--app-spec-file-name",
            "appspec.json",
        ]);
        assert!(args.validate().is_err());
    }
}
