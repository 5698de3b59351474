// src/descriptor.rs

//! AppSpec descriptor model.
//!
//! A descriptor is the versioned document CodeDeploy reads to learn what to
//! deploy and where. This crate only ever builds descriptors with a single
//! resource, but the schema keeps `Resources` as a list.
//!
//! The kind tag (`Type`) and the property shape are modelled as one enum so
//! they can never disagree. Serialisation emits the flat wire shape:
//!
//! {"version":"0.0","Resources":[{"TargetService":{"Type":...,"Properties":{...}}}]}
//!
//! Reference: https://docs.aws.amazon.com/codedeploy/latest/userguide/reference-appspec-file.html

use serde::{Deserialize, Serialize};

/// Schema version written into every descriptor built here.
pub const DEFAULT_VERSION: &str = "0.0";

/// Root AppSpec document.
///
/// Field order matters: `version` is emitted before `Resources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub version: String,

    #[serde(rename = "Resources")]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    pub target_service: TargetService,
}

/// Deployment target, tagged by its CodeDeploy resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Properties")]
pub enum TargetService {
    #[serde(rename = "AWS::ECS::Service")]
    Ecs(EcsProperties),

    #[serde(rename = "AWS::Lambda::Function")]
    Lambda(LambdaProperties),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EcsProperties {
    pub task_definition: String,
    pub load_balancer_info: LoadBalancerInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadBalancerInfo {
    pub container_name: String,
    pub container_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LambdaProperties {
    pub name: String,
    pub alias: String,
    pub current_version: String,
    pub target_version: String,
}

impl Descriptor {
    /// Descriptor for an ECS service deployment behind a load balancer.
    pub fn ecs(
        task_definition: impl Into<String>,
        container_name: impl Into<String>,
        container_port: u16,
    ) -> Self {
        Self::single(TargetService::Ecs(EcsProperties {
            task_definition: task_definition.into(),
            load_balancer_info: LoadBalancerInfo {
                container_name: container_name.into(),
                container_port,
            },
        }))
    }

    /// Descriptor shifting a Lambda alias from one version to another.
    pub fn lambda(
        function_name: impl Into<String>,
        alias: impl Into<String>,
        current_version: impl Into<String>,
        target_version: impl Into<String>,
    ) -> Self {
        Self::single(TargetService::Lambda(LambdaProperties {
            name: function_name.into(),
            alias: alias.into(),
            current_version: current_version.into(),
            target_version: target_version.into(),
        }))
    }

    fn single(target_service: TargetService) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            resources: vec![Resource { target_service }],
        }
    }
}
