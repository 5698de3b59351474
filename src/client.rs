// src/client.rs

//! CodeDeploy over its JSON 1.1 HTTP API.
//!
//! Each operation is a signed `POST /` with an `X-Amz-Target` header naming
//! the operation. Error responses carry `__type` and `message`.

use crate::config::Config;
use crate::revision::CreateDeploymentRequest;
use crate::service::{
    ClientError, DeploymentClient, DeploymentId, DeploymentLookup, GetDeploymentOutput,
};
use crate::sigv4::{self, Credentials, SignableRequest, SigningParams};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERVICE: &str = "codedeploy";
const TARGET_PREFIX: &str = "CodeDeploy_20141006";
const JSON_1_1: &str = "application/x-amz-json-1.1";

/// Error reported by the CodeDeploy API.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message} (HTTP {status})")]
pub struct ServiceError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDeploymentOutput {
    deployment_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetDeploymentInput<'a> {
    deployment_id: &'a str,
}

#[derive(Clone)]
pub struct CodeDeployClient {
    http: reqwest::Client,
    endpoint: Url,
    region: String,
    credentials: Credentials,
}

impl CodeDeployClient {
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid CodeDeploy endpoint {:?}", config.endpoint))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            region: config.region.clone(),
            credentials,
        })
    }

    fn host(&self) -> Result<String, ClientError> {
        let host = self
            .endpoint
            .host_str()
            .ok_or_else(|| format!("endpoint {} has no host", self.endpoint))?;

        Ok(match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }

    fn signed_headers(&self, operation: &str, body: &[u8]) -> Result<HeaderMap, ClientError> {
        let time = chrono::Utc::now();
        let target = format!("{TARGET_PREFIX}.{operation}");

        let mut pairs: Vec<(&str, String)> = vec![
            ("content-type", JSON_1_1.to_string()),
            ("host", self.host()?),
            ("x-amz-date", sigv4::amz_date(&time)),
            ("x-amz-target", target),
        ];
        if let Some(token) = &self.credentials.session_token {
            pairs.push(("x-amz-security-token", token.clone()));
        }

        let authorization = sigv4::authorization(
            &SigningParams {
                credentials: &self.credentials,
                region: &self.region,
                service: SERVICE,
                time,
            },
            &SignableRequest {
                method: "POST",
                path: self.endpoint.path(),
                query: "",
                headers: &pairs,
                payload: body,
            },
        );

        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            // reqwest sets Host from the URL.
            if name == "host" {
                continue;
            }
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(&value)?,
            );
        }
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&authorization)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_1_1));

        Ok(headers)
    }

    async fn call<I, O>(&self, operation: &str, input: &I) -> Result<O, ClientError>
    where
        I: Serialize + ?Sized + Sync,
        O: DeserializeOwned,
    {
        let body = serde_json::to_vec(input)?;
        let headers = self.signed_headers(operation, &body)?;

        debug!(operation, endpoint = %self.endpoint, "calling CodeDeploy");

        let resp = self
            .http
            .post(self.endpoint.clone())
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Box::new(decode_error(status.as_u16(), &text)));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Turn an error response into a [`ServiceError`].
///
/// `__type` may be namespaced (`com.amazonaws.codedeploy#SomeException`);
/// only the part after `#` is kept.
fn decode_error(status: u16, text: &str) -> ServiceError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();

    let code = body
        .kind
        .as_deref()
        .map(|k| k.rsplit('#').next().unwrap_or(k).to_string())
        .unwrap_or_else(|| "UnknownError".to_string());

    let message = body.message.unwrap_or_else(|| text.trim().to_string());

    ServiceError {
        status,
        code,
        message,
    }
}

#[async_trait]
impl DeploymentClient for CodeDeployClient {
    async fn create_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<DeploymentId, ClientError> {
        let out: CreateDeploymentOutput = self.call("CreateDeployment", request).await?;
        Ok(DeploymentId::new(out.deployment_id))
    }

    async fn get_deployment(&self, id: &DeploymentId) -> DeploymentLookup {
        let input = GetDeploymentInput {
            deployment_id: id.as_str(),
        };

        match self.call::<_, GetDeploymentOutput>("GetDeployment", &input).await {
            Ok(out) => DeploymentLookup::ok(out),
            Err(e) => DeploymentLookup::failed(e),
        }
    }
}
