// src/revision.rs

//! Revision packaging.
//!
//! Turns a descriptor into the exact bytes that get submitted, fingerprints
//! those bytes, and assembles the inline-content `CreateDeployment` request.
//!
//! The fingerprint is always computed over the staged bytes themselves, never
//! over a re-serialisation. CodeDeploy validates `sha256` against the
//! `content` it receives.

use crate::descriptor::Descriptor;

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

/// `revisionType` for AppSpec content carried inline in the request.
pub const APP_SPEC_CONTENT: &str = "AppSpecContent";

/// Serialise a descriptor to compact JSON bytes.
///
/// Output is deterministic: field order follows the struct definitions.
pub fn serialize(descriptor: &Descriptor) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(descriptor)
}

/// Lower-case hex SHA-256 of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Inline content that is not valid UTF-8 and so cannot be sent.
#[derive(Debug, thiserror::Error)]
#[error("AppSpec content is not UTF-8: {0}")]
pub struct NotUtf8(std::str::Utf8Error);

/// The content as it will appear in the request's `content` string.
pub fn content_text(content: &[u8]) -> Result<&str, NotUtf8> {
    std::str::from_utf8(content).map_err(NotUtf8)
}

/// Body of a `CreateDeployment` call with an inline revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    pub application_name: String,
    pub deployment_group_name: String,
    pub revision: RevisionLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionLocation {
    pub revision_type: &'static str,
    pub app_spec_content: AppSpecContent,
}

/// Inline AppSpec: raw content plus its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSpecContent {
    /// Sent as a JSON string. Bytes that are not valid UTF-8 fail
    /// serialisation instead of being rewritten.
    #[serde(serialize_with = "utf8_content")]
    pub content: Vec<u8>,

    pub sha256: String,
}

impl CreateDeploymentRequest {
    /// Assemble a request around `content`, fingerprinting it as-is.
    pub fn inline(
        application_name: impl Into<String>,
        deployment_group_name: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        let sha256 = fingerprint(&content);

        Self {
            application_name: application_name.into(),
            deployment_group_name: deployment_group_name.into(),
            revision: RevisionLocation {
                revision_type: APP_SPEC_CONTENT,
                app_spec_content: AppSpecContent { content, sha256 },
            },
        }
    }
}

fn utf8_content<S: Serializer>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    let text = content_text(content).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(text)
}
