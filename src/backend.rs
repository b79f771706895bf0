//! The build backend contract: one JSON POST to `setup-and-initiate-loop`.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::api_config::ApiConfig;
use crate::errors::{BuildError, GENERIC_BUILD_FAILURE};
use crate::images::EncodedImage;

/// Path of the build endpoint relative to the backend origin.
pub const BUILD_PATH: &str = "setup-and-initiate-loop";

/// Value sent as `model_api` with every request.
pub const MODEL_API: &str = "openrouter";

/// A single build submission. Built fresh per attempt and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub app_name: String,
    pub description: String,
    pub images: Vec<EncodedImage>,
    pub model_id: String,
    pub model_api: String,
}

impl BuildRequest {
    /// Wire body. `extra` is merged last, so its keys win on conflict.
    pub fn to_body(&self, extra: &BTreeMap<String, String>) -> Value {
        let mut body = Map::new();
        body.insert("app_name".into(), json!(self.app_name));
        body.insert("description".into(), json!(self.description));
        body.insert("images".into(), json!(self.images));
        body.insert("model_name".into(), json!(self.model_id));
        body.insert("model_api".into(), json!(self.model_api));
        for (key, value) in extra {
            body.insert(key.clone(), Value::String(value.clone()));
        }
        Value::Object(body)
    }
}

/// Successful backend reply; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildResponse {
    pub link: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Anything that can run a build request to completion.
#[async_trait]
pub trait BuildBackend: Send + Sync {
    async fn setup_and_initiate_loop(
        &self,
        api: &ApiConfig,
        request: &BuildRequest,
    ) -> Result<BuildResponse, BuildError>;
}

/// `reqwest` implementation of [`BuildBackend`].
#[derive(Debug, Clone, Default)]
pub struct HttpBuildBackend {
    client: reqwest::Client,
}

impl HttpBuildBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client with an overall request timeout. `None` means no timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BuildBackend for HttpBuildBackend {
    async fn setup_and_initiate_loop(
        &self,
        api: &ApiConfig,
        request: &BuildRequest,
    ) -> Result<BuildResponse, BuildError> {
        let url = api.endpoint(BUILD_PATH);
        tracing::debug!(
            url = %url,
            app = %request.app_name,
            images = request.images.len(),
            "sending build request"
        );

        let resp = self
            .client
            .post(&url)
            .json(&request.to_body(&api.extra_body))
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .unwrap_or_default()
                .error
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_BUILD_FAILURE.to_string());
            tracing::debug!(status = status.as_u16(), %message, "build rejected");
            return Err(BuildError::BackendRejection {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice::<BuildResponse>(&bytes)
            .map_err(|e| BuildError::Transport(format!("invalid response body: {}", e)))
    }
}
