//! REST client for the hosted generative API
//!
//! Wraps the long-running video synthesis endpoints (operation creation and
//! polling) and the single-shot text completion used for script drafting,
//! using [`reqwest`]. The API key is looked up on every call so a newly
//! selected key takes effect immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::capability::ApiKeyStore;
use crate::error::RemoteError;
use crate::models::{AspectRatio, Resolution};
use crate::remote::{JobPayload, OperationSnapshot, RemoteFailure, RemoteJobApi, ScriptWriter};
use crate::script::SCRIPT_SYSTEM_INSTRUCTION;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const DEFAULT_SCRIPT_MODEL: &str = "gemini-2.5-flash";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Endpoint and model selection
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    pub base_url: String,
    pub video_model: String,
    pub script_model: String,
    pub request_timeout: Duration,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            script_model: DEFAULT_SCRIPT_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: [PredictInstance<'a>; 1],
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage<'a> {
    bytes_base64_encoded: String,
    mime_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    sample_count: u32,
}

impl<'a> From<&'a JobPayload> for PredictRequest<'a> {
    fn from(payload: &'a JobPayload) -> Self {
        let image = match payload {
            JobPayload::Image { image, .. } => Some(InlineImage {
                bytes_base64_encoded: image.to_base64(),
                mime_type: image.mime_type(),
            }),
            JobPayload::Text { .. } => None,
        };
        let config = payload.config();

        Self {
            instances: [PredictInstance {
                prompt: payload.prompt(),
                image,
            }],
            parameters: PredictParameters {
                aspect_ratio: config.aspect_ratio,
                resolution: config.resolution,
                sample_count: config.number_of_videos,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<OperationResult>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResult {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoReference>,
}

#[derive(Debug, Deserialize)]
struct VideoReference {
    uri: Option<String>,
}

impl From<OperationResponse> for OperationSnapshot {
    fn from(operation: OperationResponse) -> Self {
        let media_uri = operation
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|sample| sample.video)
            .and_then(|video| video.uri);

        Self {
            name: operation.name,
            done: operation.done,
            error: operation.error.map(|e| RemoteFailure {
                code: e.code,
                message: if e.message.is_empty() {
                    "Unknown remote error".to_string()
                } else {
                    e.message
                },
            }),
            media_uri,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// HTTP client for the generative API
#[derive(Clone)]
pub struct GenAiClient {
    client: reqwest::Client,
    config: GenAiConfig,
    keys: ApiKeyStore,
}

impl GenAiClient {
    pub fn new(config: GenAiConfig, keys: ApiKeyStore) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self::with_client(client, config, keys))
    }

    /// Reuse an existing [`reqwest::Client`]
    pub fn with_client(client: reqwest::Client, config: GenAiConfig, keys: ApiKeyStore) -> Self {
        Self {
            client,
            config,
            keys,
        }
    }

    fn api_key(&self) -> Result<String, RemoteError> {
        self.keys.get().ok_or(RemoteError::MissingCredential)
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn generate_content(&self, topic: &str) -> Result<Option<String>, RemoteError> {
        let key = self.api_key()?;
        let body = GenerateContentRequest {
            system_instruction: Content {
                parts: [TextPart {
                    text: SCRIPT_SYSTEM_INSTRUCTION,
                }],
            },
            contents: [Content {
                parts: [TextPart { text: topic }],
            }],
        };

        let response = self
            .client
            .post(self.url(&format!(
                "models/{}:generateContent",
                self.config.script_model
            )))
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .await?;

        let response: GenerateContentResponse = Self::parse_response(response).await?;
        Ok(response.text())
    }

    /// Ensure the response has a success status code
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RemoteError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RemoteJobApi for GenAiClient {
    async fn create_operation(
        &self,
        payload: &JobPayload,
    ) -> Result<OperationSnapshot, RemoteError> {
        let key = self.api_key()?;
        let body = PredictRequest::from(payload);

        let response = self
            .client
            .post(self.url(&format!(
                "models/{}:predictLongRunning",
                self.config.video_model
            )))
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .await?;

        let operation: OperationResponse = Self::parse_response(response).await?;
        info!("Created remote operation {}", operation.name);
        Ok(operation.into())
    }

    async fn poll_operation(&self, name: &str) -> Result<OperationSnapshot, RemoteError> {
        let key = self.api_key()?;

        let response = self
            .client
            .get(self.url(name))
            .header(API_KEY_HEADER, key)
            .send()
            .await?;

        let operation: OperationResponse = Self::parse_response(response).await?;
        Ok(operation.into())
    }

    fn authorize_media_uri(&self, uri: &str) -> Result<String, RemoteError> {
        let key = self.api_key()?;
        let mut url = Url::parse(uri).map_err(|e| RemoteError::Decode(e.to_string()))?;
        url.query_pairs_mut().append_pair("key", &key);
        Ok(url.into())
    }

    fn model_name(&self) -> &str {
        &self.config.video_model
    }
}

#[async_trait]
impl ScriptWriter for GenAiClient {
    async fn draft_script(&self, topic: &str) -> Option<String> {
        match self.generate_content(topic).await {
            Ok(script) => script,
            Err(e) => {
                warn!("Script generation failed: {}", e);
                None
            }
        }
    }
}
