//! Request and response payloads for the studio service

use common::models::{AspectRatio, GeneratedVideo, GenerationRequest, ReferenceImage, Resolution};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Body of `POST /generations`
#[derive(Debug, Deserialize)]
pub struct CreateGenerationRequest {
    #[serde(default)]
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    /// Starting frame as a `data:<mime>;base64,<payload>` URL
    pub image: Option<String>,
}

impl TryFrom<CreateGenerationRequest> for GenerationRequest {
    type Error = ApiError;

    fn try_from(body: CreateGenerationRequest) -> Result<Self, Self::Error> {
        let image = body
            .image
            .as_deref()
            .map(ReferenceImage::from_data_url)
            .transpose()?;

        Ok(GenerationRequest::new(
            body.prompt,
            body.aspect_ratio,
            body.resolution,
            image,
        )?)
    }
}

/// Response of `POST /generations`
#[derive(Debug, Serialize)]
pub struct GenerationAccepted {
    pub operation: String,
    pub cost: u64,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
    pub pending: u64,
}

/// Body of `POST /credits/top-up`
#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub amount: u64,
}

#[derive(Debug, Serialize)]
pub struct TopUpResponse {
    pub added: u64,
    pub balance: i64,
}

/// Body of `POST /scripts`
#[derive(Debug, Deserialize)]
pub struct ScriptRequest {
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct ScriptResponse {
    pub script: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub usable: bool,
}

/// Query parameters for gallery listing
#[derive(Debug, Clone, Deserialize)]
pub struct VideoQuery {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Number of items per page
    pub limit: Option<u32>,
}

/// Gallery page, newest first
#[derive(Debug, Clone, Serialize)]
pub struct VideoListResponse {
    pub items: Vec<GeneratedVideo>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
}
