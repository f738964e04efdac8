//! Domain models shared by the generation flow

use std::fmt;
use std::sync::OnceLock;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GenerationError, GenerationResult};
use crate::remote::{JobPayload, OperationSnapshot, VideoConfig};

/// Upper bound for a reference image (5 MiB)
pub const MAX_REFERENCE_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Media types accepted as a starting frame
pub const SUPPORTED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

/// Output aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "1080p")]
    FullHd,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd => "720p",
            Resolution::FullHd => "1080p",
        }
    }

    /// Credits charged for one job at this resolution
    pub fn cost(&self) -> u64 {
        match self {
            Resolution::Hd => 30,
            Resolution::FullHd => 50,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Starting frame for image-conditioned synthesis
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    data: Vec<u8>,
    mime_type: String,
}

impl ReferenceImage {
    /// Validate raw bytes and their declared media type
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> GenerationResult<Self> {
        let mime_type = mime_type.into();

        if data.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "Reference image is empty".to_string(),
            ));
        }

        if data.len() > MAX_REFERENCE_IMAGE_BYTES {
            return Err(GenerationError::InvalidRequest(
                "Image too large. Please use an image under 5MB.".to_string(),
            ));
        }

        if !SUPPORTED_IMAGE_TYPES.contains(&mime_type.as_str()) {
            return Err(GenerationError::InvalidRequest(format!(
                "Unsupported image type: {}",
                mime_type
            )));
        }

        Ok(Self { data, mime_type })
    }

    /// Decode a base64 payload
    pub fn from_base64(encoded: &str, mime_type: impl Into<String>) -> GenerationResult<Self> {
        let data = STANDARD.decode(encoded.trim()).map_err(|e| {
            GenerationError::InvalidRequest(format!("Invalid base64 image data: {}", e))
        })?;
        Self::new(data, mime_type)
    }

    /// Parse a `data:<mime>;base64,<payload>` URL
    pub fn from_data_url(url: &str) -> GenerationResult<Self> {
        static DATA_URL_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = DATA_URL_REGEX.get_or_init(|| {
            Regex::new(r"^data:(.+);base64,(.+)$").expect("Failed to compile data URL regex")
        });

        let captures = regex.captures(url.trim()).ok_or_else(|| {
            GenerationError::InvalidRequest("Image must be a base64 data URL".to_string())
        })?;

        Self::from_base64(&captures[2], &captures[1])
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

impl fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// One generation job as requested by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    image: Option<ReferenceImage>,
}

impl GenerationRequest {
    /// Build a request; the prompt may be blank only when an image is present
    pub fn new(
        prompt: impl Into<String>,
        aspect_ratio: AspectRatio,
        resolution: Resolution,
        image: Option<ReferenceImage>,
    ) -> GenerationResult<Self> {
        let prompt = prompt.into().trim().to_string();

        if prompt.is_empty() && image.is_none() {
            return Err(GenerationError::InvalidRequest(
                "A prompt or a reference image is required".to_string(),
            ));
        }

        Ok(Self {
            prompt,
            aspect_ratio,
            resolution,
            image,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn image(&self) -> Option<&ReferenceImage> {
        self.image.as_ref()
    }

    pub fn cost(&self) -> u64 {
        self.resolution.cost()
    }

    /// Remote call shape for this request
    pub fn payload(&self) -> JobPayload {
        let config = VideoConfig::new(self.aspect_ratio, self.resolution);

        match &self.image {
            Some(image) => JobPayload::Image {
                prompt: (!self.prompt.is_empty()).then(|| self.prompt.clone()),
                image: image.clone(),
                config,
            },
            None => JobPayload::Text {
                prompt: self.prompt.clone(),
                config,
            },
        }
    }
}

/// Lifecycle of a remote generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Handle for an outstanding remote operation
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub operation: String,
    pub status: JobStatus,
    pub result_uri: Option<String>,
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    /// Terminal snapshot returned directly by the create call, if any
    pub(crate) settled: Option<OperationSnapshot>,
}

impl GenerationJob {
    pub fn pending(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: JobStatus::Pending,
            result_uri: None,
            error: None,
            submitted_at: Utc::now(),
            settled: None,
        }
    }

    pub(crate) fn mark_running(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Running;
        }
    }

    pub(crate) fn succeed(&mut self, uri: String) {
        self.status = JobStatus::Succeeded;
        self.result_uri = Some(uri);
        self.error = None;
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.result_uri = None;
        self.error = Some(message.into());
    }
}

/// Gallery entry recorded for every successful job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedVideo {
    pub id: Uuid,
    pub uri: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub aspect_ratio: AspectRatio,
    pub model: String,
}

impl GeneratedVideo {
    pub fn new(request: &GenerationRequest, uri: String, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            uri,
            prompt: request.prompt().to_string(),
            created_at: Utc::now(),
            aspect_ratio: request.aspect_ratio(),
            model: model.into(),
        }
    }
}
