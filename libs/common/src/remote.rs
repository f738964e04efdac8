//! Abstraction over the hosted generative API
//!
//! The orchestrator and the session only talk to the remote service through
//! these traits, so tests can swap in scripted fakes.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::RemoteError;
use crate::models::{AspectRatio, ReferenceImage, Resolution};

/// Output configuration shared by both call shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub number_of_videos: u32,
}

impl VideoConfig {
    pub fn new(aspect_ratio: AspectRatio, resolution: Resolution) -> Self {
        Self {
            aspect_ratio,
            resolution,
            number_of_videos: 1,
        }
    }
}

/// Remote call shape for a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPayload {
    /// Text-to-video
    Text { prompt: String, config: VideoConfig },
    /// Image-to-video; the prompt is optional guidance
    Image {
        prompt: Option<String>,
        image: ReferenceImage,
        config: VideoConfig,
    },
}

impl JobPayload {
    pub fn config(&self) -> &VideoConfig {
        match self {
            JobPayload::Text { config, .. } | JobPayload::Image { config, .. } => config,
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            JobPayload::Text { prompt, .. } => Some(prompt),
            JobPayload::Image { prompt, .. } => prompt.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JobPayload::Text { .. } => "text",
            JobPayload::Image { .. } => "image",
        }
    }
}

/// Error payload carried by a finished operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub code: Option<i64>,
    pub message: String,
}

/// Status snapshot of a long-running remote operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSnapshot {
    pub name: String,
    pub done: bool,
    pub error: Option<RemoteFailure>,
    pub media_uri: Option<String>,
}

impl OperationSnapshot {
    pub fn running(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            error: None,
            media_uri: None,
        }
    }
}

/// Long-running video synthesis operations
#[async_trait]
pub trait RemoteJobApi: Send + Sync {
    /// Issue one "create operation" call
    async fn create_operation(&self, payload: &JobPayload)
    -> Result<OperationSnapshot, RemoteError>;

    /// Fetch a fresh snapshot of an operation
    async fn poll_operation(&self, name: &str) -> Result<OperationSnapshot, RemoteError>;

    /// Append the access credential to a media URI so it can be played back
    fn authorize_media_uri(&self, uri: &str) -> Result<String, RemoteError>;

    /// Model name recorded on gallery entries
    fn model_name(&self) -> &str;
}

/// Single-shot text completion used to draft scripts
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    /// Returns `None` when no script could be produced
    async fn draft_script(&self, topic: &str) -> Option<String>;
}
