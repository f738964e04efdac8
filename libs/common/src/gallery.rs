//! In-memory gallery of generated videos, newest first

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::GeneratedVideo;

#[derive(Debug, Clone, Default)]
pub struct Gallery {
    videos: Arc<RwLock<VecDeque<GeneratedVideo>>>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a video at the front of the sequence
    pub async fn push(&self, video: GeneratedVideo) {
        self.videos.write().await.push_front(video);
    }

    pub async fn list(&self) -> Vec<GeneratedVideo> {
        self.videos.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.videos.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.videos.read().await.is_empty()
    }

    /// One page of the gallery (1-based) and the total count
    pub async fn page(&self, page: u32, limit: u32) -> (Vec<GeneratedVideo>, usize) {
        let videos = self.videos.read().await;
        let page = page.max(1) as usize;
        let limit = limit.max(1) as usize;

        let items = videos
            .iter()
            .skip((page - 1) * limit)
            .take(limit)
            .cloned()
            .collect();

        (items, videos.len())
    }
}
