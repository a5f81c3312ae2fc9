//! Transport seam between the uploader and the podcast API.

use crate::error::UploadResult;
use async_trait::async_trait;
use bytes::Bytes;
use castup_core::{Attachment, ChunkLabel, EpisodeMetadata};
use std::fmt;
use std::sync::Arc;

/// Callback receiving cumulative audio bytes sent by a single request.
pub type ByteProgress = Arc<dyn Fn(u64) + Send + Sync>;

/// A progress callback that ignores every event.
pub fn no_progress() -> ByteProgress {
    Arc::new(|_: u64| {})
}

/// Server-assigned episode identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EpisodeId(String);

impl EpisodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EpisodeId({})", self.0)
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One chunk of audio ready to be sent.
#[derive(Clone)]
pub struct AudioChunk {
    pub label: ChunkLabel,
    /// File name for the multipart part.
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl AudioChunk {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for AudioChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioChunk")
            .field("label", &self.label)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// First request of an upload: creates the episode and carries chunk 1.
#[derive(Clone, Debug)]
pub struct CreateEpisodeRequest {
    pub metadata: EpisodeMetadata,
    pub thumbnail: Attachment,
    pub audio: AudioChunk,
}

/// Follow-up request appending chunk 2..N to an existing episode.
#[derive(Clone, Debug)]
pub struct AppendAudioRequest {
    pub audio: AudioChunk,
}

/// Podcast episode API as seen by the uploader.
///
/// Implementations report cumulative audio bytes through `progress` while the
/// request body is being sent and return once the response is in.
#[async_trait]
pub trait EpisodeApi: Send + Sync {
    /// Create the episode record with the first chunk.
    async fn create_episode(
        &self,
        request: CreateEpisodeRequest,
        progress: ByteProgress,
    ) -> UploadResult<EpisodeId>;

    /// Append a chunk to an episode created earlier.
    async fn append_audio(
        &self,
        episode_id: &EpisodeId,
        request: AppendAudioRequest,
        progress: ByteProgress,
    ) -> UploadResult<()>;
}

#[async_trait]
impl<T: EpisodeApi + ?Sized> EpisodeApi for Arc<T> {
    async fn create_episode(
        &self,
        request: CreateEpisodeRequest,
        progress: ByteProgress,
    ) -> UploadResult<EpisodeId> {
        (**self).create_episode(request, progress).await
    }

    async fn append_audio(
        &self,
        episode_id: &EpisodeId,
        request: AppendAudioRequest,
        progress: ByteProgress,
    ) -> UploadResult<()> {
        (**self).append_audio(episode_id, request, progress).await
    }
}
