//! Sequential chunked episode upload.
//!
//! Chunk 1 travels with the episode metadata and creates the episode; chunks
//! 2..N are appended to it one request at a time, in order. A request is only
//! issued after the previous one resolved. Retryable failures are retried per
//! [`RetryPolicy`]; any terminal failure stops the upload.

use crate::api::{
    AppendAudioRequest, AudioChunk, ByteProgress, CreateEpisodeRequest, EpisodeApi, EpisodeId,
};
use crate::error::{UploadError, UploadResult};
use castup_core::{
    Attachment, AudioSource, ChunkLabel, ChunkRange, ClientConfig, EpisodeDraft, EpisodeMetadata,
    ProgressSnapshot, RetryPolicy, UploadId, UploadSession,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Knobs for one uploader instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    pub chunk_size: u64,
    pub request_overhead_bytes: u64,
    pub retry: RetryPolicy,
    pub legacy_chunk_labels: bool,
}

impl UploadOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            request_overhead_bytes: config.request_overhead_bytes,
            retry: config.retry.policy(),
            legacy_chunk_labels: config.legacy_chunk_labels,
        }
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// Progress event delivered to a [`ProgressReporter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Overall percentage, `0..=100`, never decreasing.
    pub percent: u8,
    pub uploaded_bytes: u64,
    pub in_flight_bytes: u64,
    pub total_bytes: u64,
    /// 1-based sequence of the chunk the event relates to.
    pub chunk: u32,
    pub total_chunks: u32,
}

impl ProgressUpdate {
    fn new(snapshot: ProgressSnapshot, label: ChunkLabel) -> Self {
        Self {
            percent: snapshot.percent,
            uploaded_bytes: snapshot.uploaded_bytes,
            in_flight_bytes: snapshot.in_flight_bytes,
            total_bytes: snapshot.total_bytes,
            chunk: label.sequence,
            total_chunks: label.total,
        }
    }
}

/// Receives progress while an upload runs.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Outcome of a completed upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    pub episode_id: EpisodeId,
    pub upload_id: UploadId,
    pub chunks: u32,
    pub bytes: u64,
}

/// Everything sent alongside the audio bytes.
struct Payload<'a> {
    metadata: &'a EpisodeMetadata,
    cover: &'a Attachment,
    audio: &'a AudioSource,
    content_type: &'static str,
}

/// Uploads episodes through an [`EpisodeApi`].
pub struct EpisodeUploader<A> {
    api: A,
    options: UploadOptions,
}

impl<A: EpisodeApi> EpisodeUploader<A> {
    pub fn new(api: A, options: UploadOptions) -> Self {
        Self { api, options }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Validate `draft` and upload it.
    ///
    /// Fails with [`UploadError::Validation`] before any request when a field
    /// is missing, with [`UploadError::Cancelled`] when `cancel` fires, and with
    /// [`UploadError::Chunk`] when a chunk request fails terminally. Chunks
    /// accepted before a failure are left on the server as they are.
    pub async fn upload(
        &self,
        draft: &EpisodeDraft,
        reporter: Arc<dyn ProgressReporter>,
        cancel: &CancellationToken,
    ) -> UploadResult<UploadReceipt> {
        draft.validate()?;
        let (Some(cover), Some(audio)) = (&draft.cover, &draft.audio) else {
            return Err(UploadError::Validation(
                "Cover Image, Episode Name and Description Required.".to_string(),
            ));
        };
        let content_type = audio.content_type().ok_or_else(|| {
            UploadError::Validation(format!("Unsupported audio format: {}", audio.file_name()))
        })?;
        let payload = Payload {
            metadata: &draft.metadata,
            cover,
            audio,
            content_type,
        };

        let mut session = UploadSession::new(
            audio.size(),
            self.options.chunk_size,
            self.options.request_overhead_bytes,
        )?;
        let total = session.plan().total_chunks();
        tracing::info!(
            upload_id = %session.upload_id(),
            bytes = audio.size(),
            chunks = total,
            "starting episode upload"
        );
        session.begin()?;

        let mut episode_id: Option<EpisodeId> = None;
        while let Some(range) = session.current_chunk().copied() {
            if cancel.is_cancelled() {
                return Err(self.abort(&mut session));
            }

            let label = session.label_for(&range)?;
            tracing::debug!(chunk = label.sequence, total, bytes = range.len(), "sending chunk");

            let outcome = self
                .send_chunk(&session, &payload, &range, label, episode_id.as_ref(), &reporter, cancel)
                .await;
            match outcome {
                Ok(created) => {
                    if created.is_some() {
                        episode_id = created;
                    }
                    session.complete_chunk()?;
                    reporter.report(ProgressUpdate::new(session.snapshot(), label));
                }
                Err(UploadError::Cancelled { .. }) => return Err(self.abort(&mut session)),
                Err(err) => {
                    session.fail_chunk()?;
                    reporter.report(ProgressUpdate::new(session.snapshot(), label));
                    tracing::warn!(chunk = label.sequence, total, error = %err, "chunk upload failed");
                    return Err(UploadError::Chunk {
                        sequence: label.sequence,
                        total,
                        episode_id: episode_id.map(|id| id.to_string()),
                        source: Box::new(err),
                    });
                }
            }
        }

        let episode_id = episode_id.ok_or_else(|| {
            UploadError::Protocol("upload finished without an episode id".to_string())
        })?;
        tracing::info!(%episode_id, upload_id = %session.upload_id(), "episode upload complete");
        Ok(UploadReceipt {
            episode_id,
            upload_id: session.upload_id(),
            chunks: total,
            bytes: session.uploaded_bytes(),
        })
    }

    /// Send one chunk, retrying as configured. Returns the episode id when the
    /// chunk created the episode.
    #[allow(clippy::too_many_arguments)]
    async fn send_chunk(
        &self,
        session: &UploadSession,
        payload: &Payload<'_>,
        range: &ChunkRange,
        label: ChunkLabel,
        episode_id: Option<&EpisodeId>,
        reporter: &Arc<dyn ProgressReporter>,
        cancel: &CancellationToken,
    ) -> UploadResult<Option<EpisodeId>> {
        let data = payload.audio.read_range(range).await?;
        let file_name = if self.options.legacy_chunk_labels && label.total > 1 {
            label.legacy_file_name()
        } else {
            payload.audio.file_name().to_string()
        };
        let audio = AudioChunk {
            label,
            file_name,
            content_type: payload.content_type.to_string(),
            data,
        };
        let progress = byte_progress(session, Arc::clone(reporter), label);
        let api = &self.api;

        match episode_id {
            None => {
                let request = CreateEpisodeRequest {
                    metadata: payload.metadata.clone(),
                    thumbnail: payload.cover.clone(),
                    audio,
                };
                let id = self
                    .with_retry(session, cancel, label, move || {
                        api.create_episode(request.clone(), Arc::clone(&progress))
                    })
                    .await?;
                Ok(Some(id))
            }
            Some(id) => {
                let request = AppendAudioRequest { audio };
                self.with_retry(session, cancel, label, move || {
                    api.append_audio(id, request.clone(), Arc::clone(&progress))
                })
                .await?;
                Ok(None)
            }
        }
    }

    async fn with_retry<T, F, Fut>(
        &self,
        session: &UploadSession,
        cancel: &CancellationToken,
        label: ChunkLabel,
        mut attempt: F,
    ) -> UploadResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = UploadResult<T>>,
    {
        let policy = self.options.retry;
        let mut tries = 0u32;
        loop {
            tries += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(session)),
                result = attempt() => result,
            };
            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && policy.should_retry(tries) => {
                    let delay = policy.backoff(tries);
                    tracing::warn!(
                        chunk = label.sequence,
                        attempt = tries,
                        error = %err,
                        "chunk request failed, retrying in {}ms",
                        delay.as_millis()
                    );
                    session
                        .progress()
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .reset_in_flight();
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(cancelled(session)),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn abort(&self, session: &mut UploadSession) -> UploadError {
        session.cancel();
        tracing::info!(
            upload_id = %session.upload_id(),
            completed = session.current_chunk_index(),
            "episode upload cancelled"
        );
        cancelled(session)
    }
}

fn cancelled(session: &UploadSession) -> UploadError {
    UploadError::Cancelled {
        completed: session.current_chunk_index() as u32,
        total: session.plan().total_chunks(),
    }
}

/// Feed transport byte counts into the session's tracker and forward the
/// resulting overall progress.
fn byte_progress(
    session: &UploadSession,
    reporter: Arc<dyn ProgressReporter>,
    label: ChunkLabel,
) -> ByteProgress {
    let tracker = session.progress();
    Arc::new(move |loaded| {
        let snapshot = {
            let mut tracker = tracker.lock().unwrap_or_else(|e| e.into_inner());
            tracker.observe(loaded);
            tracker.snapshot()
        };
        reporter.report(ProgressUpdate::new(snapshot, label));
    })
}
