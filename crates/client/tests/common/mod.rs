use async_trait::async_trait;
use castup_client::{
    AppendAudioRequest, AudioChunk, ByteProgress, CreateEpisodeRequest, EpisodeApi, EpisodeId,
    ProgressReporter, ProgressUpdate, UploadError, UploadResult,
};
use castup_core::{Attachment, AudioSource, EpisodeDraft, EpisodeMetadata, UploadId};
use std::collections::VecDeque;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const EPISODE_ID: &str = "ep-42";

#[allow(dead_code)]
pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Deterministic audio bytes: byte `i` is `i % 251`.
pub fn audio_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn draft(audio: Vec<u8>) -> EpisodeDraft {
    EpisodeDraft {
        metadata: EpisodeMetadata {
            podcast_id: "pod-7".to_string(),
            name: "Pilot".to_string(),
            description: "Where it all starts".to_string(),
            is_explicit: true,
        },
        cover: Some(Attachment::new("cover.jpg", b"COVER".to_vec())),
        audio: Some(AudioSource::from_bytes("pilot.mp3", audio)),
    }
}

/// What a scripted attempt does.
#[allow(dead_code)]
#[derive(Clone, Debug)]
pub enum Outcome {
    Accept,
    Status(u16, &'static str),
    Transport,
    /// Never resolves.
    Hang,
}

/// A request as observed by the fake API.
#[derive(Clone, Debug)]
pub struct Call {
    pub episode_id: Option<String>,
    pub sequence: u32,
    pub total: u32,
    pub upload_id: UploadId,
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub metadata: Option<EpisodeMetadata>,
}

impl Call {
    pub fn is_create(&self) -> bool {
        self.metadata.is_some()
    }
}

/// In-memory `EpisodeApi` recording every attempt in order.
///
/// Attempts consume `script` front to back; once it is empty every attempt is
/// accepted. Overlapping requests are flagged.
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<Call>>,
    script: Mutex<VecDeque<Outcome>>,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
}

#[allow(dead_code)]
impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        let api = Self::default();
        *api.script.lock().unwrap() = outcomes.into_iter().collect();
        Arc::new(api)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    async fn attempt(
        &self,
        episode_id: Option<&EpisodeId>,
        metadata: Option<EpisodeMetadata>,
        audio: &AudioChunk,
        progress: &ByteProgress,
    ) -> UploadResult<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.calls.lock().unwrap().push(Call {
            episode_id: episode_id.map(|id| id.to_string()),
            sequence: audio.label.sequence,
            total: audio.label.total,
            upload_id: audio.label.upload_id,
            file_name: audio.file_name.clone(),
            content_type: audio.content_type.clone(),
            data: audio.data.to_vec(),
            metadata,
        });

        progress(audio.len() / 2);
        tokio::task::yield_now().await;
        progress(audio.len());

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Accept);
        let result = match outcome {
            Outcome::Accept => Ok(()),
            Outcome::Status(status, message) => Err(UploadError::Status {
                status,
                message: message.to_string(),
            }),
            Outcome::Transport => Err(UploadError::Transport("connection reset".to_string())),
            Outcome::Hang => std::future::pending().await,
        };
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl EpisodeApi for RecordingApi {
    async fn create_episode(
        &self,
        request: CreateEpisodeRequest,
        progress: ByteProgress,
    ) -> UploadResult<EpisodeId> {
        self.attempt(None, Some(request.metadata), &request.audio, &progress)
            .await?;
        Ok(EpisodeId::new(EPISODE_ID))
    }

    async fn append_audio(
        &self,
        episode_id: &EpisodeId,
        request: AppendAudioRequest,
        progress: ByteProgress,
    ) -> UploadResult<()> {
        self.attempt(Some(episode_id), None, &request.audio, &progress)
            .await
    }
}

/// Reporter collecting every update.
#[derive(Default)]
pub struct CollectingReporter {
    updates: Mutex<Vec<ProgressUpdate>>,
}

#[allow(dead_code)]
impl CollectingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.updates().iter().map(|u| u.percent).collect()
    }
}

impl ProgressReporter for CollectingReporter {
    fn report(&self, update: ProgressUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}
