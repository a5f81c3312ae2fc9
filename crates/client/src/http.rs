//! `reqwest` implementation of [`EpisodeApi`].

use crate::api::{
    AppendAudioRequest, AudioChunk, ByteProgress, CreateEpisodeRequest, EpisodeApi, EpisodeId,
};
use crate::error::{UploadError, UploadResult};
use async_trait::async_trait;
use bytes::Bytes;
use castup_core::{ChunkLabel, ClientConfig};
use futures::Stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Url};

/// Multipart client for the episode endpoints.
#[derive(Clone)]
pub struct HttpEpisodeApi {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    granularity: usize,
}

impl HttpEpisodeApi {
    pub fn new(config: &ClientConfig) -> UploadResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Self::with_client(builder.build()?, config)
    }

    /// Use a preconfigured `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, config: &ClientConfig) -> UploadResult<Self> {
        // A trailing slash keeps any path prefix of the base URL when joining.
        let mut base = config.server_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| UploadError::Validation(format!("invalid server URL: {e}")))?;
        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
            granularity: config.progress_granularity.max(1),
        })
    }

    fn url(&self, path: &str) -> UploadResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| UploadError::Validation(format!("failed to build API URL: {e}")))
    }

    fn audio_part(&self, audio: AudioChunk, progress: ByteProgress) -> UploadResult<Part> {
        let len = audio.len();
        let stream = progress_stream(audio.data, self.granularity, progress);
        let part = Part::stream_with_length(Body::wrap_stream(stream), len)
            .file_name(audio.file_name)
            .mime_str(&audio.content_type)?;
        Ok(part)
    }

    async fn send(&self, url: Url, form: Form) -> UploadResult<String> {
        let mut request = self.http.post(url.clone()).multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%url, %status, "episode API response");
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }
}

fn with_label(form: Form, label: &ChunkLabel) -> Form {
    form.text("uploadId", label.upload_id.to_string())
        .text("chunkNumber", label.sequence.to_string())
        .text("totalChunks", label.total.to_string())
}

/// Stream `data` in slices of `granularity` bytes, reporting the cumulative
/// count as each slice is handed to the transport.
fn progress_stream(
    data: Bytes,
    granularity: usize,
    progress: ByteProgress,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let total = data.len();
    let slices = (0..total).step_by(granularity).map(move |start| {
        let end = (start + granularity).min(total);
        progress(end as u64);
        Ok::<_, std::io::Error>(data.slice(start..end))
    });
    futures::stream::iter(slices)
}

/// The create endpoint answers with the episode id, either as plain text or
/// as a JSON string.
fn parse_episode_id(body: &str) -> UploadResult<EpisodeId> {
    let trimmed = body.trim();
    let id = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(id)) => id,
        _ => trimmed.to_string(),
    };
    if id.is_empty() {
        return Err(UploadError::Protocol(
            "episode creation returned an empty id".to_string(),
        ));
    }
    Ok(EpisodeId::new(id))
}

#[async_trait]
impl EpisodeApi for HttpEpisodeApi {
    async fn create_episode(
        &self,
        request: CreateEpisodeRequest,
        progress: ByteProgress,
    ) -> UploadResult<EpisodeId> {
        let CreateEpisodeRequest {
            metadata,
            thumbnail,
            audio,
        } = request;
        let label = audio.label;

        let thumbnail = Part::bytes(thumbnail.data.to_vec())
            .file_name(thumbnail.file_name)
            .mime_str(&thumbnail.content_type)?;
        let form = Form::new()
            .text("episodeName", metadata.name)
            .text("description", metadata.description)
            .text("isExplicit", metadata.is_explicit.to_string())
            .text("podcastId", metadata.podcast_id)
            .part("thumbnail", thumbnail)
            .part("audioFile", self.audio_part(audio, progress)?);
        let form = with_label(form, &label);

        let body = self.send(self.url("episode/add")?, form).await?;
        parse_episode_id(&body)
    }

    async fn append_audio(
        &self,
        episode_id: &EpisodeId,
        request: AppendAudioRequest,
        progress: ByteProgress,
    ) -> UploadResult<()> {
        let label = request.audio.label;
        let form = Form::new().part("audioFile", self.audio_part(request.audio, progress)?);
        let form = with_label(form, &label);

        let url = self.url(&format!("episode/{episode_id}/addAudio"))?;
        self.send(url, form).await?;
        Ok(())
    }
}
