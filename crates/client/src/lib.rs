//! Network side of the episode uploader.
//!
//! - [`api::EpisodeApi`]: the transport seam the uploader talks to
//! - [`http::HttpEpisodeApi`]: multipart implementation over `reqwest`
//! - [`uploader::EpisodeUploader`]: sequential chunked upload with retry,
//!   cancellation and aggregated progress

pub mod api;
pub mod error;
pub mod http;
pub mod uploader;

pub use api::{
    AppendAudioRequest, AudioChunk, ByteProgress, CreateEpisodeRequest, EpisodeApi, EpisodeId,
    no_progress,
};
pub use error::{UploadError, UploadResult};
pub use http::HttpEpisodeApi;
pub use uploader::{EpisodeUploader, ProgressReporter, ProgressUpdate, UploadOptions, UploadReceipt};

/// Re-exported so callers can cancel uploads without depending on `tokio-util`.
pub use tokio_util::sync::CancellationToken;
