//! Upload error types.

use thiserror::Error;

/// Errors surfaced by the episode uploader.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A required field is missing or out of bounds; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// The server answered with a non-success status.
    #[error("server rejected request ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure not originating from `reqwest` (used by other `EpisodeApi` implementations).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered 2xx but the body was not usable.
    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("upload cancelled after {completed} of {total} chunks")]
    Cancelled { completed: u32, total: u32 },

    /// A chunk request failed terminally; later chunks were not sent.
    #[error("chunk {sequence}/{total} failed: {source}")]
    Chunk {
        sequence: u32,
        total: u32,
        /// Episode created by the first chunk, if it got that far.
        episode_id: Option<String>,
        #[source]
        source: Box<UploadError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(castup_core::Error),
}

impl From<castup_core::Error> for UploadError {
    fn from(err: castup_core::Error) -> Self {
        match err {
            castup_core::Error::Validation(msg) => Self::Validation(msg),
            other => Self::Core(other),
        }
    }
}

impl UploadError {
    /// Whether a fresh attempt of the same request may succeed.
    ///
    /// Transport failures (including a response body cut off mid-read) and
    /// 5xx responses are retryable; 4xx responses and local errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.is_request()
                    || err.is_body()
                    || err.is_decode()
            }
            Self::Transport(_) => true,
            _ => false,
        }
    }

    /// The message to show the user.
    ///
    /// Server failures show the response body verbatim; everything else uses
    /// the error's display form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Chunk { source, .. } => source.user_message(),
            other => other.to_string(),
        }
    }

    /// The innermost error, looking through chunk context.
    pub fn root(&self) -> &UploadError {
        match self {
            Self::Chunk { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;
