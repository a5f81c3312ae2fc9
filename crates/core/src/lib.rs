//! Core domain types for chunked podcast episode uploads.
//!
//! This crate holds the pure, I/O-light pieces of the uploader:
//! - Chunk planning over a file's byte range
//! - Chunk labels correlating parts of one upload
//! - Progress aggregation across sequential requests
//! - The per-attempt upload session and its lifecycle
//! - Episode drafts and pre-flight validation
//! - Retry policy and client configuration

pub mod chunk;
pub mod config;
pub mod episode;
pub mod error;
pub mod label;
pub mod progress;
pub mod retry;
pub mod session;

pub use chunk::{ChunkPlan, ChunkRange, chunk_count};
pub use config::{ClientConfig, RetryConfig};
pub use episode::{Attachment, AudioSource, EpisodeDraft, EpisodeMetadata};
pub use error::{Error, Result};
pub use label::{ChunkLabel, UploadId};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use retry::RetryPolicy;
pub use session::{SessionState, UploadSession};

/// Default chunk size: the server's 80 MB request ceiling.
pub const DEFAULT_CHUNK_SIZE: u64 = 80_000_000;

/// Maximum chunk size accepted by configuration: 1 GiB
pub const MAX_CHUNK_SIZE: u64 = 1024 * 1024 * 1024;

/// Minimum chunk size: 1 byte
pub const MIN_CHUNK_SIZE: u64 = 1;
