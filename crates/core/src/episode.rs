//! Episode drafts, attachments and pre-flight validation.

use crate::chunk::ChunkRange;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Maximum episode name length, in characters.
pub const MAX_NAME_CHARS: usize = 25;

/// Maximum episode description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 250;

/// Accepted audio extensions and the MIME type sent for each.
pub const AUDIO_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mp3"),
    ("wav", "audio/wav"),
    ("aac", "audio/aac"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("m4a", "audio/m4a"),
];

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

const OCTET_STREAM: &str = "application/octet-stream";

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn lookup(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
    let ext = extension_of(name)?;
    table
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
}

/// MIME type for an accepted audio file name.
pub fn audio_content_type(name: &str) -> Option<&'static str> {
    lookup(AUDIO_TYPES, name)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Descriptive fields of an episode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    /// Podcast the episode is added to.
    pub podcast_id: String,
    pub name: String,
    pub description: String,
    pub is_explicit: bool,
}

/// A small binary file sent whole (the cover image).
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = lookup(IMAGE_TYPES, &file_name).unwrap_or(OCTET_STREAM);
        Self {
            file_name,
            content_type: content_type.to_string(),
            data: data.into(),
        }
    }

    /// Read an attachment from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(file_name_of(path), data))
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
enum AudioData {
    File(PathBuf),
    Memory(Bytes),
}

/// The episode audio. Chunks are read lazily, one range at a time.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioSource {
    file_name: String,
    size: u64,
    data: AudioData,
}

impl AudioSource {
    /// Describe an audio file on disk without reading it.
    pub async fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(crate::Error::Validation(format!(
                "{} is not a file.",
                path.display()
            )));
        }
        Ok(Self {
            file_name: file_name_of(path),
            size: metadata.len(),
            data: AudioData::File(path.to_path_buf()),
        })
    }

    /// Audio held in memory.
    pub fn from_bytes(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            file_name: file_name.into(),
            size: data.len() as u64,
            data: AudioData::Memory(data),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// MIME type derived from the file extension, if the format is accepted.
    pub fn content_type(&self) -> Option<&'static str> {
        audio_content_type(&self.file_name)
    }

    /// Read the bytes of one chunk.
    pub async fn read_range(&self, range: &ChunkRange) -> crate::Result<Bytes> {
        if range.start > range.end {
            return Err(crate::Error::UploadSession(format!(
                "inverted range {}..{}",
                range.start, range.end
            )));
        }
        if range.end > self.size {
            return Err(crate::Error::UploadSession(format!(
                "range {}..{} exceeds audio size {}",
                range.start, range.end, self.size
            )));
        }
        match &self.data {
            AudioData::Memory(data) => Ok(data.slice(range.start as usize..range.end as usize)),
            AudioData::File(path) => {
                let len = usize::try_from(range.len()).map_err(|_| {
                    crate::Error::UploadSession("chunk size exceeds platform limits".to_string())
                })?;
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(range.start)).await?;
                let mut buf = vec![0u8; len];
                file.read_exact(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSource")
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .finish()
    }
}

/// Everything the user submits for a new episode.
#[derive(Clone, Debug, Default)]
pub struct EpisodeDraft {
    pub metadata: EpisodeMetadata,
    pub cover: Option<Attachment>,
    pub audio: Option<AudioSource>,
}

impl EpisodeDraft {
    /// Check required fields and limits before any request is sent.
    pub fn validate(&self) -> crate::Result<()> {
        let fail = |msg: &str| Err(crate::Error::Validation(msg.to_string()));
        let meta = &self.metadata;

        if meta.podcast_id.trim().is_empty() {
            return fail("Podcast is required.");
        }
        if self.cover.as_ref().is_none_or(|c| c.data.is_empty()) {
            return fail("Cover Image, Episode Name and Description Required.");
        }
        if meta.name.trim().is_empty() || meta.description.trim().is_empty() {
            return fail("Cover Image, Episode Name and Description Required.");
        }
        if meta.name.chars().count() > MAX_NAME_CHARS {
            return Err(crate::Error::Validation(format!(
                "Episode name must be at most {MAX_NAME_CHARS} characters."
            )));
        }
        if meta.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(crate::Error::Validation(format!(
                "Episode description must be at most {MAX_DESCRIPTION_CHARS} characters."
            )));
        }

        let Some(audio) = &self.audio else {
            return fail("Audio file required.");
        };
        if audio.content_type().is_none() {
            return Err(crate::Error::Validation(format!(
                "Unsupported audio format: {}",
                audio.file_name()
            )));
        }
        if audio.size() == 0 {
            return fail("Audio file is empty.");
        }
        Ok(())
    }
}
