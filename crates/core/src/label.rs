//! Upload identifiers and per-chunk labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Separator between the upload ID and the sequence in legacy file names.
pub const LEGACY_LABEL_DELIMITER: &str = "<##>";

/// Random identifier correlating all chunks of one upload attempt.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(Uuid);

impl UploadId {
    /// Generate a new random upload ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidUploadId(e.to_string()))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploadId({})", self.0)
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one chunk: which upload it belongs to, where it sits, and how
/// many chunks the upload has in total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkLabel {
    pub upload_id: UploadId,
    /// 1-based position of the chunk.
    pub sequence: u32,
    /// Number of chunks in the upload.
    pub total: u32,
}

impl ChunkLabel {
    /// Create a label, checking `1 <= sequence <= total`.
    pub fn new(upload_id: UploadId, sequence: u32, total: u32) -> crate::Result<Self> {
        if sequence == 0 || sequence > total {
            return Err(crate::Error::InvalidLabel(format!(
                "sequence {sequence} outside 1..={total}"
            )));
        }
        Ok(Self {
            upload_id,
            sequence,
            total,
        })
    }

    /// Whether this is the last chunk of the upload.
    pub fn is_final(&self) -> bool {
        self.sequence == self.total
    }

    /// File name form understood by servers that reassemble by file name:
    /// `{upload_id}<##>{sequence}/{total}`.
    pub fn legacy_file_name(&self) -> String {
        format!(
            "{}{}{}/{}",
            self.upload_id, LEGACY_LABEL_DELIMITER, self.sequence, self.total
        )
    }

    /// Parse the legacy file name form.
    pub fn parse_legacy(name: &str) -> crate::Result<Self> {
        let (id, position) = name
            .split_once(LEGACY_LABEL_DELIMITER)
            .ok_or_else(|| crate::Error::InvalidLabel(format!("missing delimiter: {name}")))?;
        let (sequence, total) = position
            .split_once('/')
            .ok_or_else(|| crate::Error::InvalidLabel(format!("missing '/': {name}")))?;
        let sequence = sequence
            .parse::<u32>()
            .map_err(|e| crate::Error::InvalidLabel(format!("bad sequence: {e}")))?;
        let total = total
            .parse::<u32>()
            .map_err(|e| crate::Error::InvalidLabel(format!("bad total: {e}")))?;
        Self::new(UploadId::parse(id)?, sequence, total)
    }
}
