//! Chunk planning over a file's byte range.

use crate::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Number of chunks needed to cover `file_size` bytes with chunks of at most
/// `max_chunk_size` bytes.
pub fn chunk_count(file_size: u64, max_chunk_size: u64) -> u64 {
    if max_chunk_size == 0 {
        return 0;
    }
    file_size.div_ceil(max_chunk_size)
}

/// A contiguous byte range `[start, end)` of the source file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRange {
    /// Position in the plan (0-indexed).
    pub index: u32,
    /// First byte of the chunk.
    pub start: u64,
    /// One past the last byte of the chunk.
    pub end: u64,
}

impl ChunkRange {
    /// Size of the chunk in bytes. Zero for an inverted range.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the chunk covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// 1-based sequence number used on the wire.
    pub fn sequence(&self) -> u32 {
        self.index + 1
    }

    /// The range as a `Range<u64>`.
    pub fn as_range(&self) -> Range<u64> {
        self.start..self.end
    }
}

impl fmt::Debug for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkRange(#{} {}..{})", self.sequence(), self.start, self.end)
    }
}

/// An ordered partition of `[0, file_size)` into chunks.
///
/// Ranges are contiguous, non-overlapping, each at most `chunk_size` bytes,
/// and the last range ends at `file_size`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
    ranges: Vec<ChunkRange>,
}

impl ChunkPlan {
    /// Plan the chunks for a file.
    ///
    /// Empty files are refused: an upload always carries at least one byte of
    /// audio.
    pub fn new(file_size: u64, max_chunk_size: u64) -> crate::Result<Self> {
        if max_chunk_size < MIN_CHUNK_SIZE {
            return Err(crate::Error::InvalidChunkSize {
                size: max_chunk_size,
                min: MIN_CHUNK_SIZE,
                max: MAX_CHUNK_SIZE,
            });
        }
        if file_size == 0 {
            return Err(crate::Error::EmptyFile);
        }

        let count = chunk_count(file_size, max_chunk_size);
        let count = u32::try_from(count).map_err(|_| crate::Error::InvalidChunkSize {
            size: max_chunk_size,
            min: file_size.div_ceil(u64::from(u32::MAX)),
            max: MAX_CHUNK_SIZE,
        })?;

        let mut ranges = Vec::with_capacity(count as usize);
        let mut start = 0u64;
        for index in 0..count {
            let end = start.saturating_add(max_chunk_size).min(file_size);
            ranges.push(ChunkRange { index, start, end });
            start = end;
        }

        Ok(Self {
            file_size,
            chunk_size: max_chunk_size,
            ranges,
        })
    }

    /// Size of the planned file.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Maximum chunk size the plan was built with.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Always false for a constructed plan; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether the whole file fits into a single request.
    pub fn is_single(&self) -> bool {
        self.ranges.len() == 1
    }

    /// Number of chunks as carried on the wire.
    pub fn total_chunks(&self) -> u32 {
        self.ranges.len() as u32
    }

    /// All ranges in upload order.
    pub fn ranges(&self) -> &[ChunkRange] {
        &self.ranges
    }

    /// Range at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&ChunkRange> {
        self.ranges.get(index)
    }

    /// Iterate ranges in upload order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChunkRange> {
        self.ranges.iter()
    }
}

impl<'a> IntoIterator for &'a ChunkPlan {
    type Item = &'a ChunkRange;
    type IntoIter = std::slice::Iter<'a, ChunkRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
