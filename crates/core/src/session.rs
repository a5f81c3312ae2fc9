//! Upload session state and lifecycle.

use crate::chunk::{ChunkPlan, ChunkRange};
use crate::label::{ChunkLabel, UploadId};
use crate::progress::{ProgressSnapshot, ProgressTracker};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Upload session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Created, no request issued yet.
    Pending,
    /// Chunks are being sent.
    Uploading,
    /// Every chunk was accepted.
    Completed,
    /// A chunk request failed; no further chunks are sent.
    Failed,
    /// The caller cancelled the upload.
    Cancelled,
}

impl SessionState {
    /// Check if the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Client-side state of one episode upload attempt.
///
/// One session exists per submission and is never recreated mid-upload. The
/// progress tracker sits behind a shared handle so transport callbacks can
/// feed it while the session itself stays owned by the uploader.
#[derive(Debug)]
pub struct UploadSession {
    upload_id: UploadId,
    plan: ChunkPlan,
    state: SessionState,
    current_chunk_index: usize,
    progress: Arc<Mutex<ProgressTracker>>,
}

impl UploadSession {
    /// Create a session for a file of `file_size` bytes.
    pub fn new(file_size: u64, chunk_size: u64, overhead_per_request: u64) -> crate::Result<Self> {
        let plan = ChunkPlan::new(file_size, chunk_size)?;
        let tracker = ProgressTracker::new(file_size, plan.total_chunks(), overhead_per_request);
        Ok(Self {
            upload_id: UploadId::new(),
            plan,
            state: SessionState::Pending,
            current_chunk_index: 0,
            progress: Arc::new(Mutex::new(tracker)),
        })
    }

    pub fn upload_id(&self) -> UploadId {
        self.upload_id
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Index of the next chunk to send; equals `plan().len()` once all chunks resolved.
    pub fn current_chunk_index(&self) -> usize {
        self.current_chunk_index
    }

    /// The chunk to send next, if any.
    pub fn current_chunk(&self) -> Option<&ChunkRange> {
        self.plan.get(self.current_chunk_index)
    }

    /// Progress denominator (file size plus per-request overhead).
    pub fn total_size(&self) -> u64 {
        self.tracker().total_bytes()
    }

    /// Bytes of chunks whose requests completed successfully.
    pub fn uploaded_bytes(&self) -> u64 {
        self.tracker().uploaded_bytes()
    }

    /// Shared handle to the progress tracker, for transport callbacks.
    pub fn progress(&self) -> Arc<Mutex<ProgressTracker>> {
        Arc::clone(&self.progress)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tracker().snapshot()
    }

    /// Label carried by the request for `range`.
    pub fn label_for(&self, range: &ChunkRange) -> crate::Result<ChunkLabel> {
        ChunkLabel::new(self.upload_id, range.sequence(), self.plan.total_chunks())
    }

    /// Mark the session as started.
    pub fn begin(&mut self) -> crate::Result<()> {
        if self.state != SessionState::Pending {
            return Err(crate::Error::UploadSession(format!(
                "cannot begin session in state {:?}",
                self.state
            )));
        }
        self.state = SessionState::Uploading;
        Ok(())
    }

    /// The current chunk's request succeeded. Returns the new percentage.
    pub fn complete_chunk(&mut self) -> crate::Result<u8> {
        let range = self.resolve_current()?;
        let percent = self.tracker().confirm(range.len());
        self.current_chunk_index += 1;
        if self.current_chunk_index == self.plan.len() {
            self.state = SessionState::Completed;
        }
        Ok(percent)
    }

    /// The current chunk's request failed terminally.
    pub fn fail_chunk(&mut self) -> crate::Result<()> {
        self.resolve_current()?;
        self.tracker().reset_in_flight();
        self.current_chunk_index += 1;
        self.state = SessionState::Failed;
        Ok(())
    }

    /// Stop the session; no-op once terminal.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.tracker().reset_in_flight();
            self.state = SessionState::Cancelled;
        }
    }

    fn resolve_current(&self) -> crate::Result<ChunkRange> {
        if self.state != SessionState::Uploading {
            return Err(crate::Error::UploadSession(format!(
                "no chunk in flight in state {:?}",
                self.state
            )));
        }
        self.current_chunk().copied().ok_or_else(|| {
            crate::Error::UploadSession("all chunks already resolved".to_string())
        })
    }

    fn tracker(&self) -> MutexGuard<'_, ProgressTracker> {
        // A panicking progress callback must not wedge the session.
        self.progress.lock().unwrap_or_else(|e| e.into_inner())
    }
}
