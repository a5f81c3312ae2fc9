//! Progress aggregation across sequential chunk requests.
//!
//! Each request reports cumulative bytes for itself only. The tracker combines
//! that in-flight figure with the bytes of every request already confirmed to
//! produce one percentage for the whole transfer.

use serde::{Deserialize, Serialize};

/// Point-in-time view of an upload's progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Percentage in `0..=100`.
    pub percent: u8,
    /// Bytes of requests that completed successfully.
    pub uploaded_bytes: u64,
    /// Bytes handed to the transport by the current request.
    pub in_flight_bytes: u64,
    /// Denominator used for the percentage.
    pub total_bytes: u64,
    pub completed_requests: u32,
    pub planned_requests: u32,
}

/// Combines per-request byte progress into an overall percentage.
///
/// `total_bytes` is `file_size + overhead_per_request * planned_requests`. With
/// a non-zero overhead the byte ratio never reaches 100 on its own, so the
/// percentage is held at 99 until every planned request is confirmed and then
/// set to exactly 100. The reported value never decreases.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    total_bytes: u64,
    planned_requests: u32,
    uploaded_bytes: u64,
    in_flight_bytes: u64,
    completed_requests: u32,
    reported: u8,
}

impl ProgressTracker {
    pub fn new(file_size: u64, planned_requests: u32, overhead_per_request: u64) -> Self {
        let overhead = overhead_per_request.saturating_mul(u64::from(planned_requests));
        Self {
            total_bytes: file_size.saturating_add(overhead),
            planned_requests,
            uploaded_bytes: 0,
            in_flight_bytes: 0,
            completed_requests: 0,
            reported: 0,
        }
    }

    /// Record cumulative bytes sent by the in-flight request.
    pub fn observe(&mut self, loaded: u64) -> u8 {
        let headroom = self.total_bytes - self.uploaded_bytes;
        self.in_flight_bytes = loaded.min(headroom);
        self.refresh()
    }

    /// The in-flight request completed; move its bytes into the confirmed total.
    pub fn confirm(&mut self, bytes: u64) -> u8 {
        self.uploaded_bytes = self.uploaded_bytes.saturating_add(bytes).min(self.total_bytes);
        self.in_flight_bytes = 0;
        self.completed_requests = self.completed_requests.saturating_add(1);
        self.refresh()
    }

    /// Drop the in-flight figure after an abandoned attempt.
    ///
    /// The reported percentage is left as is.
    pub fn reset_in_flight(&mut self) {
        self.in_flight_bytes = 0;
    }

    /// Current percentage.
    pub fn percent(&self) -> u8 {
        self.reported
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Whether every planned request has been confirmed.
    pub fn is_complete(&self) -> bool {
        self.completed_requests >= self.planned_requests
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            percent: self.reported,
            uploaded_bytes: self.uploaded_bytes,
            in_flight_bytes: self.in_flight_bytes,
            total_bytes: self.total_bytes,
            completed_requests: self.completed_requests,
            planned_requests: self.planned_requests,
        }
    }

    fn refresh(&mut self) -> u8 {
        self.reported = self.reported.max(self.compute());
        self.reported
    }

    fn compute(&self) -> u8 {
        if self.planned_requests > 0 && self.is_complete() {
            return 100;
        }
        if self.total_bytes == 0 {
            return 0;
        }
        let done = u128::from(self.uploaded_bytes + self.in_flight_bytes);
        let total = u128::from(self.total_bytes);
        let rounded = (done * 100 + total / 2) / total;
        rounded.min(99) as u8
    }
}
