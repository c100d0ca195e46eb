//! Sync bookkeeping shared by the platform upload loops.
//!
//! The core never talks to the server itself; the platform layer runs the
//! fetch/merge/upload round trips. What lives here is the part every
//! platform got subtly wrong at least once: detecting that the user edited
//! the vault while an upload was in flight, and classifying the server's
//! status codes into the outcomes that trigger another fetch-merge pass.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Tracks local vault mutations across the upload round trip.
///
/// Every local write bumps a sequence number and marks the vault dirty.
/// An upload snapshots the sequence before serializing the vault; when the
/// server acknowledges, the dirty flag is cleared only if no write landed
/// in between. Safe to call from any thread.
#[derive(Debug, Default)]
pub struct MutationTracker {
    inner: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    sequence: u64,
    dirty: bool,
}

/// Snapshot of the mutation sequence taken when an upload starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadToken {
    sequence: u64,
}

impl MutationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        // Both fields are plain values, so a poisoned lock cannot leave
        // them torn.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a local write. Returns the new sequence number.
    pub fn record_local_write(&self) -> u64 {
        let mut state = self.state();
        state.sequence += 1;
        state.dirty = true;
        state.sequence
    }

    /// Current mutation sequence.
    pub fn sequence(&self) -> u64 {
        self.state().sequence
    }

    /// Whether the vault has local changes not yet acknowledged by the
    /// server.
    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    /// Snapshots the sequence at the start of an upload.
    pub fn begin_upload(&self) -> UploadToken {
        UploadToken {
            sequence: self.state().sequence,
        }
    }

    /// Settles an acknowledged upload.
    ///
    /// Returns `true` if a local write landed while the upload was in
    /// flight; the dirty flag then stays set and the caller should upload
    /// again. Otherwise the dirty flag is cleared.
    pub fn complete_upload(&self, token: UploadToken) -> bool {
        let mut state = self.state();
        if state.sequence == token.sequence {
            state.dirty = false;
            false
        } else {
            true
        }
    }
}

/// Server response to a vault upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// New revision accepted.
    Accepted,
    /// Server has changes the client has not seen; fetch and merge first.
    MergeRequired,
    /// Upload was based on a stale revision; fetch and merge first.
    RevisionOutdated,
    /// Any other status code.
    Failed(i64),
}

impl UploadStatus {
    /// Converts from the wire status code.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => UploadStatus::Accepted,
            1 => UploadStatus::MergeRequired,
            2 => UploadStatus::RevisionOutdated,
            other => UploadStatus::Failed(other),
        }
    }

    /// Converts to the wire status code.
    pub fn code(&self) -> i64 {
        match self {
            UploadStatus::Accepted => 0,
            UploadStatus::MergeRequired => 1,
            UploadStatus::RevisionOutdated => 2,
            UploadStatus::Failed(code) => *code,
        }
    }

    /// Whether the client should run another fetch-merge-upload cycle.
    pub fn needs_resync(&self) -> bool {
        matches!(
            self,
            UploadStatus::MergeRequired | UploadStatus::RevisionOutdated
        )
    }
}
