//! Per-subject mutual exclusion for job submission.
//!
//! [`JobGuard`] guarantees at most one in-flight job per subject within a
//! running process. It is not a distributed lock and makes no claim
//! about server-side idempotency.
//!
//! Acquiring hands out a [`GuardLease`]. The lease releases its own entry
//! exactly once, explicitly or on drop, and never touches a newer entry
//! for the same subject. [`JobGuard::release`] stays available as the
//! unconditional, idempotent clear used by cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::{SubjectId, Timestamp};

#[derive(Debug, Clone, Copy)]
struct GuardEntry {
    generation: u64,
    started_at: Timestamp,
}

#[derive(Debug, Default)]
struct GuardState {
    entries: HashMap<SubjectId, GuardEntry>,
    next_generation: u64,
}

/// Process-wide map of subjects with an active job.
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct JobGuard {
    inner: Arc<Mutex<GuardState>>,
}

impl JobGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the guard for `subject_id`.
    ///
    /// Returns `None` if the subject already has an active entry.
    pub fn try_acquire(&self, subject_id: &SubjectId) -> Option<GuardLease> {
        let mut state = self.lock();
        if state.entries.contains_key(subject_id) {
            return None;
        }

        state.next_generation += 1;
        let entry = GuardEntry {
            generation: state.next_generation,
            started_at: chrono::Utc::now(),
        };
        state.entries.insert(subject_id.clone(), entry);

        tracing::debug!(subject_id = %subject_id, generation = entry.generation, "Job guard armed");

        Some(GuardLease {
            guard: self.clone(),
            subject_id: subject_id.clone(),
            generation: entry.generation,
            started_at: entry.started_at,
            released: false,
        })
    }

    /// Clear the entry for `subject_id` unconditionally.
    ///
    /// Returns whether an entry was removed; calling this on an unarmed
    /// subject is a no-op.
    pub fn release(&self, subject_id: &SubjectId) -> bool {
        let removed = self.lock().entries.remove(subject_id).is_some();
        if removed {
            tracing::debug!(subject_id = %subject_id, "Job guard released");
        }
        removed
    }

    pub fn is_active(&self, subject_id: &SubjectId) -> bool {
        self.lock().entries.contains_key(subject_id)
    }

    pub fn started_at(&self, subject_id: &SubjectId) -> Option<Timestamp> {
        self.lock().entries.get(subject_id).map(|e| e.started_at)
    }

    /// Number of subjects currently armed.
    pub fn active_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Subjects currently armed, in no particular order.
    pub fn active_subjects(&self) -> Vec<SubjectId> {
        self.lock().entries.keys().cloned().collect()
    }

    // ---- private helpers ----

    /// Remove the entry only if it still belongs to `generation`.
    fn release_generation(&self, subject_id: &SubjectId, generation: u64) -> bool {
        let mut state = self.lock();
        let owned = state
            .entries
            .get(subject_id)
            .is_some_and(|e| e.generation == generation);
        if owned {
            state.entries.remove(subject_id);
            tracing::debug!(subject_id = %subject_id, generation, "Job guard released by lease");
        }
        owned
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that the holder armed the guard for one subject.
///
/// Dropping the lease releases it.
#[derive(Debug)]
pub struct GuardLease {
    guard: JobGuard,
    subject_id: SubjectId,
    generation: u64,
    started_at: Timestamp,
    released: bool,
}

impl GuardLease {
    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    /// When the guard was armed. Authoritative start time for the job.
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Whether this lease still owns the subject's entry.
    ///
    /// Turns false once the lease is released or the entry was cleared
    /// through [`JobGuard::release`].
    pub fn is_held(&self) -> bool {
        !self.released
            && self
                .guard
                .lock()
                .entries
                .get(&self.subject_id)
                .is_some_and(|e| e.generation == self.generation)
    }

    /// Release the lease. Returns whether this call cleared the entry.
    pub fn release(mut self) -> bool {
        self.release_once()
    }

    fn release_once(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.guard
            .release_generation(&self.subject_id, self.generation)
    }
}

impl Drop for GuardLease {
    fn drop(&mut self) {
        self.release_once();
    }
}
