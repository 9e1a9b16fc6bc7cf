//! Last-known-good result per subject.
//!
//! Lets a re-opened view show a finished result without another round
//! trip. Entries are written only on successful completion and dropped
//! when a new job for the same subject is accepted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::staleness;
use crate::types::{SubjectId, Timestamp};

/// A cached result and the time the remote produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult<T> {
    pub value: T,
    pub produced_at: Option<Timestamp>,
    pub cached_at: Timestamp,
}

/// Shared map from subject to its most recent successful result.
///
/// Cheap to clone; clones share the same map.
#[derive(Debug)]
pub struct ResultCache<T> {
    entries: Arc<Mutex<HashMap<SubjectId, CachedResult<T>>>>,
}

impl<T> Clone for ResultCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for ResultCache<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Clone> ResultCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the result for `subject_id`.
    pub fn set(&self, subject_id: SubjectId, value: T, produced_at: Option<Timestamp>) {
        let entry = CachedResult {
            value,
            produced_at,
            cached_at: chrono::Utc::now(),
        };
        self.lock().insert(subject_id, entry);
    }

    pub fn get(&self, subject_id: &SubjectId) -> Option<T> {
        self.lock().get(subject_id).map(|e| e.value.clone())
    }

    /// Full entry including timestamps.
    pub fn entry(&self, subject_id: &SubjectId) -> Option<CachedResult<T>> {
        self.lock().get(subject_id).cloned()
    }

    /// Cached value only if it was produced after `started_at`.
    ///
    /// Entries without a production time are returned as-is.
    pub fn get_fresh(&self, subject_id: &SubjectId, started_at: Timestamp) -> Option<T> {
        self.lock()
            .get(subject_id)
            .filter(|e| staleness::check(e.produced_at, started_at).is_usable())
            .map(|e| e.value.clone())
    }

    pub fn has(&self, subject_id: &SubjectId) -> bool {
        self.lock().contains_key(subject_id)
    }

    /// Drop the entry for one subject. Returns whether one existed.
    pub fn invalidate(&self, subject_id: &SubjectId) -> bool {
        self.lock().remove(subject_id).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubjectId, CachedResult<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
