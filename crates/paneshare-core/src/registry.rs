//! In-memory session registry.
//!
//! Structural changes (insert/remove) take the map's write lock and are
//! therefore exclusive with `list`. Each record sits behind its own mutex so
//! cursor advancement and child appends are atomic per record without
//! blocking unrelated sessions. No lock is ever held across backend IO:
//! callers copy what they need out, talk to the backend, then come back.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::error::SessionError;
use crate::types::{SessionId, SessionRecord};

type Slot = Arc<Mutex<SessionRecord>>;

#[derive(Debug, Default)]
struct Inner {
    live: HashMap<SessionId, Slot>,
    /// Identifiers that were handed out once and must never come back.
    retired: HashSet<SessionId>,
}

/// Concurrent map of session id to record.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

fn lock(slot: &Slot) -> MutexGuard<'_, SessionRecord> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fully formed record and return its identifier.
    ///
    /// If the record's id is already live or was used before, a fresh one is
    /// assigned. Records without any backend handle are rejected.
    pub fn create(&self, mut record: SessionRecord) -> Result<SessionId, SessionError> {
        if !record.has_backend() {
            return Err(SessionError::InvalidRecord(
                "session has neither a direct nor a persistent handle".into(),
            ));
        }
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        while inner.live.contains_key(&record.id) || inner.retired.contains(&record.id) {
            record.id = SessionId::new();
        }
        let id = record.id;
        inner.live.insert(id, Arc::new(Mutex::new(record)));
        Ok(id)
    }

    /// Snapshot of one record.
    pub fn get(&self, id: &SessionId) -> Option<SessionRecord> {
        let slot = self.slot(id)?;
        let record = lock(&slot).clone();
        Some(record)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .contains_key(id)
    }

    /// Run `f` with exclusive access to one record.
    ///
    /// Returns `None` when the id is unknown. `f` must not block on IO.
    pub fn update<R>(&self, id: &SessionId, f: impl FnOnce(&mut SessionRecord) -> R) -> Option<R> {
        let slot = self.slot(id)?;
        let mut record = lock(&slot);
        Some(f(&mut record))
    }

    /// Snapshot of every live record, ordered by creation time.
    pub fn list(&self) -> Vec<SessionRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<SessionRecord> =
            inner.live.values().map(|slot| lock(slot).clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        records
    }

    /// Remove a record. Children are left in place with their parent link.
    pub fn remove(&self, id: &SessionId) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.live.remove(id).is_some() {
            inner.retired.insert(*id);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &SessionId) -> Option<Slot> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .get(id)
            .cloned()
    }
}
