//! In-memory triage session store with sliding TTL.
//!
//! Key properties:
//! - Sessions live only in memory, keyed by a random id
//! - A session untouched for longer than the TTL is gone: `get`/`update`
//!   remove it lazily, `cleanup` removes all stale entries eagerly
//! - Every operation takes the map lock once, so concurrent requests on
//!   the same id never lose an update
//! - Ids come from an injectable generator and are inserted only if absent

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::classifier::DiseaseCandidate;
use crate::knowledge::CanonicalSymptom;

/// Fresh ids tried before `create` gives up.
pub const MAX_ID_ATTEMPTS: usize = 8;

pub type SessionId = String;

#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("Session store lock poisoned")]
    LockPoisoned,

    #[error("Could not allocate a unique session id after {0} attempts")]
    IdSpaceExhausted(usize),
}

// ═══════════════════════════════════════════════════════════
// Clock
// ═══════════════════════════════════════════════════════════

/// Time source for session timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            if let Ok(delta) = chrono::Duration::from_std(by) {
                *now += delta;
            }
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        // A poisoned clock still holds a valid instant.
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Id generation
// ═══════════════════════════════════════════════════════════

/// Source of candidate session ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> SessionId;
}

/// Random UUID v4 ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> SessionId {
        Uuid::new_v4().to_string()
    }
}

// ═══════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════

/// Mutable triage state of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Free text the session was started with.
    pub text: String,
    pub extracted_symptoms: BTreeSet<CanonicalSymptom>,
    pub candidate_diseases: Vec<DiseaseCandidate>,
    pub asked_questions: BTreeSet<CanonicalSymptom>,
    /// Bumped by every successful write.
    pub revision: u64,
}

impl SessionData {
    pub fn new(
        text: impl Into<String>,
        extracted_symptoms: BTreeSet<CanonicalSymptom>,
        candidate_diseases: Vec<DiseaseCandidate>,
    ) -> Self {
        Self {
            text: text.into(),
            extracted_symptoms,
            candidate_diseases,
            ..Self::default()
        }
    }
}

/// A stored session: data plus bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub last_touched_at: DateTime<Utc>,
    pub data: SessionData,
}

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

pub struct SessionStore {
    entries: RwLock<HashMap<SessionId, Session>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl SessionStore {
    /// Store on the wall clock with random ids.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
            ids: Arc::new(UuidGenerator),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn write_entries(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<SessionId, Session>>, SessionStoreError> {
        self.entries.write().map_err(|_| SessionStoreError::LockPoisoned)
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        // A clock that moved backwards yields a negative age: still fresh.
        now.signed_duration_since(session.last_touched_at)
            .to_std()
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }

    /// Store `data` under a fresh id.
    pub fn create(&self, data: SessionData) -> Result<SessionId, SessionStoreError> {
        let mut entries = self.write_entries()?;
        let now = self.clock.now();

        let id = (1..=MAX_ID_ATTEMPTS)
            .map(|attempt| (attempt, self.ids.generate()))
            .find_map(|(attempt, id)| {
                if entries.contains_key(&id) {
                    tracing::warn!(attempt, "Session id collision, regenerating");
                    None
                } else {
                    Some(id)
                }
            })
            .ok_or_else(|| {
                tracing::error!(attempts = MAX_ID_ATTEMPTS, "Session id space exhausted");
                SessionStoreError::IdSpaceExhausted(MAX_ID_ATTEMPTS)
            })?;

        entries.insert(
            id.clone(),
            Session {
                id: id.clone(),
                created_at: now,
                last_touched_at: now,
                data,
            },
        );
        tracing::debug!(session_id = %id, "Session created");
        Ok(id)
    }

    /// Snapshot of a live session. Expired entries are removed and reported
    /// as absent.
    pub fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().map_err(|_| SessionStoreError::LockPoisoned)?;
            match entries.get(id) {
                None => return Ok(None),
                Some(session) if !self.is_expired(session, now) => return Ok(Some(session.clone())),
                Some(_) => {}
            }
        }

        // Expired under the read lock. Re-check under the write lock since a
        // concurrent update may have refreshed it in between.
        let mut entries = self.write_entries()?;
        match entries.get(id) {
            Some(session) if self.is_expired(session, now) => {
                entries.remove(id);
                tracing::info!(session_id = %id, "Session expired");
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    /// Overwrite a session's data and refresh its timestamp.
    /// Returns false if the id is unknown or expired.
    pub fn update(&self, id: &str, data: SessionData) -> Result<bool, SessionStoreError> {
        Ok(self
            .update_with(id, |current| {
                let revision = current.revision;
                *current = data;
                current.revision = revision;
            })?
            .is_some())
    }

    /// Atomic read-modify-write. `f` runs under the store lock on the live
    /// data; the revision is bumped and the timestamp refreshed afterwards.
    /// Returns `None` if the id is unknown or expired.
    pub fn update_with<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut SessionData) -> T,
    ) -> Result<Option<T>, SessionStoreError> {
        let mut entries = self.write_entries()?;
        let now = self.clock.now();

        let expired = match entries.get(id) {
            None => return Ok(None),
            Some(session) => self.is_expired(session, now),
        };
        if expired {
            entries.remove(id);
            tracing::info!(session_id = %id, "Session expired");
            return Ok(None);
        }

        let Some(session) = entries.get_mut(id) else {
            return Ok(None);
        };
        let out = f(&mut session.data);
        session.data.revision += 1;
        session.last_touched_at = now;
        Ok(Some(out))
    }

    /// Remove every stale entry. Returns how many were removed.
    pub fn cleanup(&self) -> Result<usize, SessionStoreError> {
        let mut entries = self.write_entries()?;
        let now = self.clock.now();
        let before = entries.len();
        entries.retain(|_, session| !self.is_expired(session, now));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::info!(removed, remaining = entries.len(), "Expired sessions swept");
        }
        Ok(removed)
    }

    /// Number of stored entries, stale ones included until swept.
    pub fn len(&self) -> Result<usize, SessionStoreError> {
        Ok(self
            .entries
            .read()
            .map_err(|_| SessionStoreError::LockPoisoned)?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool, SessionStoreError> {
        Ok(self.len()? == 0)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(3600);

    fn store() -> (SessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (SessionStore::with_clock(TTL, clock.clone()), clock)
    }

    fn data(symptoms: &[&str]) -> SessionData {
        SessionData::new("", symptoms.iter().map(|s| s.to_string()).collect(), Vec::new())
    }

    /// Yields a fixed sequence of ids, then repeats the last one.
    struct ScriptedIds {
        ids: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl IdGenerator for ScriptedIds {
        fn generate(&self) -> SessionId {
            let i = self.next.fetch_add(1, Ordering::SeqCst).min(self.ids.len() - 1);
            self.ids[i].to_string()
        }
    }

    #[test]
    fn create_then_get() {
        let (store, _) = store();
        let id = store.create(data(&["fever"])).unwrap();
        let session = store.get(&id).unwrap().unwrap();
        assert_eq!(session.id, id);
        assert!(session.data.extracted_symptoms.contains("fever"));
        assert_eq!(session.created_at, session.last_touched_at);
    }

    #[test]
    fn unknown_id_is_absent() {
        let (store, _) = store();
        assert!(store.get("nope").unwrap().is_none());
        assert!(!store.update("nope", SessionData::default()).unwrap());
    }

    #[test]
    fn expires_after_ttl() {
        let (store, clock) = store();
        let id = store.create(data(&["fever"])).unwrap();

        clock.advance(Duration::from_secs(3600));
        assert!(store.get(&id).unwrap().is_some(), "exactly TTL is still live");

        clock.advance(Duration::from_secs(1));
        assert!(store.get(&id).unwrap().is_none());
        assert_eq!(store.len().unwrap(), 0, "lazy expiry removes the entry");
    }

    #[test]
    fn update_slides_the_window() {
        let (store, clock) = store();
        let id = store.create(data(&["fever"])).unwrap();

        clock.advance(Duration::from_secs(3000));
        assert!(store.update(&id, data(&["fever", "cough"])).unwrap());

        clock.advance(Duration::from_secs(3000));
        let session = store.get(&id).unwrap().unwrap();
        assert_eq!(session.data.extracted_symptoms.len(), 2);
        assert!(session.last_touched_at > session.created_at);
    }

    #[test]
    fn get_does_not_refresh() {
        let (store, clock) = store();
        let id = store.create(data(&[])).unwrap();
        clock.advance(Duration::from_secs(3000));
        assert!(store.get(&id).unwrap().is_some());
        clock.advance(Duration::from_secs(601));
        assert!(store.get(&id).unwrap().is_none());
    }

    #[test]
    fn update_on_expired_session_fails() {
        let (store, clock) = store();
        let id = store.create(data(&[])).unwrap();
        clock.advance(Duration::from_secs(3601));
        assert!(!store.update(&id, data(&["cough"])).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn revision_increments_on_write() {
        let (store, _) = store();
        let id = store.create(data(&[])).unwrap();
        assert_eq!(store.get(&id).unwrap().unwrap().data.revision, 0);

        store.update(&id, data(&["fever"])).unwrap();
        let rev = store.update_with(&id, |d| d.revision).unwrap();
        assert_eq!(rev, Some(1), "closure sees the pre-bump revision");
        assert_eq!(store.get(&id).unwrap().unwrap().data.revision, 2);
    }

    #[test]
    fn cleanup_removes_only_stale() {
        let (store, clock) = store();
        let old = store.create(data(&[])).unwrap();
        clock.advance(Duration::from_secs(2000));
        let fresh = store.create(data(&[])).unwrap();
        clock.advance(Duration::from_secs(2000));

        assert_eq!(store.cleanup().unwrap(), 1);
        assert!(store.get(&old).unwrap().is_none());
        assert!(store.get(&fresh).unwrap().is_some());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn colliding_id_is_regenerated() {
        let (store, _) = store();
        let store = store.with_id_generator(Arc::new(ScriptedIds {
            ids: vec!["a", "a", "b"],
            next: AtomicUsize::new(0),
        }));
        assert_eq!(store.create(data(&[])).unwrap(), "a");
        assert_eq!(store.create(data(&[])).unwrap(), "b");
    }

    #[test]
    fn exhausted_id_space_is_an_error() {
        let (store, _) = store();
        let store = store.with_id_generator(Arc::new(ScriptedIds {
            ids: vec!["same"],
            next: AtomicUsize::new(0),
        }));
        store.create(data(&[])).unwrap();
        assert!(matches!(
            store.create(data(&[])),
            Err(SessionStoreError::IdSpaceExhausted(MAX_ID_ATTEMPTS))
        ));
    }

    #[test]
    fn concurrent_creates_get_distinct_ids() {
        let store = Arc::new(SessionStore::new(TTL));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| store.create(SessionData::default()).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: BTreeSet<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 400);
        assert_eq!(store.len().unwrap(), 400);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = Arc::new(SessionStore::new(TTL));
        let id = store.create(SessionData::default()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                let id = id.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .update_with(&id, |d| {
                                d.extracted_symptoms.insert(format!("s{t}_{i}"));
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let session = store.get(&id).unwrap().unwrap();
        assert_eq!(session.data.extracted_symptoms.len(), 200);
        assert_eq!(session.data.revision, 200);
    }
}
