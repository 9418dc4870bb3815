//! Per-connection session state (L4)
//!
//! A [`Session`] is created lazily on the first request over a transport
//! connection, reused for every subsequent request on that connection, and
//! removed when the transport reports disconnect. Its data bag carries
//! cross-call provider state (e.g. an open handle a shell tool wants to
//! reuse); mutation is serialized by a per-session lock so no global lock is
//! ever held across an `await`.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

type CleanupFn = Box<dyn FnOnce() + Send>;

/// Data-bag key a transport sets to register this connection's
/// `crate::providers::SubscriptionSink`, so `resources/subscribe` can push
/// change notifications back down whatever channel owns the connection.
pub const SUBSCRIPTION_SINK_KEY: &str = "subscription_sink";

/// Per-connection state, identified by a process-wide-unique UUID.
pub struct Session {
    /// Unique, immutable session id
    pub id: Uuid,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    initialized: AtomicBool,
    data: Mutex<HashMap<String, Box<dyn Any + Send + Sync>>>,
    cleanups: Mutex<Vec<CleanupFn>>,
}

impl Session {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            initialized: AtomicBool::new(false),
            data: Mutex::new(HashMap::new()),
            cleanups: Mutex::new(Vec::new()),
        }
    }

    /// Mark the MCP `initialize` handshake as complete for this connection
    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    /// Whether `initialize` has completed on this connection
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Store a typed value in the session's data bag under `key`
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.data.lock().unwrap().insert(key.into(), Box::new(value));
    }

    /// Read a typed value from the data bag, if present and of type `T`
    pub fn with<T: 'static, R>(&self, key: &str, f: impl FnOnce(&T) -> R) -> Option<R> {
        let data = self.data.lock().unwrap();
        data.get(key).and_then(|v| v.downcast_ref::<T>()).map(f)
    }

    /// Remove a value from the data bag
    pub fn remove(&self, key: &str) {
        self.data.lock().unwrap().remove(key);
    }

    /// Register a callback to run exactly once, when the session is deleted.
    /// Callbacks registered here run even if a handler panicked mid-call;
    /// they are the only cleanup the core guarantees.
    pub fn register_cleanup(&self, f: impl FnOnce() + Send + 'static) {
        self.cleanups.lock().unwrap().push(Box::new(f));
    }

    fn run_cleanups(&self) {
        let callbacks = std::mem::take(&mut *self.cleanups.lock().unwrap());
        for cb in callbacks {
            cb();
        }
    }
}

/// In-memory mapping from session id to [`Session`].
///
/// Concurrent access is via [`DashMap`], which shards its internal locking
/// so distinct sessions never contend on the same stripe; each `Session`'s
/// own data bag has its own lock on top of that.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Arc<Session>>,
}

impl SessionStore {
    /// Create an empty session store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `id`, creating one with a fresh UUID if `id`
    /// is `None` or not present.
    #[must_use]
    pub fn get_or_create(&self, id: Option<Uuid>) -> Arc<Session> {
        if let Some(id) = id
            && let Some(existing) = self.sessions.get(&id)
        {
            return Arc::clone(&existing);
        }

        let id = id.unwrap_or_else(Uuid::new_v4);
        let session = Arc::new(Session::new(id));
        self.sessions.insert(id, Arc::clone(&session));
        session
    }

    /// Look up a session without creating one
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|s| Arc::clone(&s))
    }

    /// Remove a session, running its registered cleanup callbacks
    pub fn delete(&self, id: Uuid) {
        if let Some((_, session)) = self.sessions.remove(&id) {
            session.run_cleanups();
        }
    }

    /// Number of live sessions, for diagnostics
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store currently holds no sessions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_reuses_existing_session() {
        let store = SessionStore::new();
        let first = store.get_or_create(None);
        let second = store.get_or_create(Some(first.id));
        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_or_create_with_unknown_id_makes_a_new_session() {
        let store = SessionStore::new();
        let unknown = Uuid::new_v4();
        let session = store.get_or_create(Some(unknown));
        assert_eq!(session.id, unknown);
    }

    #[test]
    fn delete_runs_cleanup_callbacks_once() {
        let store = SessionStore::new();
        let session = store.get_or_create(None);
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        session.register_cleanup(move || ran_clone.store(true, Ordering::SeqCst));

        store.delete(session.id);
        assert!(ran.load(Ordering::SeqCst));
        assert!(store.get(session.id).is_none());
    }

    #[test]
    fn data_bag_survives_until_deleted_and_is_typed() {
        let session = Session::new(Uuid::new_v4());
        session.set("count", 42_i64);
        assert_eq!(session.with::<i64, _>("count", |v| *v), Some(42));
        assert_eq!(session.with::<String, _>("count", |v| v.clone()), None);
        session.remove("count");
        assert_eq!(session.with::<i64, _>("count", |v| *v), None);
    }

    #[test]
    fn initialize_flag_defaults_false_and_latches_true() {
        let session = Session::new(Uuid::new_v4());
        assert!(!session.is_initialized());
        session.mark_initialized();
        assert!(session.is_initialized());
    }
}
