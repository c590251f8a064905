//! Session store clients: the persistence seam of the wizard.
//!
//! The wizard persists through the [`SessionStore`] trait and never
//! cares which backend sits behind it:
//!
//! - [`MemorySessionStore`]: in-process map for tests and development,
//!   with call counters and failure injection for exercising error
//!   paths.
//! - [`HttpSessionStore`]: REST client to the platform backend
//!   (`http` feature, enabled by default).
//!
//! Create is called exactly once per draft lifetime; every later save is
//! an update keyed by the id the create returned. The store applies
//! last-write-wins semantics; no optimistic versioning is assumed.

pub mod record;

#[cfg(feature = "http")]
pub mod http;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::instrument;

use crate::draft::SessionId;

pub use record::{SessionRecord, SessionStatus};
#[cfg(feature = "http")]
pub use http::{HttpSessionStore, HttpStoreConfig};

/// Errors surfaced by session store implementations.
///
/// All variants are backend-shaped, not wizard-shaped: the wizard
/// converts them into its retained error phase with a human-readable
/// message and never lets them escape to the rendering layer unhandled.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// The request never produced a response (connect, timeout, DNS).
    #[error("session store request failed: {message}")]
    #[diagnostic(
        code(playroom::store::network),
        help("Check connectivity to the session backend and retry.")
    )]
    Network { message: String },

    /// The store answered with a non-success status.
    #[error("session store returned status {status}: {message}")]
    #[diagnostic(code(playroom::store::rejected))]
    Rejected { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("session store response could not be decoded: {message}")]
    #[diagnostic(code(playroom::store::decode))]
    Decode { message: String },

    /// An update or fetch referenced an id the store does not know.
    #[error("session not found: {id}")]
    #[diagnostic(code(playroom::store::not_found))]
    NotFound { id: SessionId },
}

/// Asynchronous client to the session resource.
///
/// Implementations must be cheap to share (`Arc<dyn SessionStore>`); the
/// wizard serializes its own calls, so implementations need no
/// per-session locking discipline beyond their own internal consistency.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session row from the record; returns the new opaque
    /// id. Called exactly once per draft lifetime.
    async fn create(&self, record: &SessionRecord) -> Result<SessionId, StoreError>;

    /// Fetch an existing row. `Ok(None)` means the id is unknown (used
    /// by the resume path to distinguish "gone" from transport errors).
    async fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// Overwrite the row identified by `id` with the record.
    async fn update(&self, id: &SessionId, record: &SessionRecord) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    rows: FxHashMap<SessionId, SessionRecord>,
    write_log: Vec<SessionRecord>,
    fail_queue: VecDeque<String>,
    next_id: u64,
    create_calls: u64,
    update_calls: u64,
}

/// In-process session store for tests and development.
///
/// Ids are assigned sequentially (`s-1`, `s-2`, ...) so tests stay
/// deterministic. Failures can be injected per call via
/// [`fail_next`](Self::fail_next); each queued message fails exactly one
/// subsequent call as a [`StoreError::Network`].
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an injected failure for the next store call.
    pub fn fail_next(&self, message: &str) {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .fail_queue
            .push_back(message.to_string());
    }

    /// Number of create calls the store has served (including failed
    /// injected ones).
    #[must_use]
    pub fn create_calls(&self) -> u64 {
        self.inner.lock().expect("memory store poisoned").create_calls
    }

    /// Number of update calls the store has served.
    #[must_use]
    pub fn update_calls(&self) -> u64 {
        self.inner.lock().expect("memory store poisoned").update_calls
    }

    /// The currently stored row for an id.
    #[must_use]
    pub fn row(&self, id: &SessionId) -> Option<SessionRecord> {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .rows
            .get(id)
            .cloned()
    }

    /// Every record handed to `create`/`update`, in call order.
    /// Lets tests assert exactly what the wizard sent.
    #[must_use]
    pub fn write_log(&self) -> Vec<SessionRecord> {
        self.inner
            .lock()
            .expect("memory store poisoned")
            .write_log
            .clone()
    }

    /// Pre-load a row, e.g. to exercise the resume path.
    pub fn insert_row(&self, id: SessionId, mut record: SessionRecord) {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        record.id = Some(id.clone());
        inner.rows.insert(id, record);
    }

    fn take_injected_failure(inner: &mut MemoryInner) -> Option<StoreError> {
        inner
            .fail_queue
            .pop_front()
            .map(|message| StoreError::Network { message })
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    #[instrument(skip(self, record), err)]
    async fn create(&self, record: &SessionRecord) -> Result<SessionId, StoreError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.create_calls += 1;
        inner.write_log.push(record.clone());
        if let Some(err) = Self::take_injected_failure(&mut inner) {
            return Err(err);
        }
        inner.next_id += 1;
        let id = SessionId::new(format!("s-{}", inner.next_id));
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        inner.rows.insert(id.clone(), stored);
        Ok(id)
    }

    #[instrument(skip(self), err)]
    async fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        if let Some(err) = Self::take_injected_failure(&mut inner) {
            return Err(err);
        }
        Ok(inner.rows.get(id).cloned())
    }

    #[instrument(skip(self, record), err)]
    async fn update(&self, id: &SessionId, record: &SessionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.update_calls += 1;
        inner.write_log.push(record.clone());
        if let Some(err) = Self::take_injected_failure(&mut inner) {
            return Err(err);
        }
        if !inner.rows.contains_key(id) {
            return Err(StoreError::NotFound { id: id.clone() });
        }
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        inner.rows.insert(id.clone(), stored);
        Ok(())
    }
}
