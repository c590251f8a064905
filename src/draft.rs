//! In-memory draft state for a session being built across stages.
//!
//! A [`SessionDraft`] is owned exclusively by one wizard instance. It
//! accumulates stage payloads monotonically (advancing never discards a
//! previously completed stage's payload, so back-navigation is
//! lossless), binds its server-assigned [`SessionId`] at most once, and
//! tracks a coarse [`DraftStatus`] for the rendering layer.
//!
//! Mutation goes through the wizard; everything public here is a
//! read-only view plus constructors.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::stage::{StageId, StagePayload};

/// Opaque identifier of a persisted session, assigned by the session
/// store on create and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Coarse lifecycle status of a draft, mirrored into persisted records
/// and read by the rendering layer to drive loading/error affordances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Editable; no persistence call outstanding.
    Draft,
    /// Exactly one persistence call is in flight.
    Persisting,
    /// The last persistence call succeeded.
    Persisted,
    /// The last persistence call failed; the draft is retained.
    Error,
}

impl DraftStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Persisting => "persisting",
            DraftStatus::Persisted => "persisted",
            DraftStatus::Error => "error",
        }
    }
}

/// The in-progress, client-held representation of a session.
#[derive(Clone, Debug)]
pub struct SessionDraft {
    session_id: Option<SessionId>,
    owner_id: String,
    current_stage: usize,
    payloads: FxHashMap<StageId, StagePayload>,
    status: DraftStatus,
}

impl SessionDraft {
    /// A fresh draft at stage 0 with no payloads and no session id,
    /// stamped with the operator who owns the session.
    #[must_use]
    pub fn new(owner_id: &str) -> Self {
        Self {
            session_id: None,
            owner_id: owner_id.to_string(),
            current_stage: 0,
            payloads: FxHashMap::default(),
            status: DraftStatus::Draft,
        }
    }

    /// The server-assigned id, once the first create call succeeded.
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Identifier of the operator who owns the session. Set once at
    /// wizard start (or taken from the record on resume) and immutable.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Index of the stage the wizard is currently on.
    #[must_use]
    pub fn current_stage(&self) -> usize {
        self.current_stage
    }

    #[must_use]
    pub fn status(&self) -> DraftStatus {
        self.status
    }

    /// The accumulated payload for a stage, if one has been recorded.
    #[must_use]
    pub fn payload(&self, stage: StageId) -> Option<&StagePayload> {
        self.payloads.get(&stage)
    }

    /// Number of stages with a recorded payload.
    #[must_use]
    pub fn recorded_stages(&self) -> usize {
        self.payloads.len()
    }

    /// Bind the server-assigned session id.
    ///
    /// The id is bound at most once per draft lifetime; a second bind is
    /// ignored (the first assignment wins) and logged, since it would
    /// indicate a duplicate create call slipped past the serialization
    /// guard.
    pub(crate) fn bind_session_id(&mut self, id: SessionId) {
        if let Some(existing) = &self.session_id {
            tracing::warn!(
                existing = %existing,
                ignored = %id,
                "session id already bound; ignoring reassignment"
            );
            return;
        }
        self.session_id = Some(id);
    }

    /// Record a stage's payload, replacing only that stage's entry.
    ///
    /// Other stages' payloads are never touched, which is what makes
    /// accumulation monotonic.
    pub(crate) fn record_payload(&mut self, payload: StagePayload) {
        self.payloads.insert(payload.stage_id(), payload);
    }

    pub(crate) fn set_status(&mut self, status: DraftStatus) {
        self.status = status;
    }

    pub(crate) fn set_stage(&mut self, index: usize) {
        self.current_stage = index;
    }

    /// Seed a draft from previously persisted payloads (resume path).
    pub(crate) fn seed(
        owner_id: &str,
        session_id: SessionId,
        payloads: Vec<StagePayload>,
        current_stage: usize,
    ) -> Self {
        let mut map = FxHashMap::default();
        for payload in payloads {
            map.insert(payload.stage_id(), payload);
        }
        Self {
            session_id: Some(session_id),
            owner_id: owner_id.to_string(),
            current_stage,
            payloads: map,
            status: DraftStatus::Persisted,
        }
    }
}
