//! The session wizard: a stage state machine with serialized
//! persistence.
//!
//! [`SessionWizard`] walks a [`StagePlan`] one stage at a time. Forward
//! transitions are gated on the stage's validation predicate and
//! checkpointed to the session store before the next stage becomes
//! active; the first successful save creates the session row, every
//! later save updates it. Failures retain the full draft and the exact
//! failed request for [`retry`](SessionWizard::retry). At most one
//! persistence call is in flight per wizard; anything else asked of the
//! machine in that window is rejected with [`WizardError::Busy`].
//!
//! # Persistence seam
//!
//! The convenience methods ([`advance`](SessionWizard::advance),
//! [`finish`](SessionWizard::finish), [`retry`](SessionWizard::retry))
//! validate, dispatch to the store, and apply the result in one awaited
//! call. Embedders that run saves in a detached task instead use the
//! explicit seam: [`begin_advance`](SessionWizard::begin_advance) /
//! [`begin_finish`](SessionWizard::begin_finish) /
//! [`begin_retry`](SessionWizard::begin_retry), then
//! [`dispatch`](SessionWizard::dispatch), then
//! [`resolve`](SessionWizard::resolve). Every begin call stamps the
//! returned [`PendingPersist`] with a generation ticket; `resolve`
//! silently discards results whose ticket is stale (the wizard was
//! disposed, or a newer attempt superseded the call), so an abandoned
//! save can never mutate a draft it no longer belongs to.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::draft::{DraftStatus, SessionDraft, SessionId};
use crate::events::{EventBus, EventSink, WizardEvent};
use crate::stage::{StageId, StagePayload, StagePlan, ValidationError};
use crate::store::{SessionRecord, SessionStatus, SessionStore, StoreError};

/// Where the machine currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WizardPhase {
    /// Positioned on a stage, accepting edits and transitions.
    AtStage { index: usize },
    /// Exactly one persistence call is outstanding for this stage.
    Persisting { index: usize },
    /// The last persistence call failed; draft and stage retained.
    Error { index: usize, message: String },
    /// The terminal stage persisted; no further transitions.
    Completed,
}

impl WizardPhase {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, WizardPhase::Completed)
    }

    #[must_use]
    pub fn is_persisting(&self) -> bool {
        matches!(self, WizardPhase::Persisting { .. })
    }

    /// The retained error message, when in the error phase.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            WizardPhase::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Errors surfaced by wizard transitions.
///
/// Store failures double-report: the wizard moves into the retained
/// [`WizardPhase::Error`] *and* the call returns `Err(Store(..))`, so
/// both event-driven and result-driven embedders see them.
#[derive(Debug, Error, Diagnostic)]
pub enum WizardError {
    #[error("a persistence call is already in flight")]
    #[diagnostic(
        code(playroom::wizard::busy),
        help("Wait for the outstanding save to resolve before the next transition.")
    )]
    Busy,

    #[error("the session is already completed")]
    #[diagnostic(code(playroom::wizard::completed))]
    AlreadyCompleted,

    #[error("the wizard has been disposed")]
    #[diagnostic(code(playroom::wizard::disposed))]
    Disposed,

    #[error("already at the first stage")]
    #[diagnostic(code(playroom::wizard::at_first_stage))]
    AtFirstStage,

    #[error("the terminal stage must be completed with finish, not advance")]
    #[diagnostic(code(playroom::wizard::terminal_stage))]
    TerminalStage,

    #[error("finish is only valid on the terminal stage")]
    #[diagnostic(code(playroom::wizard::not_terminal))]
    NotTerminalStage,

    #[error("no failed persistence call to retry")]
    #[diagnostic(code(playroom::wizard::nothing_to_retry))]
    NothingToRetry,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("session {id} was not found in the store")]
    #[diagnostic(code(playroom::wizard::unknown_session))]
    UnknownSession { id: SessionId },

    #[error("session belongs to operator {owner_id}")]
    #[diagnostic(
        code(playroom::wizard::owner_mismatch),
        help("Only the owning operator or an admin may resume a session.")
    )]
    OwnerMismatch { owner_id: String },
}

/// How `resolve` disposed of a persistence result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The result was applied to the draft and the phase advanced.
    Applied,
    /// The ticket was stale; the result was discarded untouched.
    Discarded,
}

#[derive(Clone, Debug)]
enum PersistOp {
    Create,
    Update(SessionId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttemptKind {
    Advance,
    Finish,
}

/// One persistence attempt: the exact record to send and how to send
/// it. Retained verbatim across failures so retry re-sends identically.
#[derive(Clone, Debug)]
struct Attempt {
    stage: StageId,
    index: usize,
    kind: AttemptKind,
    record: SessionRecord,
    op: PersistOp,
}

/// A begun-but-unresolved persistence call.
///
/// Produced by the `begin_*` methods and consumed by
/// [`SessionWizard::resolve`]. The embedded ticket ties it to the
/// wizard generation that issued it.
#[derive(Debug)]
pub struct PendingPersist {
    ticket: u64,
    attempt: Attempt,
}

impl PendingPersist {
    /// The record this attempt sends to the store.
    #[must_use]
    pub fn record(&self) -> &SessionRecord {
        &self.attempt.record
    }

    /// Whether this attempt creates the session row (first save).
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(self.attempt.op, PersistOp::Create)
    }

    /// The stage being persisted.
    #[must_use]
    pub fn stage(&self) -> StageId {
        self.attempt.stage
    }
}

/// Drives one session draft through its stage plan.
pub struct SessionWizard {
    store: Arc<dyn SessionStore>,
    plan: StagePlan,
    draft: SessionDraft,
    phase: WizardPhase,
    retained: Option<Attempt>,
    generation: u64,
    disposed: bool,
    events: EventBus,
    event_tx: flume::Sender<WizardEvent>,
    wizard_id: Uuid,
}

impl std::fmt::Debug for SessionWizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionWizard")
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("disposed", &self.disposed)
            .field("wizard_id", &self.wizard_id)
            .finish_non_exhaustive()
    }
}

impl SessionWizard {
    /// Start a fresh wizard for the current operator, with the default
    /// event bus (stdout sink).
    ///
    /// Must be called within a Tokio runtime; the event listener task is
    /// spawned immediately.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, auth: &dyn AuthContext, plan: StagePlan) -> Self {
        Self::with_bus(store, auth, plan, EventBus::default())
    }

    /// Start a fresh wizard with a custom event bus.
    #[must_use]
    pub fn with_bus(
        store: Arc<dyn SessionStore>,
        auth: &dyn AuthContext,
        plan: StagePlan,
        events: EventBus,
    ) -> Self {
        let operator = auth.current_operator();
        let draft = SessionDraft::new(&operator.id);
        let wizard = Self::assemble(store, plan, draft, WizardPhase::AtStage { index: 0 }, events);
        wizard.emit(WizardEvent::stage_entered(wizard.stage_of(0), 0));
        wizard
    }

    /// Reopen an existing session from the store.
    ///
    /// The record's payloads seed the draft; the wizard positions itself
    /// on the first stage whose payload is missing or invalid (or stays
    /// [`Completed`](WizardPhase::Completed) for finished records).
    /// Subsequent saves are updates keyed by the existing id, never
    /// re-creates. The current operator must own the record or be an
    /// admin.
    #[instrument(skip(store, auth, plan, events), err)]
    pub async fn resume_with_bus(
        store: Arc<dyn SessionStore>,
        auth: &dyn AuthContext,
        plan: StagePlan,
        id: SessionId,
        events: EventBus,
    ) -> Result<Self, WizardError> {
        let record = store
            .fetch(&id)
            .await?
            .ok_or_else(|| WizardError::UnknownSession { id: id.clone() })?;

        let operator = auth.current_operator();
        if !operator.may_access(&record.owner_id) {
            return Err(WizardError::OwnerMismatch {
                owner_id: record.owner_id,
            });
        }

        let payloads = record.stage_payloads();
        let draft = SessionDraft::seed(&record.owner_id, id, payloads, 0);

        let (index, phase) = if record.status == SessionStatus::Completed {
            (plan.len() - 1, WizardPhase::Completed)
        } else {
            let index = first_incomplete_stage(&plan, &draft);
            (index, WizardPhase::AtStage { index })
        };

        let mut wizard = Self::assemble(store, plan, draft, phase, events);
        wizard.draft.set_stage(index);
        if !wizard.phase.is_completed() {
            wizard.emit(WizardEvent::stage_entered(wizard.stage_of(index), index));
        }
        Ok(wizard)
    }

    /// [`resume_with_bus`](Self::resume_with_bus) with the default bus.
    pub async fn resume(
        store: Arc<dyn SessionStore>,
        auth: &dyn AuthContext,
        plan: StagePlan,
        id: SessionId,
    ) -> Result<Self, WizardError> {
        Self::resume_with_bus(store, auth, plan, id, EventBus::default()).await
    }

    fn assemble(
        store: Arc<dyn SessionStore>,
        plan: StagePlan,
        draft: SessionDraft,
        phase: WizardPhase,
        events: EventBus,
    ) -> Self {
        events.listen();
        let event_tx = events.sender();
        Self {
            store,
            plan,
            draft,
            phase,
            retained: None,
            generation: 0,
            disposed: false,
            events,
            event_tx,
            wizard_id: Uuid::new_v4(),
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    #[must_use]
    pub fn phase(&self) -> &WizardPhase {
        &self.phase
    }

    #[must_use]
    pub fn draft(&self) -> &SessionDraft {
        &self.draft
    }

    #[must_use]
    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// The stage the wizard is positioned on (the terminal stage once
    /// completed).
    #[must_use]
    pub fn current_stage(&self) -> StageId {
        match &self.phase {
            WizardPhase::AtStage { index }
            | WizardPhase::Persisting { index }
            | WizardPhase::Error { index, .. } => self.stage_of(*index),
            WizardPhase::Completed => self.plan.terminal(),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.draft.session_id()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Register an additional event sink (e.g. a per-client stream).
    pub fn attach_sink<T: EventSink + 'static>(&self, sink: T) {
        self.events.add_sink(sink);
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Validate, persist, and move to the next stage.
    #[instrument(skip(self, payload), fields(wizard = %self.wizard_id), err)]
    pub async fn advance(&mut self, payload: StagePayload) -> Result<(), WizardError> {
        let pending = self.begin_advance(payload)?;
        let outcome = self.dispatch(&pending).await;
        self.resolve(pending, outcome).map(|_| ())
    }

    /// Validate, persist, and complete the wizard. Terminal stage only.
    #[instrument(skip(self, payload), fields(wizard = %self.wizard_id), err)]
    pub async fn finish(&mut self, payload: StagePayload) -> Result<(), WizardError> {
        let pending = self.begin_finish(payload)?;
        let outcome = self.dispatch(&pending).await;
        self.resolve(pending, outcome).map(|_| ())
    }

    /// Re-issue the persistence call that previously failed, with the
    /// identical record.
    #[instrument(skip(self), fields(wizard = %self.wizard_id), err)]
    pub async fn retry(&mut self) -> Result<(), WizardError> {
        let pending = self.begin_retry()?;
        let outcome = self.dispatch(&pending).await;
        self.resolve(pending, outcome).map(|_| ())
    }

    /// Step back one stage. Purely local: never calls the store and
    /// never clears any recorded payload.
    #[instrument(skip(self), fields(wizard = %self.wizard_id), err)]
    pub fn back(&mut self) -> Result<(), WizardError> {
        let index = self.editable_index()?;
        if index == 0 {
            return Err(WizardError::AtFirstStage);
        }
        let index = index - 1;
        self.retained = None;
        self.draft.set_stage(index);
        self.draft.set_status(if self.draft.session_id().is_some() {
            DraftStatus::Persisted
        } else {
            DraftStatus::Draft
        });
        self.phase = WizardPhase::AtStage { index };
        self.emit(WizardEvent::stage_entered(self.stage_of(index), index));
        Ok(())
    }

    /// Tear the wizard down. Any still-unresolved persistence result is
    /// invalidated and will be discarded by [`resolve`](Self::resolve);
    /// the draft remains readable for inspection.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.generation += 1;
        self.retained = None;
        self.emit(WizardEvent::disposed());
    }

    // ------------------------------------------------------------------
    // Explicit persistence seam
    // ------------------------------------------------------------------

    /// Validate `payload` against the active stage and stage the
    /// create/update call for it, entering the persisting phase.
    pub fn begin_advance(&mut self, payload: StagePayload) -> Result<PendingPersist, WizardError> {
        let index = self.editable_index()?;
        if self.plan.is_terminal(index) {
            return Err(WizardError::TerminalStage);
        }
        self.begin_save(index, payload, AttemptKind::Advance)
    }

    /// Like [`begin_advance`](Self::begin_advance), for the terminal
    /// stage; resolution completes the wizard instead of advancing.
    pub fn begin_finish(&mut self, payload: StagePayload) -> Result<PendingPersist, WizardError> {
        let index = self.editable_index()?;
        if !self.plan.is_terminal(index) {
            return Err(WizardError::NotTerminalStage);
        }
        self.begin_save(index, payload, AttemptKind::Finish)
    }

    /// Stage the retained failed attempt again, unchanged.
    pub fn begin_retry(&mut self) -> Result<PendingPersist, WizardError> {
        if self.disposed {
            return Err(WizardError::Disposed);
        }
        match &self.phase {
            WizardPhase::Error { .. } => {}
            WizardPhase::Persisting { .. } => return Err(WizardError::Busy),
            WizardPhase::Completed => return Err(WizardError::AlreadyCompleted),
            WizardPhase::AtStage { .. } => return Err(WizardError::NothingToRetry),
        }
        let attempt = self.retained.clone().ok_or(WizardError::NothingToRetry)?;
        Ok(self.stage_attempt(attempt))
    }

    /// Execute the store call for a pending attempt. Does not touch the
    /// machine; feed the outcome to [`resolve`](Self::resolve).
    pub async fn dispatch(
        &self,
        pending: &PendingPersist,
    ) -> Result<Option<SessionId>, StoreError> {
        match &pending.attempt.op {
            PersistOp::Create => self.store.create(&pending.attempt.record).await.map(Some),
            PersistOp::Update(id) => self
                .store
                .update(id, &pending.attempt.record)
                .await
                .map(|()| None),
        }
    }

    /// Apply a persistence outcome to the machine.
    ///
    /// Stale tickets (the wizard was disposed, or a newer attempt has
    /// been begun since) are discarded without touching the draft; a
    /// [`ResultDiscarded`](crate::events::WizardEventKind::ResultDiscarded)
    /// event is emitted instead.
    pub fn resolve(
        &mut self,
        pending: PendingPersist,
        outcome: Result<Option<SessionId>, StoreError>,
    ) -> Result<Resolution, WizardError> {
        if self.disposed || pending.ticket != self.generation {
            tracing::debug!(
                wizard = %self.wizard_id,
                stage = %pending.attempt.stage,
                "discarding stale persistence result"
            );
            self.emit(WizardEvent::result_discarded(pending.attempt.stage));
            return Ok(Resolution::Discarded);
        }

        let stage = pending.attempt.stage;
        let index = pending.attempt.index;
        let kind = pending.attempt.kind;

        match outcome {
            Err(error) => {
                let message = error.to_string();
                self.phase = WizardPhase::Error {
                    index,
                    message: message.clone(),
                };
                self.draft.set_status(DraftStatus::Error);
                self.retained = Some(pending.attempt);
                self.generation += 1;
                self.emit(WizardEvent::persist_failed(stage, message));
                Err(WizardError::Store(error))
            }
            Ok(assigned_id) => {
                if let Some(id) = assigned_id {
                    self.draft.bind_session_id(id);
                }
                let session_id = self
                    .draft
                    .session_id()
                    .cloned()
                    .expect("session id bound after successful persist");
                self.draft.set_status(DraftStatus::Persisted);
                self.retained = None;
                self.generation += 1;
                self.emit(WizardEvent::persist_succeeded(stage, session_id.clone()));
                match kind {
                    AttemptKind::Advance => {
                        let next = index + 1;
                        self.draft.set_stage(next);
                        self.phase = WizardPhase::AtStage { index: next };
                        self.emit(WizardEvent::stage_entered(self.stage_of(next), next));
                    }
                    AttemptKind::Finish => {
                        self.phase = WizardPhase::Completed;
                        self.emit(WizardEvent::completed(session_id));
                    }
                }
                Ok(Resolution::Applied)
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// The stage index transitions may act on, rejecting phases that
    /// accept no edits.
    fn editable_index(&self) -> Result<usize, WizardError> {
        if self.disposed {
            return Err(WizardError::Disposed);
        }
        match &self.phase {
            WizardPhase::AtStage { index } | WizardPhase::Error { index, .. } => Ok(*index),
            WizardPhase::Persisting { .. } => Err(WizardError::Busy),
            WizardPhase::Completed => Err(WizardError::AlreadyCompleted),
        }
    }

    fn begin_save(
        &mut self,
        index: usize,
        payload: StagePayload,
        kind: AttemptKind,
    ) -> Result<PendingPersist, WizardError> {
        let stage = self.stage_of(index);
        if payload.stage_id() != stage {
            return Err(WizardError::Validation(ValidationError::StageMismatch {
                given: payload.stage_id(),
                active: stage,
            }));
        }
        payload.validate()?;

        self.draft.record_payload(payload);
        let status = match kind {
            AttemptKind::Advance => SessionStatus::InProgress,
            AttemptKind::Finish => SessionStatus::Completed,
        };
        let record = SessionRecord::from_draft(&self.draft, status);
        let op = match self.draft.session_id() {
            None => PersistOp::Create,
            Some(id) => PersistOp::Update(id.clone()),
        };
        Ok(self.stage_attempt(Attempt {
            stage,
            index,
            kind,
            record,
            op,
        }))
    }

    /// Enter the persisting phase for an attempt and stamp its ticket.
    /// A fresh attempt supersedes any retained failed one.
    fn stage_attempt(&mut self, attempt: Attempt) -> PendingPersist {
        self.retained = None;
        self.generation += 1;
        self.phase = WizardPhase::Persisting {
            index: attempt.index,
        };
        self.draft.set_status(DraftStatus::Persisting);
        self.emit(WizardEvent::persist_started(
            attempt.stage,
            matches!(attempt.op, PersistOp::Create),
        ));
        PendingPersist {
            ticket: self.generation,
            attempt,
        }
    }

    fn stage_of(&self, index: usize) -> StageId {
        self.plan
            .stage_at(index)
            .expect("stage index within plan bounds")
    }

    /// Best-effort event emission; a departed listener never affects a
    /// transition.
    fn emit(&self, event: WizardEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!(wizard = %self.wizard_id, "event bus closed; dropping event");
        }
    }
}

/// First stage in the plan whose payload is missing or no longer valid.
/// Falls back to the terminal stage when everything validates.
fn first_incomplete_stage(plan: &StagePlan, draft: &SessionDraft) -> usize {
    for (index, stage) in plan.iter().enumerate() {
        match draft.payload(stage) {
            Some(payload) if payload.validate().is_ok() => {}
            _ => return index,
        }
    }
    plan.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Operator, StaticAuthContext};
    use crate::stage::ChildDetails;
    use crate::store::MemorySessionStore;

    fn wizard() -> (SessionWizard, MemorySessionStore) {
        let store = MemorySessionStore::new();
        let auth = StaticAuthContext::new(Operator::social_worker("sw-1"));
        let wizard = SessionWizard::new(
            Arc::new(store.clone()),
            &auth,
            StagePlan::standard(),
        );
        (wizard, store)
    }

    #[tokio::test]
    async fn begin_stamps_fresh_tickets_and_enters_persisting() {
        let (mut wizard, _store) = wizard();
        let pending = wizard
            .begin_advance(StagePayload::Child(ChildDetails::new("Ana", "Cruz", 7)))
            .unwrap();
        assert!(pending.is_create());
        assert!(wizard.phase().is_persisting());
        assert_eq!(wizard.draft().status(), DraftStatus::Persisting);
    }

    #[tokio::test]
    async fn second_begin_while_persisting_is_busy() {
        let (mut wizard, _store) = wizard();
        let _pending = wizard
            .begin_advance(StagePayload::Child(ChildDetails::new("Ana", "Cruz", 7)))
            .unwrap();
        let err = wizard
            .begin_advance(StagePayload::Child(ChildDetails::new("Bo", "Li", 6)))
            .unwrap_err();
        assert!(matches!(err, WizardError::Busy));
    }

    #[tokio::test]
    async fn validation_failure_leaves_machine_untouched() {
        let (mut wizard, store) = wizard();
        let err = wizard
            .advance(StagePayload::Child(ChildDetails::new("", "Cruz", 7)))
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::Validation(_)));
        assert_eq!(wizard.draft().current_stage(), 0);
        assert_eq!(wizard.draft().status(), DraftStatus::Draft);
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn wrong_stage_payload_is_rejected() {
        let (mut wizard, _store) = wizard();
        let err = wizard
            .advance(StagePayload::Avatar(crate::stage::AvatarConfig::default()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WizardError::Validation(ValidationError::StageMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn resolve_discards_after_dispose() {
        let (mut wizard, _store) = wizard();
        let pending = wizard
            .begin_advance(StagePayload::Child(ChildDetails::new("Ana", "Cruz", 7)))
            .unwrap();
        wizard.dispose();

        let resolution = wizard
            .resolve(pending, Ok(Some(SessionId::from("s-ghost"))))
            .unwrap();
        assert_eq!(resolution, Resolution::Discarded);
        assert_eq!(wizard.draft().session_id(), None);
        assert_eq!(wizard.draft().current_stage(), 0);
    }
}
