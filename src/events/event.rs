use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::SessionId;
use crate::stage::StageId;

/// A timestamped wizard lifecycle event.
///
/// Events are the rendering layer's feed of what the wizard is doing:
/// which stage is active, whether a save is in flight, how it resolved.
/// They are emitted best-effort; dropping them never affects the state
/// machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WizardEvent {
    #[serde(default = "Utc::now")]
    pub when: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: WizardEventKind,
}

/// The event payload, tagged by `type` in the serialized form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEventKind {
    /// The wizard is now positioned on `stage` (fresh start, advance,
    /// back, or resume).
    StageEntered { stage: StageId, index: usize },
    /// A persistence call left for the store; `create` distinguishes the
    /// one create from subsequent updates.
    PersistStarted { stage: StageId, create: bool },
    /// The in-flight persistence call succeeded.
    PersistSucceeded {
        stage: StageId,
        session_id: SessionId,
    },
    /// The in-flight persistence call failed; the draft is retained.
    PersistFailed { stage: StageId, message: String },
    /// The terminal stage persisted; the wizard is done.
    Completed { session_id: SessionId },
    /// A persistence result resolved after disposal or supersession and
    /// was discarded without touching the draft.
    ResultDiscarded { stage: StageId },
    /// The wizard was disposed before completing.
    Disposed,
}

impl WizardEvent {
    #[must_use]
    pub fn now(kind: WizardEventKind) -> Self {
        Self {
            when: Utc::now(),
            kind,
        }
    }

    pub fn stage_entered(stage: StageId, index: usize) -> Self {
        Self::now(WizardEventKind::StageEntered { stage, index })
    }

    pub fn persist_started(stage: StageId, create: bool) -> Self {
        Self::now(WizardEventKind::PersistStarted { stage, create })
    }

    pub fn persist_succeeded(stage: StageId, session_id: SessionId) -> Self {
        Self::now(WizardEventKind::PersistSucceeded { stage, session_id })
    }

    pub fn persist_failed(stage: StageId, message: impl Into<String>) -> Self {
        Self::now(WizardEventKind::PersistFailed {
            stage,
            message: message.into(),
        })
    }

    pub fn completed(session_id: SessionId) -> Self {
        Self::now(WizardEventKind::Completed { session_id })
    }

    pub fn result_discarded(stage: StageId) -> Self {
        Self::now(WizardEventKind::ResultDiscarded { stage })
    }

    pub fn disposed() -> Self {
        Self::now(WizardEventKind::Disposed)
    }

    /// Short label for the event kind, stable across releases; useful
    /// for filtering in sinks and tests.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match &self.kind {
            WizardEventKind::StageEntered { .. } => "stage_entered",
            WizardEventKind::PersistStarted { .. } => "persist_started",
            WizardEventKind::PersistSucceeded { .. } => "persist_succeeded",
            WizardEventKind::PersistFailed { .. } => "persist_failed",
            WizardEventKind::Completed { .. } => "completed",
            WizardEventKind::ResultDiscarded { .. } => "result_discarded",
            WizardEventKind::Disposed => "disposed",
        }
    }
}

impl fmt::Display for WizardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WizardEventKind::StageEntered { stage, index } => {
                write!(f, "[{stage}] entered stage (index {index})")
            }
            WizardEventKind::PersistStarted { stage, create } => {
                let op = if *create { "create" } else { "update" };
                write!(f, "[{stage}] persisting ({op})")
            }
            WizardEventKind::PersistSucceeded { stage, session_id } => {
                write!(f, "[{stage}] persisted as {session_id}")
            }
            WizardEventKind::PersistFailed { stage, message } => {
                write!(f, "[{stage}] persist failed: {message}")
            }
            WizardEventKind::Completed { session_id } => {
                write!(f, "session {session_id} completed")
            }
            WizardEventKind::ResultDiscarded { stage } => {
                write!(f, "[{stage}] stale persistence result discarded")
            }
            WizardEventKind::Disposed => write!(f, "wizard disposed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_form_is_type_tagged() {
        let event = WizardEvent::persist_started(StageId::Child, true);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "persist_started");
        assert_eq!(json["stage"], "child");
        assert_eq!(json["create"], true);
    }

    #[test]
    fn display_mentions_stage_and_outcome() {
        let event = WizardEvent::persist_failed(StageId::Avatar, "timeout");
        let line = event.to_string();
        assert!(line.contains("avatar"));
        assert!(line.contains("timeout"));
    }

    #[test]
    fn labels_cover_all_kinds() {
        assert_eq!(
            WizardEvent::completed(SessionId::from("s-1")).label(),
            "completed"
        );
        assert_eq!(WizardEvent::disposed().label(), "disposed");
    }
}
