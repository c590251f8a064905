/*!
Persistence models for the session store.

Design goals:
- Explicit serde-friendly shapes decoupled from the wizard's in-memory
  draft representation.
- Conversion logic localized here (draft → record, record → payloads) so
  the store implementations stay lean and declarative.
- Forward compatibility: absent sections deserialize as `None`, and
  records written by newer flows with extra sections still parse.

This module performs no I/O; it is pure data transformation glue.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::{SessionDraft, SessionId};
use crate::stage::{AvatarConfig, ChildDetails, ExpressionRecord, SessionNotes, StagePayload};

/// Store-side lifecycle status of a session row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }
}

/// The session shape the store expects: accumulated stage sections
/// merged into one document, stamped with the owning operator.
///
/// Each stage section is optional; a record written after the first
/// stage carries only `child`, and sections fill in as the wizard
/// advances. `id` is absent in create requests and present in fetched
/// records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SessionId>,
    pub owner_id: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<ChildDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AvatarConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<ExpressionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<SessionNotes>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// An empty record owned by `owner_id`.
    #[must_use]
    pub fn empty(owner_id: &str) -> Self {
        Self {
            id: None,
            owner_id: owner_id.to_string(),
            status: SessionStatus::InProgress,
            child: None,
            avatar: None,
            expression: None,
            notes: None,
            updated_at: Utc::now(),
        }
    }

    /// Merge a draft's accumulated payloads into the store's shape.
    ///
    /// This is the persistence-field mapper: every payload variant maps
    /// to exactly one section, matched exhaustively.
    #[must_use]
    pub fn from_draft(draft: &SessionDraft, status: SessionStatus) -> Self {
        let mut record = Self::empty(draft.owner_id());
        record.id = draft.session_id().cloned();
        record.status = status;
        for stage in crate::stage::StageId::ALL {
            if let Some(payload) = draft.payload(stage) {
                record.absorb(payload.clone());
            }
        }
        record
    }

    /// Write one stage payload into its section.
    pub fn absorb(&mut self, payload: StagePayload) {
        match payload {
            StagePayload::Child(child) => self.child = Some(child),
            StagePayload::Avatar(avatar) => self.avatar = Some(avatar),
            StagePayload::Expression(expression) => self.expression = Some(expression),
            StagePayload::Notes(notes) => self.notes = Some(notes),
        }
        self.updated_at = Utc::now();
    }

    /// Decompose the record's sections back into stage payloads, used to
    /// seed a resumed draft.
    #[must_use]
    pub fn stage_payloads(&self) -> Vec<StagePayload> {
        let mut payloads = Vec::new();
        if let Some(child) = &self.child {
            payloads.push(StagePayload::Child(child.clone()));
        }
        if let Some(avatar) = &self.avatar {
            payloads.push(StagePayload::Avatar(avatar.clone()));
        }
        if let Some(expression) = &self.expression {
            payloads.push(StagePayload::Expression(expression.clone()));
        }
        if let Some(notes) = &self.notes {
            payloads.push(StagePayload::Notes(notes.clone()));
        }
        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child() -> ChildDetails {
        ChildDetails::new("Ana", "Cruz", 7)
    }

    #[test]
    fn from_draft_merges_recorded_sections_only() {
        let mut draft = SessionDraft::new("sw-1");
        draft.record_payload(StagePayload::Child(child()));

        let record = SessionRecord::from_draft(&draft, SessionStatus::InProgress);
        assert_eq!(record.owner_id, "sw-1");
        assert_eq!(record.child.as_ref().map(|c| c.age), Some(7));
        assert!(record.avatar.is_none());
        assert!(record.notes.is_none());
        assert!(record.id.is_none());
    }

    #[test]
    fn record_payload_roundtrip_seeds_resume() {
        let mut record = SessionRecord::empty("sw-1");
        record.absorb(StagePayload::Child(child()));
        record.absorb(StagePayload::Avatar(AvatarConfig::default()));

        let payloads = record.stage_payloads();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0], StagePayload::Child(child()));
    }

    #[test]
    fn create_request_omits_absent_sections() {
        let record = SessionRecord::empty("sw-1");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("child").is_none());
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["owner_id"], "sw-1");
    }

    #[test]
    fn fetched_record_parses_without_optional_sections() {
        let json = serde_json::json!({
            "id": "s-42",
            "owner_id": "sw-1",
            "status": "in_progress",
            "child": {"first_name": "Ana", "last_name": "Cruz", "age": 7}
        });
        let record: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.id, Some(SessionId::from("s-42")));
        assert!(record.expression.is_none());
    }
}
