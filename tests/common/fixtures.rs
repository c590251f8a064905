//! Shared payload and record builders for integration tests.
#![allow(dead_code)] // each test binary uses its own subset

use playroom::stage::{AvatarConfig, ChildDetails, ExpressionRecord, SessionNotes, StagePayload};
use playroom::store::{SessionRecord, SessionStatus};

/// The canonical child payload used across tests.
pub fn child_ana() -> StagePayload {
    StagePayload::Child(ChildDetails::new("Ana", "Cruz", 7))
}

pub fn avatar_default() -> StagePayload {
    StagePayload::Avatar(AvatarConfig::default())
}

pub fn expression_calm() -> StagePayload {
    StagePayload::Expression(ExpressionRecord::new("calm").with_intensity(2))
}

pub fn notes_done() -> StagePayload {
    StagePayload::Notes(
        SessionNotes::new("Settled quickly, engaged with the bubble game").with_tags(["progress"]),
    )
}

/// A partially persisted record: child and avatar stages saved, the
/// rest still open.
pub fn record_through_avatar(owner_id: &str) -> SessionRecord {
    let mut record = SessionRecord::empty(owner_id);
    record.absorb(child_ana());
    record.absorb(avatar_default());
    record
}

/// A finished record with every section present.
pub fn record_completed(owner_id: &str) -> SessionRecord {
    let mut record = record_through_avatar(owner_id);
    record.absorb(expression_calm());
    record.absorb(notes_done());
    record.status = SessionStatus::Completed;
    record
}
