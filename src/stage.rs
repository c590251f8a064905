//! Stage identity, payload shapes, and the ordered stage plan.
//!
//! This module defines what a session intake flow *is*: the fixed set of
//! known stages ([`StageId`]), the strongly-typed payload each stage
//! produces ([`StagePayload`]), the per-stage validation predicates, and
//! the ordered, duplicate-free [`StagePlan`] the wizard walks.
//!
//! Stage identity is deliberately decoupled from list position: the plan
//! owns the ordering, and all payload dispatch (validation, persistence
//! field mapping) pattern-matches exhaustively on [`StageId`] rather than
//! doing index arithmetic.
//!
//! # Examples
//!
//! ```rust
//! use playroom::stage::{ChildDetails, StageId, StagePayload, StagePlan};
//!
//! let plan = StagePlan::standard();
//! assert_eq!(plan.len(), 4);
//! assert_eq!(plan.stage_at(0), Some(StageId::Child));
//! assert_eq!(plan.terminal(), StageId::Notes);
//!
//! let payload = StagePayload::Child(ChildDetails::new("Ana", "Cruz", 7));
//! assert!(payload.validate().is_ok());
//! assert_eq!(payload.stage_id(), StageId::Child);
//! ```

use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies one stage of the session intake flow.
///
/// `StageId` is the stable identity of a stage, independent of where the
/// stage sits in a [`StagePlan`]. It round-trips through the persisted
/// string form via [`as_str`](Self::as_str) and [`parse`](Self::parse).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Child identity intake: names, age, optional background details.
    Child,
    /// Avatar customization chosen together with the child.
    Avatar,
    /// Emotional-expression record captured during play.
    Expression,
    /// Operator session notes and tags; the terminal stage of the
    /// standard plan.
    Notes,
}

impl StageId {
    /// All known stages, in the standard flow order.
    pub const ALL: [StageId; 4] = [
        StageId::Child,
        StageId::Avatar,
        StageId::Expression,
        StageId::Notes,
    ];

    /// The persisted string form of this stage id.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StageId::Child => "child",
            StageId::Avatar => "avatar",
            StageId::Expression => "expression",
            StageId::Notes => "notes",
        }
    }

    /// Parse a persisted string form back into a stage id.
    ///
    /// Returns `None` for unknown encodings; callers decide whether that
    /// is an error or forward-compatible data to skip.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "child" => Some(StageId::Child),
            "avatar" => Some(StageId::Avatar),
            "expression" => Some(StageId::Expression),
            "notes" => Some(StageId::Notes),
            _ => None,
        }
    }

    /// Human-readable label for the stage, as shown by the embedding UI.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StageId::Child => "Child Details",
            StageId::Avatar => "Avatar",
            StageId::Expression => "Emotional Expression",
            StageId::Notes => "Session Notes",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Child identity details collected on the first stage.
///
/// `gender` and `place_of_birth` are optional background fields; the
/// stage is complete with names and a positive age alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildDetails {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
}

impl ChildDetails {
    /// Create child details with the required fields only.
    #[must_use]
    pub fn new(first_name: &str, last_name: &str, age: u32) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age,
            gender: None,
            place_of_birth: None,
        }
    }

    #[must_use]
    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    #[must_use]
    pub fn with_place_of_birth(mut self, place: &str) -> Self {
        self.place_of_birth = Some(place.to_string());
        self
    }
}

/// Avatar configuration chosen on the second stage.
///
/// Each field names a variant from the platform's asset catalogue; the
/// wizard only requires that the variant names are non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarConfig {
    pub head: String,
    pub hair: String,
    pub outfit: String,
}

impl AvatarConfig {
    pub const DEFAULT_VARIANT: &'static str = "default";

    #[must_use]
    pub fn new(head: &str, hair: &str, outfit: &str) -> Self {
        Self {
            head: head.to_string(),
            hair: hair.to_string(),
            outfit: outfit.to_string(),
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_VARIANT,
            Self::DEFAULT_VARIANT,
            Self::DEFAULT_VARIANT,
        )
    }
}

/// Emotional-expression record captured on the third stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionRecord {
    /// Identifier of the feeling the child expressed (e.g. `"calm"`,
    /// `"angry"`); drawn from the stage view's catalogue.
    pub feeling: String,
    /// Optional intensity on the platform's 1..=5 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u8>,
    /// Optional free-text observation from the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ExpressionRecord {
    pub const MIN_INTENSITY: u8 = 1;
    pub const MAX_INTENSITY: u8 = 5;

    #[must_use]
    pub fn new(feeling: &str) -> Self {
        Self {
            feeling: feeling.to_string(),
            intensity: None,
            note: None,
        }
    }

    #[must_use]
    pub fn with_intensity(mut self, intensity: u8) -> Self {
        self.intensity = Some(intensity);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }
}

/// Operator notes and tag list collected on the terminal stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionNotes {
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SessionNotes {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// The payload produced by one stage, as a tagged union over the known
/// stage shapes.
///
/// Keeping payloads in one enum lets the wizard's merge and persistence
/// logic pattern-match exhaustively: adding a stage is a compile error
/// everywhere a stage-specific decision is made.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StagePayload {
    Child(ChildDetails),
    Avatar(AvatarConfig),
    Expression(ExpressionRecord),
    Notes(SessionNotes),
}

impl StagePayload {
    /// The stage this payload belongs to.
    #[must_use]
    pub fn stage_id(&self) -> StageId {
        match self {
            StagePayload::Child(_) => StageId::Child,
            StagePayload::Avatar(_) => StageId::Avatar,
            StagePayload::Expression(_) => StageId::Expression,
            StagePayload::Notes(_) => StageId::Notes,
        }
    }

    /// Run this stage's validation predicate.
    ///
    /// The wizard refuses to persist a payload until this accepts it;
    /// field-level rules live here, next to the shapes, not in the
    /// state machine.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StagePayload::Child(child) => {
                require_text("first_name", &child.first_name)?;
                require_text("last_name", &child.last_name)?;
                if child.age == 0 {
                    return Err(ValidationError::NotPositive { field: "age" });
                }
                Ok(())
            }
            StagePayload::Avatar(avatar) => {
                require_text("head", &avatar.head)?;
                require_text("hair", &avatar.hair)?;
                require_text("outfit", &avatar.outfit)
            }
            StagePayload::Expression(expr) => {
                require_text("feeling", &expr.feeling)?;
                if let Some(intensity) = expr.intensity
                    && !(ExpressionRecord::MIN_INTENSITY..=ExpressionRecord::MAX_INTENSITY)
                        .contains(&intensity)
                {
                    return Err(ValidationError::IntensityOutOfRange { value: intensity });
                }
                Ok(())
            }
            StagePayload::Notes(notes) => {
                require_text("text", &notes.text)?;
                if notes.tags.iter().any(|t| t.trim().is_empty()) {
                    return Err(ValidationError::EmptyTag);
                }
                Ok(())
            }
        }
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField { field })
    } else {
        Ok(())
    }
}

/// Local validation failures. These never reach the session store; the
/// wizard refuses the transition and leaves all state unchanged.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    #[diagnostic(
        code(playroom::stage::missing_field),
        help("The stage view must supply a non-empty value before proceeding.")
    )]
    MissingField { field: &'static str },

    #[error("{field} must be a positive integer")]
    #[diagnostic(code(playroom::stage::not_positive))]
    NotPositive { field: &'static str },

    #[error("intensity {value} is out of range (1..=5)")]
    #[diagnostic(code(playroom::stage::intensity_out_of_range))]
    IntensityOutOfRange { value: u8 },

    #[error("tags must not contain empty entries")]
    #[diagnostic(code(playroom::stage::empty_tag))]
    EmptyTag,

    /// The payload's variant does not match the stage the wizard is on.
    #[error("payload is for stage '{given}', but the active stage is '{active}'")]
    #[diagnostic(
        code(playroom::stage::stage_mismatch),
        help("Feed the active stage's payload shape into advance/finish.")
    )]
    StageMismatch { given: StageId, active: StageId },
}

/// The explicit, ordered list of stages a wizard walks.
///
/// A plan is non-empty and duplicate-free; its last entry is the
/// terminal stage. The standard platform flow is
/// child → avatar → expression → notes, but shorter plans are valid
/// (used in tests and by flows that skip optional stages).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagePlan {
    stages: Vec<StageId>,
}

impl StagePlan {
    /// The standard four-stage intake flow.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            stages: StageId::ALL.to_vec(),
        }
    }

    /// Build a custom plan from an ordered stage list.
    pub fn new(stages: Vec<StageId>) -> Result<Self, PlanError> {
        if stages.is_empty() {
            return Err(PlanError::Empty);
        }
        for (i, stage) in stages.iter().enumerate() {
            if stages[..i].contains(stage) {
                return Err(PlanError::Duplicate { stage: *stage });
            }
        }
        Ok(Self { stages })
    }

    /// Number of stages in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The stage at a given index, if the index is in range.
    #[must_use]
    pub fn stage_at(&self, index: usize) -> Option<StageId> {
        self.stages.get(index).copied()
    }

    /// The position of a stage within this plan.
    #[must_use]
    pub fn index_of(&self, stage: StageId) -> Option<usize> {
        self.stages.iter().position(|s| *s == stage)
    }

    /// The terminal stage (last entry of the plan).
    #[must_use]
    pub fn terminal(&self) -> StageId {
        // Plans are non-empty by construction.
        self.stages[self.stages.len() - 1]
    }

    /// Whether the given index is the terminal position.
    #[must_use]
    pub fn is_terminal(&self, index: usize) -> bool {
        index + 1 == self.stages.len()
    }

    /// Iterate the stages in order.
    pub fn iter(&self) -> impl Iterator<Item = StageId> + '_ {
        self.stages.iter().copied()
    }
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::standard()
    }
}

/// Errors constructing a [`StagePlan`].
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum PlanError {
    #[error("a stage plan must contain at least one stage")]
    #[diagnostic(code(playroom::stage::empty_plan))]
    Empty,

    #[error("stage '{stage}' appears more than once in the plan")]
    #[diagnostic(code(playroom::stage::duplicate_stage))]
    Duplicate { stage: StageId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_id_string_roundtrip() {
        for stage in StageId::ALL {
            assert_eq!(StageId::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(StageId::parse("unknown"), None);
    }

    #[test]
    fn stage_labels_are_nonempty() {
        for stage in StageId::ALL {
            assert!(!stage.label().is_empty());
        }
    }

    #[test]
    fn child_requires_names_and_positive_age() {
        let valid = StagePayload::Child(ChildDetails::new("Ana", "Cruz", 7));
        assert!(valid.validate().is_ok());

        let blank_name = StagePayload::Child(ChildDetails::new("  ", "Cruz", 7));
        assert_eq!(
            blank_name.validate(),
            Err(ValidationError::MissingField {
                field: "first_name"
            })
        );

        let zero_age = StagePayload::Child(ChildDetails::new("Ana", "Cruz", 0));
        assert_eq!(
            zero_age.validate(),
            Err(ValidationError::NotPositive { field: "age" })
        );
    }

    #[test]
    fn child_optional_fields_do_not_gate_validation() {
        let payload = StagePayload::Child(
            ChildDetails::new("Ana", "Cruz", 7)
                .with_gender("female")
                .with_place_of_birth("Lisbon"),
        );
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn avatar_default_variants_are_valid() {
        let payload = StagePayload::Avatar(AvatarConfig::default());
        assert!(payload.validate().is_ok());

        let missing = StagePayload::Avatar(AvatarConfig::new("round", "", "casual"));
        assert_eq!(
            missing.validate(),
            Err(ValidationError::MissingField { field: "hair" })
        );
    }

    #[test]
    fn expression_intensity_bounds() {
        let ok = StagePayload::Expression(ExpressionRecord::new("calm").with_intensity(3));
        assert!(ok.validate().is_ok());

        let low = StagePayload::Expression(ExpressionRecord::new("calm").with_intensity(0));
        assert_eq!(
            low.validate(),
            Err(ValidationError::IntensityOutOfRange { value: 0 })
        );

        let high = StagePayload::Expression(ExpressionRecord::new("calm").with_intensity(6));
        assert_eq!(
            high.validate(),
            Err(ValidationError::IntensityOutOfRange { value: 6 })
        );

        let unset = StagePayload::Expression(ExpressionRecord::new("calm"));
        assert!(unset.validate().is_ok());
    }

    #[test]
    fn notes_require_text_and_clean_tags() {
        let ok = StagePayload::Notes(SessionNotes::new("Settled quickly").with_tags(["progress"]));
        assert!(ok.validate().is_ok());

        let empty_text = StagePayload::Notes(SessionNotes::new("   "));
        assert_eq!(
            empty_text.validate(),
            Err(ValidationError::MissingField { field: "text" })
        );

        let blank_tag =
            StagePayload::Notes(SessionNotes::new("ok").with_tags(["progress", "  "]));
        assert_eq!(blank_tag.validate(), Err(ValidationError::EmptyTag));
    }

    #[test]
    fn payload_stage_ids_match_variants() {
        assert_eq!(
            StagePayload::Avatar(AvatarConfig::default()).stage_id(),
            StageId::Avatar
        );
        assert_eq!(
            StagePayload::Notes(SessionNotes::new("x")).stage_id(),
            StageId::Notes
        );
    }

    #[test]
    fn standard_plan_order() {
        let plan = StagePlan::standard();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.stage_at(0), Some(StageId::Child));
        assert_eq!(plan.stage_at(3), Some(StageId::Notes));
        assert_eq!(plan.stage_at(4), None);
        assert!(plan.is_terminal(3));
        assert!(!plan.is_terminal(0));
        assert_eq!(plan.index_of(StageId::Expression), Some(2));
    }

    #[test]
    fn custom_plan_rejects_empty_and_duplicates() {
        assert_eq!(StagePlan::new(vec![]), Err(PlanError::Empty));
        assert_eq!(
            StagePlan::new(vec![StageId::Child, StageId::Child]),
            Err(PlanError::Duplicate {
                stage: StageId::Child
            })
        );

        let short = StagePlan::new(vec![StageId::Child, StageId::Notes]).unwrap();
        assert_eq!(short.terminal(), StageId::Notes);
        assert!(short.is_terminal(1));
    }

    #[test]
    fn payload_serialization_is_tagged_by_stage() {
        let payload = StagePayload::Avatar(AvatarConfig::default());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["stage"], "avatar");
        let back: StagePayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }
}
