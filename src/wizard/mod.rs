//! Wizard orchestration: the stage state machine and its persistence
//! seam.
//!
//! [`SessionWizard`] is the crate's orchestrator. It owns one
//! [`SessionDraft`](crate::draft::SessionDraft), walks it through a
//! [`StagePlan`](crate::stage::StagePlan), and checkpoints progress to a
//! [`SessionStore`](crate::store::SessionStore) after every gated
//! forward transition.
//!
//! See [`machine`] for the transition rules and the
//! begin/dispatch/resolve seam used by embedders that run saves in
//! detached tasks.

pub mod machine;

pub use machine::{PendingPersist, Resolution, SessionWizard, WizardError, WizardPhase};
