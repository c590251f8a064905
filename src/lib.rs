//! # Playroom: Therapy Session Intake Engine
//!
//! Playroom drives a therapeutic play session from child intake through
//! completion: an ordered sequence of stages (child details, avatar,
//! emotional expression, session notes), each gated by its own
//! validation predicate and checkpointed to a remote session store
//! before the next stage opens.
//!
//! ## Core Concepts
//!
//! - **Stages**: the fixed, strongly-typed steps of an intake flow
//!   ([`stage::StageId`], [`stage::StagePayload`], [`stage::StagePlan`])
//! - **Draft**: the in-memory session being built, accumulating stage
//!   payloads monotonically ([`draft::SessionDraft`])
//! - **Store**: the persistence seam, in-memory for tests and REST for
//!   production ([`store::SessionStore`])
//! - **Wizard**: the state machine tying it together
//!   ([`wizard::SessionWizard`])
//! - **Events**: lifecycle notifications for the rendering layer
//!   ([`events::WizardEvent`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use playroom::auth::{Operator, StaticAuthContext};
//! use playroom::stage::{AvatarConfig, ChildDetails, StagePayload, StagePlan};
//! use playroom::store::MemorySessionStore;
//! use playroom::wizard::SessionWizard;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemorySessionStore::new());
//! let auth = StaticAuthContext::new(Operator::social_worker("sw-17"));
//!
//! let mut wizard = SessionWizard::new(store, &auth, StagePlan::standard());
//!
//! // The first successful save creates the session row and binds its id.
//! wizard
//!     .advance(StagePayload::Child(ChildDetails::new("Ana", "Cruz", 7)))
//!     .await?;
//! assert!(wizard.session_id().is_some());
//!
//! // Later saves update the same row; back-navigation is local and
//! // lossless.
//! wizard
//!     .advance(StagePayload::Avatar(AvatarConfig::default()))
//!     .await?;
//! wizard.back()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure Handling
//!
//! A failed save moves the wizard into a retained error phase: the
//! draft, the active stage, and the exact failed request are all kept.
//! [`wizard::SessionWizard::retry`] re-sends the identical record;
//! nothing the operator entered is ever lost to a network problem.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use playroom::auth::{Operator, StaticAuthContext};
//! # use playroom::stage::{ChildDetails, StagePayload, StagePlan};
//! # use playroom::store::MemorySessionStore;
//! # use playroom::wizard::SessionWizard;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let store = Arc::new(MemorySessionStore::new());
//! # let auth = StaticAuthContext::new(Operator::social_worker("sw-17"));
//! # let mut wizard = SessionWizard::new(store, &auth, StagePlan::standard());
//! let payload = StagePayload::Child(ChildDetails::new("Ana", "Cruz", 7));
//! if wizard.advance(payload).await.is_err() {
//!     // Draft intact; surface wizard.phase().error_message() and offer:
//!     wizard.retry().await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`stage`] - Stage identity, payload shapes, validation, stage plans
//! - [`draft`] - The in-memory session draft
//! - [`auth`] - Operator identity and the auth context seam
//! - [`store`] - Session store trait, record shapes, memory/HTTP backends
//! - [`wizard`] - The stage state machine
//! - [`events`] - Lifecycle event stream and sinks
//! - [`telemetry`] - Tracing subscriber setup for hosts

pub mod auth;
pub mod draft;
pub mod events;
pub mod stage;
pub mod store;
pub mod telemetry;
pub mod wizard;
