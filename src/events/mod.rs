//! Wizard event stream: fan-out bus, sinks, and the event shapes.
//!
//! The wizard reports its lifecycle (stage entered, persist started /
//! succeeded / failed, completion, discarded stale results) as
//! [`WizardEvent`]s pushed through an [`EventBus`] to pluggable sinks.
//! The rendering layer consumes these to drive loading spinners, inline
//! error banners, and progress indicators without polling the wizard.
//!
//! Emission is best-effort: a full or closed bus never affects a state
//! transition.

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::EventBus;
pub use event::{WizardEvent, WizardEventKind};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
