//! Shared helpers for integration tests.
//!
//! Tests construct wizards against a [`MemorySessionStore`] with a
//! [`MemorySink`] attached, so every test can assert both on the state
//! machine and on the emitted event sequence.
#![allow(dead_code)] // each test binary uses its own subset

pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use std::sync::Arc;
use std::time::Duration;

use playroom::auth::{Operator, StaticAuthContext};
use playroom::events::{EventBus, MemorySink};
use playroom::stage::StagePlan;
use playroom::store::MemorySessionStore;
use playroom::wizard::SessionWizard;

pub const OWNER: &str = "sw-1";

pub fn auth() -> StaticAuthContext {
    StaticAuthContext::new(Operator::social_worker(OWNER))
}

/// A fresh wizard over the standard plan, plus handles to its store and
/// event sink.
pub fn standard_wizard() -> (SessionWizard, MemorySessionStore, MemorySink) {
    wizard_with_plan(StagePlan::standard())
}

pub fn wizard_with_plan(plan: StagePlan) -> (SessionWizard, MemorySessionStore, MemorySink) {
    let store = MemorySessionStore::new();
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    let wizard = SessionWizard::with_bus(Arc::new(store.clone()), &auth(), plan, bus);
    (wizard, store, sink)
}

/// Wait until the sink has drained at least `count` events from the bus
/// listener task.
pub async fn drain_events(sink: &MemorySink, count: usize) {
    for _ in 0..200 {
        if sink.snapshot().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!(
        "expected at least {count} events, saw {:?}",
        sink.labels()
    );
}
