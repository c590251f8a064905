//! Tracing subscriber setup for binaries and tests embedding the crate.
//!
//! The crate itself only ever *emits* `tracing` spans and events; this
//! helper is for hosts that want sensible console output without wiring
//! a subscriber themselves. Filtering follows `RUST_LOG`, defaulting to
//! `info`.

use tracing_subscriber::EnvFilter;

/// Install a console subscriber for the whole process.
///
/// Safe to call more than once; later calls are no-ops (the first
/// subscriber installed wins).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
