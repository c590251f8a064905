use std::io::{self, Result as IoResult, Stdout, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::event::WizardEvent;

/// Abstraction over an output target that consumes wizard events.
pub trait EventSink: Send + Sync {
    /// Handle one event. The sink decides how to format or forward it.
    fn handle(&mut self, event: &WizardEvent) -> IoResult<()>;
}

/// Stdout sink: one human-readable line per event. Development default.
pub struct StdOutSink {
    handle: Stdout,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self {
            handle: io::stdout(),
        }
    }
}

impl EventSink for StdOutSink {
    fn handle(&mut self, event: &WizardEvent) -> IoResult<()> {
        writeln!(self.handle, "{event}")?;
        self.handle.flush()
    }
}

/// In-memory sink for tests and snapshots.
///
/// Clones share the same buffer, so a test can keep one handle and give
/// the other to the bus.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<WizardEvent>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events, in emission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WizardEvent> {
        self.entries.lock().expect("memory sink poisoned").clone()
    }

    /// Labels of all captured events; convenient for sequence asserts.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.snapshot().iter().map(WizardEvent::label).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("memory sink poisoned").clear();
    }
}

impl EventSink for MemorySink {
    fn handle(&mut self, event: &WizardEvent) -> IoResult<()> {
        self.entries
            .lock()
            .expect("memory sink poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// Channel sink for streaming events to async consumers (a UI task, an
/// SSE endpoint). Forwarding never blocks.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WizardEvent>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<WizardEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &WizardEvent) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}
