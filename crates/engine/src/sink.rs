//! Logging collaborator for the `log` action.

use std::sync::{Arc, Mutex};

use tracing::info;

/// Receives messages emitted by `log` actions.
pub trait LogSink: Send + Sync {
    fn emit(&self, message: &str);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(&self, message: &str) {
        (**self).emit(message);
    }
}

/// Default sink: forwards to the `tracing` pipeline at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, message: &str) {
        info!(target: "trawl::log", "{message}");
    }
}

/// Captures messages in memory.
///
/// Share an `Arc<MemorySink>` with the engine and read the messages back
/// after a run.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("sink lock").clone()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, message: &str) {
        self.messages.lock().expect("sink lock").push(message.to_string());
    }
}
