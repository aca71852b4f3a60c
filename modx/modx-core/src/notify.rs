//! Notifier implementations.

use crate::traits::{Notifier, NotifyLevel};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Sends user messages to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => info!(target: "modx::notify", "{}", message),
            NotifyLevel::Warning => warn!(target: "modx::notify", "{}", message),
            NotifyLevel::Error => error!(target: "modx::notify", "{}", message),
        }
    }

    fn set_context(&self, key: &str, value: bool) {
        tracing::debug!(target: "modx::notify", "context {} = {}", key, value);
    }
}

/// Records every message and context flag, for inspection after the fact.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<(NotifyLevel, String)>>,
    context: Mutex<HashMap<String, bool>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded messages in emission order.
    pub fn messages(&self) -> Vec<(NotifyLevel, String)> {
        self.messages.lock().clone()
    }

    /// Recorded messages of one level.
    pub fn messages_at(&self, level: NotifyLevel) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Last value set for a context flag.
    pub fn context(&self, key: &str) -> Option<bool> {
        self.context.lock().get(key).copied()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        self.messages.lock().push((level, message.to_string()));
    }

    fn set_context(&self, key: &str, value: bool) {
        self.context.lock().insert(key.to_string(), value);
    }
}
