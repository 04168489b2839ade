//! The reading snapshot and the state shared across the gateway.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One complete snapshot of all polled fields.
///
/// A reading is published wholesale each poll cycle and never merged
/// field-by-field with a previous one. Integer fields carry the raw register
/// word value, unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: u16,
    pub humidity: u16,
    pub pressure: u16,
    pub latitude: f32,
    pub longitude: f32,
    /// Operator key token reported by the controller, or empty.
    pub key_operation: String,
}

/// The single mutable cell shared by the poller and the status server.
///
/// Holds the latest reading (`None` before the first successful poll) and
/// the operator display message. Clones are cheap handles onto the same
/// state. Every read or replace takes the lock exactly once, so a reader
/// never observes a half-written snapshot.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<RwLock<StateInner>>,
}

#[derive(Debug)]
struct StateInner {
    reading: Option<Reading>,
    display: String,
}

impl SharedState {
    /// Create the state with no reading and the configured greeting.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StateInner {
                reading: None,
                display: greeting.into(),
            })),
        }
    }

    /// The latest reading, or `None` before the first successful poll.
    pub fn reading(&self) -> Option<Reading> {
        self.inner.read().reading.clone()
    }

    /// Replace the current reading with a freshly decoded snapshot.
    pub fn publish(&self, reading: Reading) {
        self.inner.write().reading = Some(reading);
    }

    /// The current display message.
    pub fn display(&self) -> String {
        self.inner.read().display.clone()
    }

    /// Overwrite the display message.
    pub fn set_display(&self, message: impl Into<String>) {
        self.inner.write().display = message.into();
    }
}
