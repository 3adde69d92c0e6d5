#![forbid(unsafe_code)]

//! Events delivered to native-style listeners.

use std::cell::Cell;

use crate::NodeId;

/// An event dispatched at a node.
///
/// Dispatch calls listeners on the target first, then bubbles to each
/// ancestor unless a handler calls [`stop_propagation`](Event::stop_propagation).
#[derive(Debug, Clone)]
pub struct Event {
    name: String,
    value: Option<String>,
    target: Cell<Option<NodeId>>,
    current: Cell<Option<NodeId>>,
    stopped: Cell<bool>,
}

impl Event {
    /// An event named `name` (`"click"`, `"input"`, ...).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            target: Cell::new(None),
            current: Cell::new(None),
            stopped: Cell::new(false),
        }
    }

    /// Attach a form value, as an `input` or `change` event carries.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// The node the event was dispatched at.
    #[must_use]
    pub fn target(&self) -> Option<NodeId> {
        self.target.get()
    }

    /// The node whose listener is currently running.
    #[must_use]
    pub fn current_target(&self) -> Option<NodeId> {
        self.current.get()
    }

    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }

    pub(crate) fn begin(&self, target: NodeId) {
        self.target.set(Some(target));
        self.stopped.set(false);
    }

    pub(crate) fn enter(&self, node: NodeId) {
        self.current.set(Some(node));
    }
}
