#![forbid(unsafe_code)]

//! The live-handle contract and the anchor pair most handles are built on.

use borf_dom::{Dom, NodeId};

use crate::error::Result;

/// A live unit of rendered output.
///
/// # Contract
///
/// - Handles are created inert by [`Markup::init`](crate::Markup::init):
///   their nodes exist but are detached and nothing is subscribed.
/// - `connect` inserts the handle's nodes under `parent` right after
///   `after` (or at the end of `parent` for `None`) and starts its
///   subscriptions. Connecting a handle that is already connected moves
///   its nodes; nothing is re-subscribed and no lifecycle hook re-fires.
/// - `disconnect` stops subscriptions, disconnects descendants, and
///   removes the handle's nodes. A second `disconnect` does nothing.
/// - `is_connected` is true exactly when the first node has a parent.
/// - Dropping a handle releases the document nodes it created; a handle
///   dropped while connected takes its nodes out of the tree.
pub trait Connectable {
    /// Insert (or move) this handle's nodes.
    ///
    /// # Errors
    ///
    /// Document errors, and errors from descendants initialized on connect.
    fn connect(&mut self, parent: NodeId, after: Option<NodeId>) -> Result<()>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// First node in document order.
    fn first_node(&self) -> NodeId;

    /// Last node in document order; the next sibling goes after it.
    fn last_node(&self) -> NodeId;
}

/// Catch-up passes a handle makes for updates its own render raised before
/// it gives up with [`RenderError::Reentrant`](crate::error::RenderError::Reentrant).
pub(crate) const MAX_CATCH_UP_PASSES: usize = 64;

/// Start/end comment pair delimiting a handle's content.
#[derive(Clone)]
pub(crate) struct Anchors {
    pub(crate) dom: Dom,
    pub(crate) start: NodeId,
    pub(crate) end: NodeId,
}

impl Anchors {
    pub(crate) fn new(dom: &Dom, kind: &str, labelled: bool) -> Self {
        let (open, close) = if labelled {
            (kind.to_owned(), format!("/{kind}"))
        } else {
            (String::new(), String::new())
        };
        Self {
            dom: dom.clone(),
            start: dom.create_comment(open),
            end: dom.create_comment(close),
        }
    }

    pub(crate) fn parent(&self) -> Option<NodeId> {
        self.dom.parent(self.start)
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.parent().is_some()
    }

    /// Insert both anchors, adjacent, after `after`.
    pub(crate) fn insert(&self, parent: NodeId, after: Option<NodeId>) -> Result<()> {
        self.dom.insert_after(parent, self.start, after)?;
        self.dom.insert_after(parent, self.end, Some(self.start))?;
        Ok(())
    }

    /// Move the anchors together with everything between them.
    pub(crate) fn move_to(&self, parent: NodeId, after: Option<NodeId>) -> Result<()> {
        if after == Some(self.end) || self.already_at(parent, after) {
            return Ok(());
        }
        tracing::trace!(start = self.start.raw(), "anchors.move");
        self.dom.move_range(parent, self.start, self.end, after)?;
        Ok(())
    }

    fn already_at(&self, parent: NodeId, after: Option<NodeId>) -> bool {
        self.parent() == Some(parent)
            && match after {
                Some(prev) => self.dom.next_sibling(prev) == Some(self.start),
                None => self.dom.next_sibling(self.end).is_none(),
            }
    }

    /// Detach both anchors. Content between them must already be gone.
    pub(crate) fn remove(&self) {
        // Ids come from our own document; removal cannot fail.
        let _ = self.dom.remove(self.start);
        let _ = self.dom.remove(self.end);
    }

    /// Free both anchor nodes. Only the owning handle calls this, on drop.
    pub(crate) fn release(&self) {
        self.dom.release(self.start);
        self.dom.release(self.end);
    }
}

/// Connect `handles` in order right after `after`, each after the last
/// node of its predecessor. Returns the last node placed.
pub(crate) fn connect_sequence<'a>(
    handles: impl IntoIterator<Item = &'a mut Box<dyn Connectable>>,
    parent: NodeId,
    after: Option<NodeId>,
) -> Result<Option<NodeId>> {
    let mut prev = after;
    for handle in handles {
        handle.connect(parent, prev)?;
        prev = Some(handle.last_node());
    }
    Ok(prev)
}
