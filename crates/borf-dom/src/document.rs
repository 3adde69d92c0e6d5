#![forbid(unsafe_code)]

//! The document arena and its mutation API.
//!
//! # Design
//!
//! Every node lives in one `Vec` slot addressed by [`NodeId`]. A detached
//! node stays allocated until [`Dom::release`] frees its slot; freed slots
//! are reused under a bumped generation, so a stale id is reported as
//! unknown rather than naming the newcomer. [`Dom`] is a cheap clonable
//! handle; clones share one document.
//!
//! # Invariants
//!
//! 1. A node has at most one parent and appears exactly once in that
//!    parent's child list.
//! 2. Only elements have children.
//! 3. No node is its own ancestor.
//! 4. No borrow of the document is held while event handlers run, so
//!    handlers may mutate the tree.
//!
//! # Failure Modes
//!
//! Structural mistakes (unknown ids, bad reference nodes, cycles) come back
//! as [`DomError`]; the tree is left untouched when an operation fails.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{DomError, Result};
use crate::event::Event;
use crate::node::{Handler, Listener, ListenerId, NodeData, NodeId, NodeKind};

/// Running counters of structural work, for tests and benchmarks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomStats {
    /// Nodes created.
    pub created: u64,
    /// Insertions of a detached node.
    pub inserted: u64,
    /// Insertions of a node that already had a parent.
    pub moved: u64,
    /// Detachments.
    pub removed: u64,
    /// Nodes freed by [`Dom::release`].
    pub released: u64,
    /// Attribute and text writes.
    pub writes: u64,
}

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    root: NodeId,
    next_listener: u64,
    stats: DomStats,
}

impl Document {
    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.data.as_ref())
    }

    fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.get(id).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.data.as_mut())
            .ok_or(DomError::UnknownNode(id))
    }

    /// # Panics
    ///
    /// Panics when `u32::MAX` nodes are alive at once.
    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = Some(NodeData::new(kind));
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = data;
                NodeId::new(index, slot.generation)
            }
            None => {
                let Ok(index) = u32::try_from(self.slots.len()) else {
                    panic!("document arena exhausted: {} live nodes", self.live);
                };
                self.slots.push(Slot {
                    generation: 0,
                    data,
                });
                NodeId::new(index, 0)
            }
        };
        self.live += 1;
        self.stats.created += 1;
        id
    }

    /// Free `node`'s slot, detaching it and orphaning its children.
    fn free(&mut self, node: NodeId) -> Option<NodeData> {
        if node == self.root || self.get(node).is_none() {
            return None;
        }
        if self.detach(node).ok()? {
            self.stats.removed += 1;
        }
        let slot = &mut self.slots[node.index()];
        let data = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        for child in &data.children {
            if let Ok(child) = self.node_mut(*child) {
                child.parent = None;
            }
        }
        self.free.push(node.raw());
        self.live -= 1;
        self.stats.released += 1;
        Some(data)
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.get(node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, node: NodeId) -> Result<bool> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(false);
        };
        self.node_mut(parent)?.children.retain(|c| *c != node);
        self.node_mut(node)?.parent = None;
        Ok(true)
    }

    fn insert_at(&mut self, parent: NodeId, node: NodeId, reference: Position) -> Result<()> {
        if !self.node(parent)?.kind.is_element() {
            return Err(DomError::NotAContainer(parent));
        }
        self.node(node)?;
        if self.is_ancestor(node, parent) {
            return Err(DomError::HierarchyCycle { parent, node });
        }
        match reference {
            Position::Before(r) | Position::After(r) if r == node => return Ok(()),
            Position::Before(r) | Position::After(r) => {
                if self.node(r)?.parent != Some(parent) {
                    return Err(DomError::NotAChild {
                        parent,
                        reference: r,
                    });
                }
            }
            Position::End => {}
        }

        let moved = self.detach(node)?;
        let children = &self.node(parent)?.children;
        let index = match reference {
            Position::End => children.len(),
            Position::Before(r) => position_of(children, r),
            Position::After(r) => position_of(children, r) + 1,
        };
        self.node_mut(parent)?.children.insert(index, node);
        self.node_mut(node)?.parent = Some(parent);
        if moved {
            self.stats.moved += 1;
        } else {
            self.stats.inserted += 1;
        }
        Ok(())
    }
}

fn position_of(children: &[NodeId], node: NodeId) -> usize {
    children
        .iter()
        .position(|c| *c == node)
        .unwrap_or(children.len())
}

#[derive(Clone, Copy)]
enum Position {
    Before(NodeId),
    After(NodeId),
    End,
}

/// Shared handle to an in-memory document.
#[derive(Clone)]
pub struct Dom {
    inner: Rc<RefCell<Document>>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = self.inner.borrow();
        f.debug_struct("Dom")
            .field("nodes", &doc.live)
            .field("stats", &doc.stats)
            .finish()
    }
}

impl Dom {
    /// A document holding only a detached `body` root element.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Document {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            root: NodeId::new(0, 0),
            next_listener: 0,
            stats: DomStats::default(),
        };
        doc.root = doc.alloc(NodeKind::Element {
            tag: "body".into(),
            attributes: Vec::new(),
        });
        Self {
            inner: Rc::new(RefCell::new(doc)),
        }
    }

    /// The `body` element.
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.inner.borrow().root
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ─── Creation ───────────────────────────────────────────────────────

    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().alloc(NodeKind::Element {
            tag: tag.into(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&self, text: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&self, text: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().alloc(NodeKind::Comment(text.into()))
    }

    // ─── Structure ──────────────────────────────────────────────────────

    /// Insert `node` under `parent` before `before`, or at the end when
    /// `before` is `None`. An attached node is moved.
    ///
    /// # Errors
    ///
    /// See [`DomError`]; the tree is unchanged on error.
    pub fn insert_before(
        &self,
        parent: NodeId,
        node: NodeId,
        before: Option<NodeId>,
    ) -> Result<()> {
        let position = before.map_or(Position::End, Position::Before);
        self.inner.borrow_mut().insert_at(parent, node, position)
    }

    /// Insert `node` under `parent` right after `after`, or at the end when
    /// `after` is `None`.
    ///
    /// # Errors
    ///
    /// See [`DomError`]; the tree is unchanged on error.
    pub fn insert_after(&self, parent: NodeId, node: NodeId, after: Option<NodeId>) -> Result<()> {
        let position = after.map_or(Position::End, Position::After);
        self.inner.borrow_mut().insert_at(parent, node, position)
    }

    /// Append `node` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// See [`DomError`].
    pub fn append_child(&self, parent: NodeId, node: NodeId) -> Result<()> {
        self.insert_before(parent, node, None)
    }

    /// Detach `node` from its parent. Detached nodes are left alone.
    ///
    /// # Errors
    ///
    /// [`DomError::UnknownNode`] for ids this document never issued.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        if doc.detach(node)? {
            doc.stats.removed += 1;
        }
        Ok(())
    }

    /// Free `node` for reuse: it is detached, its children are orphaned
    /// (not freed), its listeners are dropped, and its id turns unknown.
    /// Returns `false` for stale ids and for `body`, which are left alone.
    pub fn release(&self, node: NodeId) -> bool {
        let Ok(mut doc) = self.inner.try_borrow_mut() else {
            return false;
        };
        let freed = doc.free(node);
        drop(doc);
        // Listener closures are dropped with no borrow held.
        freed.is_some()
    }

    /// The sibling run `first..=last` under their shared parent. A `last`
    /// that is not a later sibling yields the run to the end of the parent.
    #[must_use]
    pub fn range(&self, first: NodeId, last: NodeId) -> Vec<NodeId> {
        let doc = self.inner.borrow();
        let Some(children) = doc
            .get(first)
            .and_then(|n| n.parent)
            .and_then(|parent| doc.get(parent))
            .map(|parent| &parent.children)
        else {
            return vec![first];
        };
        let start = position_of(children, first);
        let mut out = Vec::new();
        for child in &children[start..] {
            out.push(*child);
            if *child == last {
                break;
            }
        }
        out
    }

    /// Move the sibling run `first..=last` (or the single detached `first`
    /// when it has no parent) under `parent`, right after `after`.
    ///
    /// # Errors
    ///
    /// See [`DomError`]. Nodes moved before a failure stay moved.
    pub fn move_range(
        &self,
        parent: NodeId,
        first: NodeId,
        last: NodeId,
        after: Option<NodeId>,
    ) -> Result<()> {
        let nodes = if self.parent(first).is_some() {
            self.range(first, last)
        } else {
            vec![first]
        };
        let mut anchor = after;
        for node in nodes {
            match anchor {
                Some(prev) => self.insert_after(parent, node, Some(prev))?,
                None => self.append_child(parent, node)?,
            }
            anchor = Some(node);
        }
        Ok(())
    }

    /// Detach every node of the sibling run `first..=last`.
    ///
    /// # Errors
    ///
    /// [`DomError::UnknownNode`] for foreign ids.
    pub fn remove_range(&self, first: NodeId, last: NodeId) -> Result<()> {
        for node in self.range(first, last) {
            self.remove(node)?;
        }
        Ok(())
    }

    // ─── Queries ────────────────────────────────────────────────────────

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().get(node).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .get(node)
            .map(|n| n.children.to_vec())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    #[must_use]
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let doc = self.inner.borrow();
        let children = &doc.get(parent)?.children;
        children.get(position_of(children, node) + 1).copied()
    }

    #[must_use]
    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let doc = self.inner.borrow();
        let children = &doc.get(parent)?.children;
        position_of(children, node)
            .checked_sub(1)
            .and_then(|i| children.get(i).copied())
    }

    /// `true` when `node` is `ancestor` or sits somewhere below it.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.borrow().is_ancestor(ancestor, node)
    }

    /// A copy of the node's payload.
    ///
    /// # Errors
    ///
    /// [`DomError::UnknownNode`].
    pub fn kind(&self, node: NodeId) -> Result<NodeKind> {
        Ok(self.inner.borrow().node(node)?.kind.clone())
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<String> {
        match self.kind(node).ok()? {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_comment(&self, node: NodeId) -> bool {
        self.kind(node).is_ok_and(|k| k.is_comment())
    }

    // ─── Content ────────────────────────────────────────────────────────

    /// Set (or overwrite, keeping its position) an attribute.
    ///
    /// # Errors
    ///
    /// [`DomError::NotElement`] for text and comment nodes.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: impl Into<String>) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        let NodeKind::Element { attributes, .. } = &mut doc.node_mut(node)?.kind else {
            return Err(DomError::NotElement(node));
        };
        let value = value.into();
        match attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = value,
            None => attributes.push((name.to_owned(), value)),
        }
        doc.stats.writes += 1;
        Ok(())
    }

    /// Remove an attribute; absent attributes are ignored.
    ///
    /// # Errors
    ///
    /// [`DomError::NotElement`] for text and comment nodes.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        let NodeKind::Element { attributes, .. } = &mut doc.node_mut(node)?.kind else {
            return Err(DomError::NotElement(node));
        };
        let before = attributes.len();
        attributes.retain(|(k, _)| k != name);
        if attributes.len() != before {
            doc.stats.writes += 1;
        }
        Ok(())
    }

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match self.kind(node).ok()? {
            NodeKind::Element { attributes, .. } => attributes
                .into_iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Replace the content of a text node.
    ///
    /// # Errors
    ///
    /// [`DomError::NotText`] when `node` is not a text node.
    pub fn set_text(&self, node: NodeId, text: impl Into<String>) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        let NodeKind::Text(current) = &mut doc.node_mut(node)?.kind else {
            return Err(DomError::NotText(node));
        };
        *current = text.into();
        doc.stats.writes += 1;
        Ok(())
    }

    /// Concatenated text of `node` and its descendants.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            Ok(NodeKind::Text(text)) => out.push_str(&text),
            Ok(NodeKind::Element { .. }) => {
                for child in self.children(node) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    // ─── Events ─────────────────────────────────────────────────────────

    /// Register `handler` for events named `event` on `node`.
    ///
    /// # Errors
    ///
    /// [`DomError::UnknownNode`].
    pub fn add_event_listener(
        &self,
        node: NodeId,
        event: impl Into<String>,
        handler: impl Fn(&Event) + 'static,
    ) -> Result<ListenerId> {
        let mut doc = self.inner.borrow_mut();
        doc.node(node)?;
        let id = ListenerId(doc.next_listener);
        doc.next_listener += 1;
        doc.node_mut(node)?.listeners.push(Listener {
            id,
            event: event.into(),
            handler: Rc::new(handler),
        });
        Ok(id)
    }

    /// Unregister a listener. Unknown ids are ignored.
    pub fn remove_event_listener(&self, node: NodeId, id: ListenerId) {
        if let Ok(mut doc) = self.inner.try_borrow_mut()
            && let Ok(data) = doc.node_mut(node)
        {
            data.listeners.retain(|l| l.id != id);
        }
    }

    /// Number of listeners registered on `node`.
    #[must_use]
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.inner
            .borrow()
            .get(node)
            .map_or(0, |n| n.listeners.len())
    }

    /// Deliver `event` at `target`, then bubble through its ancestors.
    /// Returns how many handlers ran.
    ///
    /// # Errors
    ///
    /// [`DomError::UnknownNode`] when `target` is foreign.
    pub fn dispatch_event(&self, target: NodeId, event: &Event) -> Result<usize> {
        self.inner.borrow().node(target)?;
        event.begin(target);
        let _span = tracing::trace_span!("dom.dispatch", event = event.name()).entered();

        let mut ran = 0;
        let mut current = Some(target);
        while let Some(node) = current {
            let handlers: Vec<Handler> = {
                let doc = self.inner.borrow();
                doc.get(node)
                    .map(|n| {
                        n.listeners
                            .iter()
                            .filter(|l| l.event == event.name())
                            .map(|l| Rc::clone(&l.handler))
                            .collect()
                    })
                    .unwrap_or_default()
            };
            event.enter(node);
            for handler in handlers {
                handler(event);
                ran += 1;
            }
            if event.is_propagation_stopped() {
                break;
            }
            current = self.parent(node);
        }
        Ok(ran)
    }

    // ─── Introspection ──────────────────────────────────────────────────

    #[must_use]
    pub fn stats(&self) -> DomStats {
        self.inner.borrow().stats
    }

    pub fn reset_stats(&self) {
        self.inner.borrow_mut().stats = DomStats::default();
    }

    /// Nodes currently allocated, attached or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.borrow().live
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn labels(dom: &Dom, parent: NodeId) -> Vec<String> {
        dom.children(parent)
            .into_iter()
            .map(|c| dom.text_content(c))
            .collect()
    }

    #[test]
    fn insert_before_and_after() {
        let dom = Dom::new();
        let list = dom.create_element("ul");
        let a = dom.create_text("a");
        let b = dom.create_text("b");
        let c = dom.create_text("c");
        dom.append_child(list, b).unwrap();
        dom.insert_before(list, a, Some(b)).unwrap();
        dom.insert_after(list, c, Some(b)).unwrap();
        assert_eq!(labels(&dom, list), ["a", "b", "c"]);
        assert_eq!(dom.next_sibling(a), Some(b));
        assert_eq!(dom.previous_sibling(a), None);
    }

    #[test]
    fn reinserting_moves() {
        let dom = Dom::new();
        let list = dom.create_element("ul");
        let a = dom.create_text("a");
        let b = dom.create_text("b");
        dom.append_child(list, a).unwrap();
        dom.append_child(list, b).unwrap();
        dom.reset_stats();

        dom.append_child(list, a).unwrap();
        assert_eq!(labels(&dom, list), ["b", "a"]);
        let stats = dom.stats();
        assert_eq!((stats.inserted, stats.moved), (0, 1));
    }

    #[test]
    fn text_nodes_cannot_hold_children() {
        let dom = Dom::new();
        let text = dom.create_text("x");
        let other = dom.create_text("y");
        assert_eq!(
            dom.append_child(text, other),
            Err(DomError::NotAContainer(text))
        );
    }

    #[test]
    fn refuses_cycles() {
        let dom = Dom::new();
        let outer = dom.create_element("div");
        let inner = dom.create_element("span");
        dom.append_child(outer, inner).unwrap();
        assert_eq!(
            dom.append_child(inner, outer),
            Err(DomError::HierarchyCycle {
                parent: inner,
                node: outer
            })
        );
        assert_eq!(dom.parent(outer), None);
    }

    #[test]
    fn foreign_reference_is_rejected() {
        let dom = Dom::new();
        let list = dom.create_element("ul");
        let stray = dom.create_text("stray");
        let node = dom.create_text("n");
        assert!(matches!(
            dom.insert_before(list, node, Some(stray)),
            Err(DomError::NotAChild { .. })
        ));
        assert_eq!(dom.parent(node), None);
    }

    #[test]
    fn move_range_keeps_order() {
        let dom = Dom::new();
        let root = dom.create_element("div");
        let nodes: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|t| {
                let n = dom.create_text(*t);
                dom.append_child(root, n).unwrap();
                n
            })
            .collect();

        dom.move_range(root, nodes[0], nodes[1], Some(nodes[3]))
            .unwrap();
        assert_eq!(labels(&dom, root), ["c", "d", "a", "b"]);

        dom.remove_range(nodes[3], nodes[0]).unwrap();
        assert_eq!(labels(&dom, root), ["c", "b"]);
        assert_eq!(dom.parent(nodes[0]), None);
    }

    #[test]
    fn attributes_keep_insertion_order() {
        let dom = Dom::new();
        let el = dom.create_element("input");
        dom.set_attribute(el, "type", "text").unwrap();
        dom.set_attribute(el, "value", "a").unwrap();
        dom.set_attribute(el, "type", "search").unwrap();
        assert_eq!(dom.attribute(el, "type").as_deref(), Some("search"));
        dom.remove_attribute(el, "type").unwrap();
        assert_eq!(dom.attribute(el, "type"), None);
        assert_eq!(dom.attribute(el, "value").as_deref(), Some("a"));
    }

    #[test]
    fn events_bubble_until_stopped() {
        let dom = Dom::new();
        let outer = dom.create_element("div");
        let button = dom.create_element("button");
        dom.append_child(outer, button).unwrap();

        let outer_hits = Rc::new(Cell::new(0));
        let hits = Rc::clone(&outer_hits);
        dom.add_event_listener(outer, "click", move |_| hits.set(hits.get() + 1))
            .unwrap();
        let ran = dom.dispatch_event(button, &Event::new("click")).unwrap();
        assert_eq!((ran, outer_hits.get()), (1, 1));

        dom.add_event_listener(button, "click", Event::stop_propagation)
            .unwrap();
        dom.dispatch_event(button, &Event::new("click")).unwrap();
        assert_eq!(outer_hits.get(), 1);
    }

    #[test]
    fn handlers_may_mutate_the_tree() {
        let dom = Dom::new();
        let list = dom.create_element("ul");
        let button = dom.create_element("button");
        let dom_clone = dom.clone();
        dom.add_event_listener(button, "click", move |_| {
            let item = dom_clone.create_text("added");
            dom_clone.append_child(list, item).unwrap();
        })
        .unwrap();

        dom.dispatch_event(button, &Event::new("click")).unwrap();
        assert_eq!(dom.text_content(list), "added");
    }

    #[test]
    fn removed_listener_stays_silent() {
        let dom = Dom::new();
        let el = dom.create_element("input");
        let hits = Rc::new(Cell::new(0));
        let hits_clone = Rc::clone(&hits);
        let id = dom
            .add_event_listener(el, "input", move |e| {
                assert_eq!(e.value(), Some("x"));
                hits_clone.set(hits_clone.get() + 1);
            })
            .unwrap();
        dom.dispatch_event(el, &Event::new("input").with_value("x"))
            .unwrap();
        dom.remove_event_listener(el, id);
        dom.dispatch_event(el, &Event::new("input").with_value("x"))
            .unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(dom.listener_count(el), 0);
    }

    #[test]
    fn released_slots_are_reused_under_a_new_generation() {
        let dom = Dom::new();
        let p = dom.create_element("p");
        let text = dom.create_text("x");
        dom.append_child(p, text).unwrap();
        dom.append_child(dom.body(), p).unwrap();
        dom.add_event_listener(p, "click", |_| {}).unwrap();
        assert_eq!(dom.node_count(), 3);

        assert!(dom.release(p));
        assert!(!dom.release(p));
        assert_eq!(dom.node_count(), 2);
        assert!(dom.children(dom.body()).is_empty());
        assert_eq!(dom.parent(text), None);
        assert_eq!(dom.kind(p), Err(DomError::UnknownNode(p)));

        let reused = dom.create_element("div");
        assert_eq!(reused.raw(), p.raw());
        assert_ne!(reused, p);
        assert_eq!(dom.listener_count(reused), 0);
        assert!(matches!(
            dom.append_child(p, text),
            Err(DomError::UnknownNode(_))
        ));
        assert_eq!(dom.tag(reused).as_deref(), Some("div"));
        assert_eq!(dom.stats().released, 1);
    }

    #[test]
    fn body_cannot_be_released() {
        let dom = Dom::new();
        assert!(!dom.release(dom.body()));
        assert_eq!(dom.node_count(), 1);
    }

    #[test]
    fn churn_keeps_the_arena_bounded() {
        let dom = Dom::new();
        for i in 0..1_000 {
            let node = dom.create_text(format!("{i}"));
            dom.append_child(dom.body(), node).unwrap();
            dom.release(node);
        }
        assert_eq!(dom.node_count(), 1);
        assert_eq!(dom.inner.borrow().slots.len(), 2);
    }
}
