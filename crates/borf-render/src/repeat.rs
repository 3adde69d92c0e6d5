#![forbid(unsafe_code)]

//! Keyed list reconciliation.
//!
//! # Design
//!
//! A repeat keeps one [`Item`] per key: writables for the item's value and
//! index, plus the live handle built from the row markup. Row markup reads
//! the value and index through read-only views of those writables, so a
//! persisting row updates in place instead of being rebuilt.
//!
//! # Algorithm (per source update)
//!
//! 1. Compute every key; a duplicate rejects the whole update before any
//!    document mutation.
//! 2. Build rows for new keys (detached, nothing inserted yet).
//! 3. Disconnect and drop rows whose key disappeared.
//! 4. Set value and index bindings of persisting rows, still in their old
//!    order.
//! 5. Reorder rows and connect each one right after its predecessor's last
//!    node. A row already in place is skipped; any other connected row is
//!    moved, never rebuilt.
//!
//! # Invariants
//!
//! 1. Between the anchors, rows appear in source order.
//! 2. A key present in consecutive updates keeps its handle (and its nodes).
//! 3. No row is inserted while a row scheduled for removal is still attached.
//! 4. Every attached row is tracked by the list, even after a panic.
//!
//! # Failure Modes
//!
//! - **Duplicate key / row init error**: reported; the list keeps its
//!   previous rows.
//! - **Key function panics**: unwinds out of the `set()` that triggered the
//!   update before anything is touched; the list keeps its previous rows.
//! - **Row binding panics** (a derived view of the row value): unwinds out
//!   of `set()`. Removed rows are gone, persisting rows stay tracked in
//!   their old order and new rows are dropped. The next update reconciles
//!   from there.
//! - **Update raised by a row render**: the list reconciles again from the
//!   source's latest value once the current pass finishes.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use ahash::AHashMap;
use borf_dom::NodeId;
use borf_reactive::{Readable, Subscription, Writable};

use crate::connectable::{Anchors, Connectable, MAX_CATCH_UP_PASSES};
use crate::context::RenderContext;
use crate::crash::CrashCollector;
use crate::error::{RenderError, Result};
use crate::markup::{Markup, Template};
use crate::renderable::Renderable;

type KeyFn<T, K> = Rc<dyn Fn(&T, usize) -> K>;
type RowFn<T> = Rc<dyn Fn(Readable<T>, Readable<usize>) -> Renderable>;

/// Repeat `render` over `items`, using each item as its own key.
pub fn repeat<T, R>(
    items: &Readable<Vec<T>>,
    render: impl Fn(Readable<T>, Readable<usize>) -> R + 'static,
) -> Markup
where
    T: Clone + PartialEq + Eq + Hash + Debug + 'static,
    R: Into<Renderable>,
{
    repeat_keyed(items, |item: &T, _| item.clone(), render)
}

/// Repeat `render` over `items`, matching rows across updates by `key`.
pub fn repeat_keyed<T, K, R>(
    items: &Readable<Vec<T>>,
    key: impl Fn(&T, usize) -> K + 'static,
    render: impl Fn(Readable<T>, Readable<usize>) -> R + 'static,
) -> Markup
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
    R: Into<Renderable>,
{
    Markup::template(RepeatTemplate {
        items: items.clone(),
        key: Rc::new(key),
        render: Rc::new(move |value, index| render(value, index).into()),
    })
}

struct RepeatTemplate<T, K> {
    items: Readable<Vec<T>>,
    key: KeyFn<T, K>,
    render: RowFn<T>,
}

impl<T, K> Template for RepeatTemplate<T, K>
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    fn kind(&self) -> &'static str {
        "repeat"
    }

    fn init(&self, ctx: &RenderContext) -> Result<Box<dyn Connectable>> {
        let anchors = Anchors::new(ctx.dom(), "repeat", ctx.app.config().debug_anchors);
        Ok(Box::new(RepeatHandle {
            anchors: anchors.clone(),
            list: Rc::new(RefCell::new(RowList {
                anchors,
                ctx: ctx.clone(),
                key: Rc::clone(&self.key),
                render: Rc::clone(&self.render),
                rows: Vec::new(),
            })),
            items: self.items.clone(),
            crash: ctx.app.crash_collector().clone(),
            subscription: None,
        }))
    }
}

struct Item<K, T> {
    key: K,
    value: Writable<T>,
    index: Writable<usize>,
    handle: Box<dyn Connectable>,
}

struct RowList<T, K> {
    anchors: Anchors,
    ctx: RenderContext,
    key: KeyFn<T, K>,
    render: RowFn<T>,
    rows: Vec<Item<K, T>>,
}

impl<T, K> RowList<T, K>
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    fn build(&self, key: K, value: &T, index: usize) -> Result<Item<K, T>> {
        let value = Writable::new(value.clone());
        let index = Writable::new(index);
        let handle = (self.render)(value.readable(), index.readable())
            .into_markup()
            .init(&self.ctx)?;
        Ok(Item {
            key,
            value,
            index,
            handle,
        })
    }

    fn reconcile(&mut self, items: &[T]) -> Result<()> {
        let _span = tracing::debug_span!("repeat.reconcile", len = items.len()).entered();

        // 1. keys, rejecting duplicates up front
        let keys: Vec<K> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (self.key)(item, i))
            .collect();
        let mut positions: AHashMap<&K, usize> = AHashMap::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            if let Some(first) = positions.insert(key, i) {
                return Err(RenderError::DuplicateKey {
                    key: format!("{key:?}"),
                    first,
                    second: i,
                });
            }
        }

        // 2. rows for new keys
        let existing: AHashMap<&K, usize> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (&row.key, i))
            .collect();
        let mut fresh: AHashMap<usize, Item<K, T>> = AHashMap::new();
        for (i, (key, item)) in keys.iter().zip(items).enumerate() {
            if !existing.contains_key(key) {
                fresh.insert(i, self.build(key.clone(), item, i)?);
            }
        }
        drop(existing);

        // 3. drop vanished keys
        let before = self.rows.len();
        self.rows.retain_mut(|row| {
            let keep = positions.contains_key(&row.key);
            if !keep {
                row.handle.disconnect();
            }
            keep
        });
        let removed = before - self.rows.len();

        // 4. in-place binding updates; observers may panic, rows stay tracked
        for row in &self.rows {
            if let Some(&i) = positions.get(&row.key) {
                row.value.set(items[i].clone());
                row.index.set(i);
            }
        }
        drop(positions);

        // 5. final order, then connect
        let mut kept: AHashMap<K, Item<K, T>> =
            self.rows.drain(..).map(|row| (row.key.clone(), row)).collect();
        let mut rows = Vec::with_capacity(items.len());
        for (i, key) in keys.into_iter().enumerate() {
            if let Some(row) = kept.remove(&key).or_else(|| fresh.remove(&i)) {
                rows.push(row);
            }
        }
        self.rows = rows;

        let Some(parent) = self.anchors.parent() else {
            return Ok(());
        };
        let dom = self.anchors.dom.clone();
        let mut prev = self.anchors.start;
        let mut moved = 0usize;
        for row in &mut self.rows {
            let in_place = row.handle.is_connected()
                && dom.next_sibling(prev) == Some(row.handle.first_node());
            if !in_place {
                if row.handle.is_connected() {
                    moved += 1;
                }
                row.handle.connect(parent, Some(prev))?;
            }
            prev = row.handle.last_node();
        }
        tracing::trace!(rows = self.rows.len(), removed, moved, "repeat.reconciled");
        Ok(())
    }

    fn clear(&mut self) {
        for mut row in self.rows.drain(..) {
            row.handle.disconnect();
        }
    }
}

pub(crate) struct RepeatHandle<T, K> {
    anchors: Anchors,
    list: Rc<RefCell<RowList<T, K>>>,
    items: Readable<Vec<T>>,
    crash: CrashCollector,
    subscription: Option<Subscription>,
}

impl<T, K> Connectable for RepeatHandle<T, K>
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    fn connect(&mut self, parent: NodeId, after: Option<NodeId>) -> Result<()> {
        if self.is_connected() {
            return self.anchors.move_to(parent, after);
        }
        self.anchors.insert(parent, after)?;

        let list = Rc::clone(&self.list);
        let crash = self.crash.clone();
        let items = self.items.clone();
        let dirty = Rc::new(Cell::new(false));
        self.subscription = Some(self.items.observe(move |latest: &Vec<T>| {
            let Ok(mut rows) = list.try_borrow_mut() else {
                // Raised while building rows; picked up below.
                dirty.set(true);
                return;
            };
            if let Err(err) = rows.reconcile(latest) {
                crash.report(err, "repeat");
            }
            let mut passes = 0;
            while dirty.replace(false) {
                if passes == MAX_CATCH_UP_PASSES {
                    crash.report(RenderError::Reentrant { handle: "repeat" }, "repeat");
                    break;
                }
                passes += 1;
                if let Err(err) = rows.reconcile(&items.get()) {
                    crash.report(err, "repeat");
                }
            }
        }));
        Ok(())
    }

    fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.subscription = None;
        match self.list.try_borrow_mut() {
            Ok(mut list) => list.clear(),
            Err(_) => self
                .crash
                .report(RenderError::Reentrant { handle: "repeat" }, "repeat"),
        }
        self.anchors.remove();
    }

    fn is_connected(&self) -> bool {
        self.anchors.is_connected()
    }

    fn first_node(&self) -> NodeId {
        self.anchors.start
    }

    fn last_node(&self) -> NodeId {
        self.anchors.end
    }
}

impl<T, K> Drop for RepeatHandle<T, K> {
    fn drop(&mut self) {
        self.anchors.release();
    }
}
