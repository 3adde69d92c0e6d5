#![forbid(unsafe_code)]

//! Ordered observer lists shared by every observable source.
//!
//! Slots are held strongly by the list and by the [`Subscription`] that owns
//! them. Stopping a subscription deactivates its slot immediately, so a slot
//! stopped halfway through a fan-out is skipped even though the fan-out
//! iterates over a snapshot taken before it started.
//!
//! [`Subscription`]: crate::Subscription

use std::cell::Cell;
use std::rc::Rc;

/// Nested notification depth past which a fan-out is treated as a cycle.
pub const MAX_NOTIFY_DEPTH: usize = 256;

thread_local! {
    static NOTIFY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One registered observer callback.
pub(crate) struct Slot<T> {
    id: u64,
    active: Cell<bool>,
    callback: Box<dyn Fn(&T)>,
}

impl<T> Slot<T> {
    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn deactivate(&self) {
        self.active.set(false);
    }

    /// Invoke the callback unless the slot was stopped.
    pub(crate) fn call(&self, value: &T) {
        if self.active.get() {
            (self.callback)(value);
        }
    }
}

/// Registration-ordered list of observer slots.
pub(crate) struct ObserverList<T> {
    next_id: u64,
    slots: Vec<Rc<Slot<T>>>,
}

impl<T> ObserverList<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            slots: Vec::new(),
        }
    }

    /// Append a callback; it will be notified after every earlier one.
    pub(crate) fn insert(&mut self, callback: Box<dyn Fn(&T)>) -> Rc<Slot<T>> {
        self.prune();
        let slot = Rc::new(Slot {
            id: self.next_id,
            active: Cell::new(true),
            callback,
        });
        self.next_id += 1;
        self.slots.push(Rc::clone(&slot));
        slot
    }

    /// Drop slots whose subscriptions have been stopped.
    pub(crate) fn prune(&mut self) {
        self.slots.retain(|slot| slot.is_active());
    }

    /// Copy of the live slots, taken before a fan-out begins.
    pub(crate) fn snapshot(&self) -> Vec<Rc<Slot<T>>> {
        self.slots
            .iter()
            .filter(|slot| slot.is_active())
            .cloned()
            .collect()
    }

    /// Number of live observers.
    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_active()).count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracks how deeply notifications are nested on this thread.
///
/// Decrements on drop, so the count stays balanced when an observer panics.
pub(crate) struct DepthGuard;

impl DepthGuard {
    /// # Panics
    ///
    /// Panics when nesting exceeds [`MAX_NOTIFY_DEPTH`], which only happens
    /// when observers keep re-triggering each other (a cyclic graph).
    pub(crate) fn enter<T>() -> Self {
        let depth = NOTIFY_DEPTH.with(|depth| {
            let next = depth.get() + 1;
            depth.set(next);
            next
        });
        if depth > MAX_NOTIFY_DEPTH {
            NOTIFY_DEPTH.with(|d| d.set(d.get() - 1));
            tracing::error!(
                depth,
                value_type = std::any::type_name::<T>(),
                "observer notification cycle"
            );
            panic!(
                "observer notifications nested {depth} levels deep while notifying a `{}`; \
                 an observer is re-triggering its own source (cyclic observer graph)",
                std::any::type_name::<T>()
            );
        }
        Self
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        NOTIFY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Deliver `value` to each slot in order.
pub(crate) fn fan_out<T>(slots: &[Rc<Slot<T>>], value: &T) {
    let _depth = DepthGuard::enter::<T>();
    for slot in slots {
        slot.call(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn insert_preserves_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut list = ObserverList::new();
        for tag in ['a', 'b', 'c'] {
            let log = Rc::clone(&log);
            list.insert(Box::new(move |_: &u8| log.borrow_mut().push(tag)));
        }
        fan_out(&list.snapshot(), &0);
        assert_eq!(*log.borrow(), vec!['a', 'b', 'c']);
    }

    #[test]
    fn deactivated_slot_is_skipped_and_pruned() {
        let hits = Rc::new(Cell::new(0));
        let mut list = ObserverList::new();
        let hits_clone = Rc::clone(&hits);
        let slot = list.insert(Box::new(move |_: &u8| hits_clone.set(hits_clone.get() + 1)));
        let snapshot = list.snapshot();

        slot.deactivate();
        fan_out(&snapshot, &1);
        assert_eq!(hits.get(), 0);
        assert_eq!(list.len(), 0);

        list.prune();
        assert!(list.snapshot().is_empty());
    }

    #[test]
    fn depth_returns_to_zero_after_fan_out() {
        let list: ObserverList<u8> = ObserverList::new();
        fan_out(&list.snapshot(), &0);
        NOTIFY_DEPTH.with(|depth| assert_eq!(depth.get(), 0));
    }
}
