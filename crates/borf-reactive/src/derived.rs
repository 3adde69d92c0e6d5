#![forbid(unsafe_code)]

//! Derived readables that recompute from one or more upstream sources.
//!
//! # Design
//!
//! A derived source holds a compute function plus type-erased links to its
//! upstream readables. It is **lazy**: upstream subscriptions exist only
//! while the derived source has observers of its own. The first observer
//! links every upstream; the last one to stop unlinks them.
//!
//! While linked, every upstream notification re-runs the compute function
//! (reading every source, not only the one that changed) and the result is
//! delivered to observers if it differs from the previously delivered value.
//!
//! # Invariants
//!
//! 1. `get()` always re-evaluates against current source values, so a read
//!    made halfway through another source's fan-out is never stale.
//! 2. Observers see one recomputed value per upstream change event. There is
//!    no batching: two sources changing back to back produce two rounds.
//! 3. A result equal (`PartialEq`) to the last delivered one notifies nobody.
//! 4. `version` increments once per delivered change.
//!
//! # Failure Modes
//!
//! - **Compute panics**: unwinds out of whichever `set()` triggered it. The
//!   last delivered value stays in place.
//! - **Cycles**: a derived value feeding its own source recurses until the
//!   notification depth guard fires.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::observers::{ObserverList, fan_out};
use crate::readable::{Readable, Source};
use crate::subscription::Subscription;

/// Type-erased upstream: subscribes a change callback to one source.
pub(crate) type Upstream = Rc<dyn Fn(Box<dyn Fn()>) -> Subscription>;

/// Erase `source` into an [`Upstream`] link.
pub(crate) fn upstream<S: 'static>(source: &Readable<S>) -> Upstream {
    let source = source.clone();
    Rc::new(move |on_change: Box<dyn Fn()>| source.observe(move |_| on_change()))
}

struct DerivedInner<T> {
    /// One or two sources stay inline; `map` never allocates a vector.
    upstream: SmallVec<[Upstream; 2]>,
    compute: Rc<dyn Fn() -> T>,
    /// Last value delivered to observers (None while unlinked).
    last: Option<T>,
    version: u64,
    observers: ObserverList<T>,
    /// Live upstream subscriptions; empty while unlinked.
    links: Vec<Subscription>,
}

/// Shared handle to a derived source.
pub(crate) struct Derived<T> {
    inner: Rc<RefCell<DerivedInner<T>>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    pub(crate) fn new(
        upstream: SmallVec<[Upstream; 2]>,
        compute: impl Fn() -> T + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DerivedInner {
                upstream,
                compute: Rc::new(compute),
                last: None,
                version: 0,
                observers: ObserverList::new(),
                links: Vec::new(),
            })),
        }
    }

    fn compute(&self) -> T {
        // Clone the function out so no borrow is held while sources are read.
        let compute = Rc::clone(&self.inner.borrow().compute);
        compute()
    }

    fn is_linked(&self) -> bool {
        !self.inner.borrow().links.is_empty()
    }

    fn link(&self) {
        let upstream = self.inner.borrow().upstream.clone();
        // Upstream subscriptions replay their current value immediately;
        // those replays are not changes.
        let linking = Rc::new(Cell::new(true));
        let links: Vec<Subscription> = upstream
            .iter()
            .map(|source| {
                let weak = Rc::downgrade(&self.inner);
                let linking = Rc::clone(&linking);
                source(Box::new(move || {
                    if linking.get() {
                        return;
                    }
                    if let Some(inner) = weak.upgrade() {
                        Derived { inner }.recompute();
                    }
                }))
            })
            .collect();
        linking.set(false);

        let value = self.compute();
        let mut inner = self.inner.borrow_mut();
        inner.links = links;
        inner.last = Some(value);
        tracing::trace!(sources = inner.upstream.len(), "derived.link");
    }

    fn unlink(&self) {
        let links = {
            let mut inner = self.inner.borrow_mut();
            inner.last = None;
            std::mem::take(&mut inner.links)
        };
        // Upstream stop closures run here, outside our borrow.
        drop(links);
        tracing::trace!("derived.unlink");
    }

    fn recompute(&self) {
        let value = self.compute();
        let slots = {
            let mut inner = self.inner.borrow_mut();
            if inner.last.as_ref() == Some(&value) {
                return;
            }
            inner.last = Some(value.clone());
            inner.version += 1;
            inner.observers.snapshot()
        };
        fan_out(&slots, &value);
    }

    fn observe_boxed(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        let slot = self.inner.borrow_mut().observers.insert(callback);
        if !self.is_linked() {
            self.link();
        }
        let current = self.compute();
        fan_out(std::slice::from_ref(&slot), &current);

        // The subscription keeps the derived source alive, so observing a
        // temporary `map(..)` result works.
        let this = self.clone();
        Subscription::new(move || {
            slot.deactivate();
            let idle = match this.inner.try_borrow_mut() {
                Ok(mut inner) => {
                    inner.observers.prune();
                    inner.observers.is_empty()
                }
                Err(_) => false,
            };
            if idle {
                this.unlink();
            }
        })
    }
}

impl<T: Clone + PartialEq + 'static> Source<T> for Derived<T> {
    fn get(&self) -> T {
        self.compute()
    }

    fn observe(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        self.observe_boxed(callback)
    }

    fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::{Readable, Writable};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn temporary_map_keeps_working() {
        let source = Writable::new(2);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = source
            .map(|v| v + 1)
            .observe(move |v| seen_clone.borrow_mut().push(*v));

        source.set(5);
        assert_eq!(*seen.borrow(), vec![3, 6]);
    }

    #[test]
    fn version_counts_delivered_changes() {
        let source = Writable::new(0);
        let halved = source.map(|v| v / 2);
        let _sub = halved.observe(|_| {});

        source.set(1);
        assert_eq!(halved.version(), 0);
        source.set(2);
        assert_eq!(halved.version(), 1);
    }

    #[test]
    fn chained_maps_propagate() {
        let source = Writable::new(1);
        let chained = source.map(|v| v * 10).map(|v| format!("#{v}"));
        let last = Rc::new(RefCell::new(String::new()));
        let last_clone = Rc::clone(&last);
        let _sub = chained.observe(move |v: &String| *last_clone.borrow_mut() = v.clone());

        source.set(4);
        assert_eq!(*last.borrow(), "#40");
    }

    #[test]
    fn get_mid_fan_out_is_fresh() {
        let source = Writable::new(1);
        let doubled = source.map(|v| v * 2);
        let _keep_linked = doubled.observe(|_| {});

        let observed = Rc::new(Cell::new(0));
        let observed_clone = Rc::clone(&observed);
        let doubled_clone = doubled.clone();
        // Registered on the source directly, ahead of nothing in particular:
        // whatever the order, a read must see the new source value.
        let _reader = source.observe(move |_| observed_clone.set(doubled_clone.get()));

        source.set(21);
        assert_eq!(observed.get(), 42);
    }

    #[test]
    fn relinks_after_last_observer_stops() {
        let source = Writable::new(1);
        let mapped: Readable<i32> = source.map(|v| v + 100);

        let first = mapped.observe(|_| {});
        drop(first);
        assert_eq!(source.observer_count(), 0);

        source.set(2);
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        let _second = mapped.observe(move |v| seen_clone.set(*v));
        assert_eq!(seen.get(), 102);
        source.set(3);
        assert_eq!(seen.get(), 103);
    }

    #[test]
    fn survives_source_handle_drop() {
        let mapped;
        {
            let source = Writable::new(42);
            mapped = source.map(|v| *v);
        }
        assert_eq!(mapped.get(), 42);
    }
}
