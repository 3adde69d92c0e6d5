#![forbid(unsafe_code)]

//! Read-only observable views.
//!
//! A [`Readable<T>`] is the {read} capability over some source: a
//! [`Writable`](crate::Writable), a derived view produced by
//! [`Readable::map`] or one of the `merge` functions, or a constant.
//! It can be cloned freely and handed to rendering code, which can observe
//! it but never write through it.

use std::rc::Rc;

use crate::derived::{Derived, upstream};
use crate::subscription::Subscription;

/// Anything a [`Readable`] can be a view of.
pub(crate) trait Source<T> {
    fn get(&self) -> T;
    fn observe(&self, callback: Box<dyn Fn(&T)>) -> Subscription;
    fn version(&self) -> u64;
    fn observer_count(&self) -> usize;
}

/// A source that never changes.
struct Constant<T>(T);

impl<T: Clone + 'static> Source<T> for Constant<T> {
    fn get(&self) -> T {
        self.0.clone()
    }

    fn observe(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        callback(&self.0);
        Subscription::inert()
    }

    fn version(&self) -> u64 {
        0
    }

    fn observer_count(&self) -> usize {
        0
    }
}

/// Read-only handle to an observable value.
///
/// # Invariants
///
/// 1. [`get`](Readable::get) returns the latest value of the source.
/// 2. [`observe`](Readable::observe) calls back once immediately with the
///    current value, then once per change, in registration order.
/// 3. Observers always receive the whole new value, never a delta.
pub struct Readable<T> {
    source: Rc<dyn Source<T>>,
}

impl<T> Clone for Readable<T> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
        }
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Readable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Readable")
            .field("value", &self.source.get())
            .field("version", &self.source.version())
            .finish()
    }
}

impl<T: 'static> Readable<T> {
    pub(crate) fn from_source(source: Rc<dyn Source<T>>) -> Self {
        Self { source }
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.source.get()
    }

    /// Register `callback`; it runs once right away with the current value,
    /// then after every change.
    pub fn observe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.source.observe(Box::new(callback))
    }

    /// Change counter of the underlying source.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.source.version()
    }

    /// Number of live observers on the underlying source.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.source.observer_count()
    }

    /// Whether both handles view the same source.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.source, &other.source)
    }
}

impl<T: Clone + 'static> Readable<T> {
    /// A readable that always holds `value`.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self {
            source: Rc::new(Constant(value)),
        }
    }

    /// Live derived view. Lazy: it subscribes to `self` only while it has
    /// observers of its own.
    pub fn map<U: Clone + PartialEq + 'static>(
        &self,
        f: impl Fn(&T) -> U + 'static,
    ) -> Readable<U> {
        let source = self.clone();
        let derived = Derived::new(
            smallvec::smallvec![upstream(self)],
            move || f(&source.get()),
        );
        Readable::from_source(Rc::new(derived))
    }
}

impl<T: Clone + 'static> From<T> for Readable<T> {
    fn from(value: T) -> Self {
        Self::constant(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Writable;
    use std::cell::{Cell, RefCell};

    #[test]
    fn constant_replays_once() {
        let r = Readable::constant(5);
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let sub = r.observe(move |v| {
            assert_eq!(*v, 5);
            calls_clone.set(calls_clone.get() + 1);
        });
        assert_eq!(calls.get(), 1);
        assert!(!sub.is_active());
    }

    #[test]
    fn map_scenario_from_writable() {
        let n = Writable::new(0);
        let doubled = n.map(|x| x * 2);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = doubled.observe(move |v| seen_clone.borrow_mut().push(*v));

        n.set(1);
        n.set(1);
        n.set(2);
        assert_eq!(*seen.borrow(), vec![0, 2, 4]);
    }

    #[test]
    fn map_is_lazy() {
        let n = Writable::new(3);
        let computed = Rc::new(Cell::new(0));
        let computed_clone = Rc::clone(&computed);
        let squared = n.map(move |x| {
            computed_clone.set(computed_clone.get() + 1);
            x * x
        });
        assert_eq!(computed.get(), 0);
        assert_eq!(n.observer_count(), 0);

        assert_eq!(squared.get(), 9);
        assert_eq!(n.observer_count(), 0);

        let sub = squared.observe(|_| {});
        assert_eq!(n.observer_count(), 1);
        drop(sub);
        assert_eq!(n.observer_count(), 0);
    }

    #[test]
    fn map_skips_equal_results() {
        let n = Writable::new(1);
        let parity = n.map(|x| x % 2);
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let _sub = parity.observe(move |_| calls_clone.set(calls_clone.get() + 1));

        n.set(3);
        n.set(5);
        assert_eq!(calls.get(), 1);
        n.set(6);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn ptr_eq_tracks_source() {
        let a = Readable::constant(1);
        let b = a.clone();
        let c = Readable::constant(1);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
