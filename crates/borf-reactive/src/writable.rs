#![forbid(unsafe_code)]

//! The mutable observable cell that owns canonical state.
//!
//! # Design
//!
//! [`Writable<T>`] wraps a value in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). When the value changes (determined by `PartialEq`),
//! every live observer is called in registration order with the new value.
//!
//! # Performance
//!
//! | Operation     | Complexity                  |
//! |---------------|-----------------------------|
//! | `get()`       | O(1) + clone                |
//! | `set()`       | O(S) where S = observers    |
//! | `observe()`   | O(S) amortized (prunes)     |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: an observer may set the same cell again. No borrow
//!   is held while observers run, so the nested set runs its own complete
//!   fan-out before the outer one resumes. Nothing is coalesced.
//! - **Observer panic**: not caught. It unwinds out of `set()` and the
//!   remaining observers of that fan-out are not called.
//! - **Cycles**: observers that keep re-triggering each other hit the
//!   notification depth guard and panic with a diagnostic.

use std::cell::RefCell;
use std::rc::Rc;

use crate::observers::{ObserverList, fan_out};
use crate::readable::{Readable, Source};
use crate::subscription::Subscription;

struct WritableInner<T> {
    value: T,
    version: u64,
    observers: ObserverList<T>,
}

/// A shared, observable, mutable value.
///
/// Cloning a `Writable` creates a new handle to the **same** cell. Hand out
/// [`Readable`] views (via [`Writable::readable`]) to code that should only
/// read.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op: no version bump, no calls.
/// 3. Observers are called in registration order.
/// 4. An observer whose subscription was stopped is never called again,
///    even by a fan-out that was already in progress.
pub struct Writable<T> {
    inner: Rc<RefCell<WritableInner<T>>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Writable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("observer_count", &inner.observers.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Writable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Writable<T> {
    /// Create a cell holding `value`, at version 0 with no observers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(WritableInner {
                value,
                version: 0,
                observers: ObserverList::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` sets this same cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value and notify observers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Replace the value, returning the previous one. Notifies on change.
    pub fn replace(&self, value: T) -> T {
        let previous = self.get();
        self.set(value);
        previous
    }

    /// Apply `f` to a cloned draft and commit it if it differs.
    ///
    /// The live value is untouched while `f` runs, so a panicking `f` leaves
    /// the cell as it was.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut draft = self.get();
        f(&mut draft);
        self.set(draft);
    }

    /// Register `callback`, calling it once right away with the current value
    /// and then after every change.
    pub fn observe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.observe_boxed(Box::new(callback))
    }

    pub(crate) fn observe_boxed(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        let slot = self.inner.borrow_mut().observers.insert(callback);
        let current = self.get();
        fan_out(std::slice::from_ref(&slot), &current);

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            slot.deactivate();
            if let Some(cell) = weak.upgrade()
                && let Ok(mut inner) = cell.try_borrow_mut()
            {
                inner.observers.prune();
            }
            tracing::trace!(slot = slot.id(), "writable.unobserve");
        })
    }

    /// A read-only view of this cell.
    #[must_use]
    pub fn readable(&self) -> Readable<T> {
        Readable::from_source(Rc::new(self.clone()))
    }

    /// Derived read-only view; shorthand for `self.readable().map(f)`.
    pub fn map<U: Clone + PartialEq + 'static>(
        &self,
        f: impl Fn(&T) -> U + 'static,
    ) -> Readable<U> {
        self.readable().map(f)
    }

    /// Number of value-changing mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Whether two handles refer to the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self) {
        // Snapshot observers and value, then call them with no borrow held.
        let (slots, value, version) = {
            let inner = self.inner.borrow();
            (inner.observers.snapshot(), inner.value.clone(), inner.version)
        };
        tracing::trace!(observers = slots.len(), version, "writable.notify");
        fan_out(&slots, &value);
    }
}

impl<T: Clone + PartialEq + 'static> Source<T> for Writable<T> {
    fn get(&self) -> T {
        Writable::get(self)
    }

    fn observe(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        self.observe_boxed(callback)
    }

    fn version(&self) -> u64 {
        Writable::version(self)
    }

    fn observer_count(&self) -> usize {
        Writable::observer_count(self)
    }
}

impl<T: Clone + PartialEq + 'static> From<Writable<T>> for Readable<T> {
    fn from(writable: Writable<T>) -> Self {
        writable.readable()
    }
}

impl<T: Clone + PartialEq + 'static> From<&Writable<T>> for Readable<T> {
    fn from(writable: &Writable<T>) -> Self {
        writable.readable()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
