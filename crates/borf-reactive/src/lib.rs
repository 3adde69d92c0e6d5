#![forbid(unsafe_code)]

//! Reactive value cells for borf.
//!
//! This crate provides the change-tracking primitives the renderer builds on:
//!
//! - [`Writable`]: a shared, version-tracked value that notifies observers
//!   when it changes. The {read, write} capability.
//! - [`Readable`]: a read-only view over a writable, a derived value, or a
//!   constant. The {read} capability.
//! - [`Subscription`]: cancellation guard returned by every `observe`;
//!   stopping twice is a no-op and dropping it stops it.
//! - [`merge2`], [`merge3`], [`merge_all`]: derived readables over several
//!   sources.
//!
//! # Architecture
//!
//! Cells are `Rc<RefCell<..>>` and therefore `!Send`. No borrow is held
//! while observers run, so observers may read, write, observe, or stop
//! subscriptions from inside a notification.
//!
//! Derived readables ([`Readable::map`] and the merges) are lazy: they hold
//! upstream subscriptions only while they have observers themselves.
//!
//! # Invariants
//!
//! 1. Each `set` that changes the value bumps the version by one.
//! 2. Observers are notified synchronously, in registration order.
//! 3. Writing a value equal to the current one does nothing at all.
//! 4. `observe` calls back immediately with the current value.
//! 5. A stopped subscription is never called again, even by a notification
//!    already in progress.
//! 6. Nothing is batched: every effective `set` is one synchronous fan-out.

mod derived;
pub mod error;
pub mod merge;
mod observers;
pub mod readable;
pub mod subscription;
pub mod writable;

pub use error::ReactiveError;
pub use merge::{merge_all, merge2, merge3};
pub use observers::MAX_NOTIFY_DEPTH;
pub use readable::Readable;
pub use subscription::Subscription;
pub use writable::Writable;
