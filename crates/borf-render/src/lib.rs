#![forbid(unsafe_code)]

//! Markup, live handles and keyed reconciliation on top of `borf-reactive`.
//!
//! # Pipeline
//!
//! 1. Build a [`Markup`] tree with [`m`] or the builder methods. Markup is
//!    inert and may be instantiated any number of times.
//! 2. [`Markup::init`] produces a [`Connectable`] handle. Nothing is inserted
//!    and nothing is subscribed yet.
//! 3. [`Connectable::connect`] inserts the handle's nodes and subscribes to
//!    the readables it depends on. From then on, state changes patch only
//!    the affected region.
//!
//! # Ordering
//!
//! Everything is synchronous. In [`cond`], [`dynamic`] and [`repeat`], the
//! outgoing subtree is disconnected before its replacement is connected, and
//! rows removed from a repeat are gone before new rows are inserted.
//!
//! # Failures
//!
//! Construction errors are returned from `init`. Errors raised while
//! re-rendering in response to a state change are *reported* to the
//! [`CrashCollector`]; lifecycle hook failures and explicit crashes are
//! *fatal*, and the [`App`] swaps its root for a crash view.

pub mod app;
pub mod attributes;
pub mod conditional;
pub mod config;
pub mod connectable;
pub mod context;
pub mod crash;
pub mod dynamic;
pub mod error;
pub mod markup;
mod nodes;
pub mod renderable;
pub mod repeat;
pub mod scheduler;
pub mod view;

pub use app::App;
pub use attributes::{AttrValue, Attributes, EventHandler};
pub use conditional::cond;
pub use config::RenderConfig;
pub use connectable::Connectable;
pub use context::{AppContext, ElementContext, RenderContext};
pub use crash::{CrashCollector, CrashReport, Severity};
pub use dynamic::{dynamic, dynamic_all, dynamic2, outlet, try_dynamic};
pub use error::{RenderError, Result};
pub use markup::{Markup, Tag, Template, m};
pub use renderable::Renderable;
pub use repeat::{repeat, repeat_keyed};
pub use scheduler::Scheduler;
pub use view::{View, ViewContext};
