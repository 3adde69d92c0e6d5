#![forbid(unsafe_code)]

//! Contexts threaded through [`Markup::init`](crate::Markup::init).
//!
//! [`AppContext`] holds what one mounted app shares: the document, config,
//! crash collector, scheduler and global stores. [`ElementContext`] is the
//! lexical chain: stores provided by enclosing views and the children an
//! enclosing view was given to project.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use borf_dom::Dom;

use crate::config::RenderConfig;
use crate::crash::CrashCollector;
use crate::error::{RenderError, Result};
use crate::markup::Markup;
use crate::scheduler::Scheduler;

pub(crate) type StoreMap = AHashMap<TypeId, Rc<dyn Any>>;

pub(crate) fn downcast_store<S: 'static>(map: &StoreMap) -> Option<Rc<S>> {
    map.get(&TypeId::of::<S>())
        .and_then(|store| Rc::clone(store).downcast::<S>().ok())
}

struct AppShared {
    dom: Dom,
    config: RenderConfig,
    crash: CrashCollector,
    scheduler: Scheduler,
    stores: RefCell<StoreMap>,
}

/// Process-wide singletons for one app.
#[derive(Clone)]
pub struct AppContext {
    shared: Rc<AppShared>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.shared.config)
            .field("stores", &self.shared.stores.borrow().len())
            .finish()
    }
}

impl AppContext {
    #[must_use]
    pub fn new(dom: Dom, config: RenderConfig) -> Self {
        let crash = CrashCollector::new(&config);
        Self {
            shared: Rc::new(AppShared {
                dom,
                config,
                crash,
                scheduler: Scheduler::new(),
                stores: RefCell::new(StoreMap::default()),
            }),
        }
    }

    #[must_use]
    pub fn dom(&self) -> &Dom {
        &self.shared.dom
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn crash_collector(&self) -> &CrashCollector {
        &self.shared.crash
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    /// Register a global store, replacing any previous store of that type.
    pub fn provide_store<S: 'static>(&self, store: S) {
        self.provide_store_rc(Rc::new(store));
    }

    pub(crate) fn provide_store_rc(&self, store: Rc<dyn Any>) {
        let id = (*store).type_id();
        self.shared.stores.borrow_mut().insert(id, store);
    }

    #[must_use]
    pub fn store<S: 'static>(&self) -> Option<Rc<S>> {
        downcast_store(&self.shared.stores.borrow())
    }
}

/// One level of view-provided stores.
pub(crate) struct StoreScope {
    pub(crate) stores: StoreMap,
    pub(crate) parent: Option<Rc<StoreScope>>,
}

/// Children handed to a view, with the context they were declared in.
pub(crate) struct Projection {
    pub(crate) children: Vec<Markup>,
    pub(crate) declared_in: ElementContext,
}

/// Lexically scoped state.
#[derive(Clone, Default)]
pub struct ElementContext {
    pub(crate) stores: Option<Rc<StoreScope>>,
    pub(crate) projection: Option<Rc<Projection>>,
}

impl fmt::Debug for ElementContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementContext")
            .field("scoped_stores", &self.stores.is_some())
            .field(
                "projected",
                &self.projection.as_ref().map_or(0, |p| p.children.len()),
            )
            .finish()
    }
}

impl ElementContext {
    pub(crate) fn find_store<S: 'static>(&self) -> Option<Rc<S>> {
        let mut scope = self.stores.as_ref();
        while let Some(current) = scope {
            if let Some(store) = downcast_store::<S>(&current.stores) {
                return Some(store);
            }
            scope = current.parent.as_ref();
        }
        None
    }
}

/// Everything `init` needs.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub app: AppContext,
    pub element: ElementContext,
}

impl RenderContext {
    /// A root context with an empty lexical chain.
    #[must_use]
    pub fn new(app: AppContext) -> Self {
        Self {
            app,
            element: ElementContext::default(),
        }
    }

    /// A fresh document and app with default config; handy for tests.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(AppContext::new(Dom::new(), RenderConfig::default()))
    }

    #[must_use]
    pub fn dom(&self) -> &Dom {
        self.app.dom()
    }

    /// Look `S` up in the lexical chain, then among global stores.
    ///
    /// # Errors
    ///
    /// [`RenderError::StoreNotFound`].
    pub fn use_store<S: 'static>(&self) -> Result<Rc<S>> {
        self.element
            .find_store::<S>()
            .or_else(|| self.app.store::<S>())
            .ok_or(RenderError::StoreNotFound {
                type_name: std::any::type_name::<S>(),
            })
    }
}
