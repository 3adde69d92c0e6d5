#![forbid(unsafe_code)]

//! Application root: owns the mounted tree and handles crashes.
//!
//! A crash (fatal report) never tears the tree down from inside the
//! notification that raised it. The crash handler queues a task on the
//! app's [`Scheduler`](crate::Scheduler); when pending work next runs, the
//! root is disconnected and the crash view connected in its place.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use borf_dom::{Dom, Event, NodeId};

use crate::config::RenderConfig;
use crate::connectable::Connectable;
use crate::context::{AppContext, RenderContext};
use crate::crash::{CrashCollector, CrashReport};
use crate::error::Result;
use crate::markup::Markup;

type CrashView = Rc<dyn Fn(&CrashReport) -> Markup>;

fn default_crash_view(report: &CrashReport) -> Markup {
    Markup::element("div")
        .attr("class", "borf-crash")
        .child(Markup::element("strong").child("Something went wrong"))
        .child(Markup::element("pre").child(report.to_string()))
}

struct Mounted {
    ctx: AppContext,
    parent: NodeId,
    /// Taken while the crash view replaces it.
    root: Option<Box<dyn Connectable>>,
    crash_view: Option<Box<dyn Connectable>>,
}

struct AppState {
    markup: Markup,
    config: RenderConfig,
    stores: Vec<Rc<dyn Any>>,
    crash_view: CrashView,
    mounted: Option<Mounted>,
}

/// A mountable application.
#[derive(Clone)]
pub struct App {
    state: Rc<RefCell<AppState>>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("App")
            .field("root", &state.markup)
            .field("mounted", &state.mounted.is_some())
            .finish()
    }
}

impl App {
    #[must_use]
    pub fn new(markup: Markup) -> Self {
        Self {
            state: Rc::new(RefCell::new(AppState {
                markup,
                config: RenderConfig::default(),
                stores: Vec::new(),
                crash_view: Rc::new(default_crash_view),
                mounted: None,
            })),
        }
    }

    /// Register a global store for the next mount.
    #[must_use]
    pub fn with_store<S: 'static>(self, store: S) -> Self {
        self.state.borrow_mut().stores.push(Rc::new(store));
        self
    }

    #[must_use]
    pub fn with_config(self, config: RenderConfig) -> Self {
        self.state.borrow_mut().config = config;
        self
    }

    /// Replace the markup shown after a crash.
    #[must_use]
    pub fn with_crash_view(self, view: impl Fn(&CrashReport) -> Markup + 'static) -> Self {
        self.state.borrow_mut().crash_view = Rc::new(view);
        self
    }

    /// Build the tree and connect it as the last child of `parent`, then run
    /// pending tasks. Mounting a mounted app remounts it.
    ///
    /// # Errors
    ///
    /// Construction and connection errors from the root markup.
    pub fn mount(&self, dom: &Dom, parent: NodeId) -> Result<()> {
        self.unmount();
        let (markup, ctx) = {
            let state = self.state.borrow();
            let ctx = AppContext::new(dom.clone(), state.config.clone());
            for store in &state.stores {
                ctx.provide_store_rc(Rc::clone(store));
            }
            (state.markup.clone(), ctx)
        };
        install_crash_handler(&ctx, Rc::downgrade(&self.state));

        let _span = tracing::debug_span!("app.mount").entered();
        let mut root = markup.init(&RenderContext::new(ctx.clone()))?;
        if let Err(err) = root.connect(parent, None) {
            root.disconnect();
            return Err(err);
        }
        self.state.borrow_mut().mounted = Some(Mounted {
            ctx,
            parent,
            root: Some(root),
            crash_view: None,
        });
        self.run_pending();
        Ok(())
    }

    /// Disconnect everything this app connected. Unmounted apps ignore this.
    pub fn unmount(&self) {
        let mounted = self.state.borrow_mut().mounted.take();
        if let Some(mut mounted) = mounted {
            if let Some(mut root) = mounted.root.take() {
                root.disconnect();
            }
            if let Some(mut view) = mounted.crash_view.take() {
                view.disconnect();
            }
            tracing::debug!(message = "app.unmount");
        }
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.state
            .borrow()
            .mounted
            .as_ref()
            .is_some_and(|m| m.root.as_ref().is_some_and(|root| root.is_connected()))
    }

    /// Shared context of the current mount.
    #[must_use]
    pub fn context(&self) -> Option<AppContext> {
        self.state.borrow().mounted.as_ref().map(|m| m.ctx.clone())
    }

    #[must_use]
    pub fn crash_collector(&self) -> Option<CrashCollector> {
        self.context().map(|ctx| ctx.crash_collector().clone())
    }

    /// Dispatch `event` at `target`, then run whatever the handlers queued.
    /// Returns the number of handlers that ran.
    ///
    /// # Errors
    ///
    /// [`RenderError::Dom`](crate::RenderError::Dom) for a foreign target.
    pub fn dispatch_event(&self, target: NodeId, event: &Event) -> Result<usize> {
        let Some(ctx) = self.context() else {
            return Ok(0);
        };
        let ran = ctx.dom().dispatch_event(target, event)?;
        self.run_pending();
        Ok(ran)
    }

    /// Drain the scheduler; returns how many tasks ran.
    pub fn run_pending(&self) -> usize {
        self.context().map_or(0, |ctx| ctx.scheduler().run_pending())
    }
}

fn install_crash_handler(ctx: &AppContext, state: Weak<RefCell<AppState>>) {
    let scheduler = ctx.scheduler().clone();
    ctx.crash_collector().set_handler(move |report| {
        let state = state.clone();
        let report = report.clone();
        scheduler.schedule(move || {
            if let Some(state) = state.upgrade() {
                show_crash_view(&state, &report);
            }
        });
    });
}

fn show_crash_view(state: &Rc<RefCell<AppState>>, report: &CrashReport) {
    let (mut root, ctx, parent, view) = {
        let mut state = state.borrow_mut();
        let view = Rc::clone(&state.crash_view);
        let Some(mounted) = state.mounted.as_mut() else {
            return;
        };
        let Some(root) = mounted.root.take() else {
            return;
        };
        (root, mounted.ctx.clone(), mounted.parent, view)
    };
    tracing::debug!(message = "app.crash_view", origin = %report.origin);
    root.disconnect();

    let shown = view(report)
        .init(&RenderContext::new(ctx))
        .and_then(|mut handle| {
            handle.connect(parent, None)?;
            Ok(handle)
        });
    let mut state = state.borrow_mut();
    let Some(mounted) = state.mounted.as_mut() else {
        return;
    };
    match shown {
        Ok(handle) => mounted.crash_view = Some(handle),
        Err(err) => tracing::error!(message = "app.crash_view_failed", error = %err),
    }
}
