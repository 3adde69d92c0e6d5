#![forbid(unsafe_code)]

//! Views: user functions that set up state and return what to render.
//!
//! A view runs once per [`Markup::init`]. Everything it needs arrives through
//! the [`ViewContext`] it is handed: its attributes and children, store
//! lookup and provision, and hooks tied to the lifetime of the handle.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use borf_dom::NodeId;
use borf_reactive::{Readable, Subscription};

use crate::attributes::Attributes;
use crate::connectable::{Anchors, Connectable};
use crate::context::{
    ElementContext, Projection, RenderContext, StoreMap, StoreScope, downcast_store,
};
use crate::crash::CrashCollector;
use crate::error::{RenderError, Result};
use crate::markup::Markup;
use crate::renderable::Renderable;

type ViewFn = dyn Fn(&mut ViewContext<'_>) -> Result<Renderable>;
type Hook = Box<dyn FnMut() -> Result<()>>;
type Starter = Box<dyn Fn() -> Subscription>;

/// A named view function.
#[derive(Clone)]
pub struct View {
    name: Rc<str>,
    render: Rc<ViewFn>,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("View").field(&self.name).finish()
    }
}

impl View {
    pub fn new(
        name: impl Into<String>,
        render: impl Fn(&mut ViewContext<'_>) -> Result<Renderable> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name.into()),
            render: Rc::new(render),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handed to a view function while it sets up.
pub struct ViewContext<'a> {
    name: &'a str,
    attrs: &'a Attributes,
    ctx: &'a RenderContext,
    provided: StoreMap,
    starters: Vec<Starter>,
    on_connected: Vec<Hook>,
    on_disconnected: Vec<Hook>,
}

impl<'a> ViewContext<'a> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    #[must_use]
    pub fn attrs(&self) -> &Attributes {
        self.attrs
    }

    /// Markup projecting the children this view was given.
    #[must_use]
    pub fn children(&self) -> Markup {
        Markup::outlet()
    }

    #[must_use]
    pub fn app(&self) -> &crate::context::AppContext {
        &self.ctx.app
    }

    /// Make `store` visible to this view's subtree.
    pub fn provide_store<S: 'static>(&mut self, store: S) -> Rc<S> {
        let store = Rc::new(store);
        let erased: Rc<dyn Any> = Rc::clone(&store) as Rc<dyn Any>;
        self.provided.insert(std::any::TypeId::of::<S>(), erased);
        store
    }

    /// Nearest store of type `S`: this view's own, then enclosing views',
    /// then the app's globals.
    ///
    /// # Errors
    ///
    /// [`RenderError::StoreNotFound`].
    pub fn use_store<S: 'static>(&self) -> Result<Rc<S>> {
        if let Some(store) = downcast_store::<S>(&self.provided) {
            return Ok(store);
        }
        self.ctx.use_store::<S>()
    }

    /// Observe `source` while this view is connected.
    pub fn observe<T: 'static>(&mut self, source: &Readable<T>, callback: impl Fn(&T) + 'static) {
        let source = source.clone();
        let callback = Rc::new(callback);
        self.starters.push(Box::new(move || {
            let callback = Rc::clone(&callback);
            source.observe(move |value| callback(value))
        }));
    }

    /// Run after the view's content is first connected. An `Err` crashes
    /// the app.
    pub fn on_connected(&mut self, hook: impl FnMut() -> Result<()> + 'static) {
        self.on_connected.push(Box::new(hook));
    }

    /// Run after the view's content is disconnected. An `Err` crashes the
    /// app.
    pub fn on_disconnected(&mut self, hook: impl FnMut() -> Result<()> + 'static) {
        self.on_disconnected.push(Box::new(hook));
    }

    /// Record a non-fatal failure.
    pub fn report(&self, error: RenderError) {
        self.ctx.app.crash_collector().report(error, self.name);
    }

    /// Record a fatal failure; the app shows its crash view.
    pub fn crash(&self, error: RenderError) {
        self.ctx.app.crash_collector().crash(error, self.name);
    }
}

/// Live view: anchors around the rendered content plus lifecycle state.
pub(crate) struct ViewHandle {
    name: Rc<str>,
    anchors: Anchors,
    content: Box<dyn Connectable>,
    crash: CrashCollector,
    starters: Vec<Starter>,
    subscriptions: Vec<Subscription>,
    on_connected: Vec<Hook>,
    on_disconnected: Vec<Hook>,
}

impl ViewHandle {
    pub(crate) fn new(
        ctx: &RenderContext,
        view: &View,
        attrs: &Attributes,
        children: &[Markup],
    ) -> Result<Self> {
        let _span = tracing::debug_span!("view.setup", view = %view.name).entered();
        let mut setup = ViewContext {
            name: &view.name,
            attrs,
            ctx,
            provided: StoreMap::default(),
            starters: Vec::new(),
            on_connected: Vec::new(),
            on_disconnected: Vec::new(),
        };
        let rendered = (view.render)(&mut setup).map_err(|err| match err {
            err @ RenderError::ViewFailed { .. } => err,
            other => RenderError::ViewFailed {
                view: view.name.to_string(),
                message: other.to_string(),
            },
        })?;
        let ViewContext {
            provided,
            starters,
            on_connected,
            on_disconnected,
            ..
        } = setup;

        let stores = if provided.is_empty() {
            ctx.element.stores.clone()
        } else {
            Some(Rc::new(StoreScope {
                stores: provided,
                parent: ctx.element.stores.clone(),
            }))
        };
        let projection = Rc::new(Projection {
            children: children.to_vec(),
            declared_in: ctx.element.clone(),
        });
        let inner = RenderContext {
            app: ctx.app.clone(),
            element: ElementContext {
                stores,
                projection: Some(projection),
            },
        };
        let content = rendered.into_markup().init(&inner)?;

        Ok(Self {
            name: Rc::clone(&view.name),
            anchors: Anchors::new(ctx.dom(), &view.name, ctx.app.config().debug_anchors),
            content,
            crash: ctx.app.crash_collector().clone(),
            starters,
            subscriptions: Vec::new(),
            on_connected,
            on_disconnected,
        })
    }

    fn run_hooks(hooks: &mut [Hook], crash: &CrashCollector, name: &str) {
        for hook in hooks {
            if let Err(err) = hook() {
                crash.crash(err, name);
            }
        }
    }
}

impl Connectable for ViewHandle {
    fn connect(&mut self, parent: NodeId, after: Option<NodeId>) -> Result<()> {
        if self.is_connected() {
            return self.anchors.move_to(parent, after);
        }
        self.anchors.insert(parent, after)?;
        self.content.connect(parent, Some(self.anchors.start))?;
        self.subscriptions = self.starters.iter().map(|start| start()).collect();
        tracing::trace!(view = %self.name, "view.connect");
        Self::run_hooks(&mut self.on_connected, &self.crash, &self.name);
        Ok(())
    }

    fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.subscriptions.clear();
        self.content.disconnect();
        self.anchors.remove();
        tracing::trace!(view = %self.name, "view.disconnect");
        Self::run_hooks(&mut self.on_disconnected, &self.crash, &self.name);
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

impl Drop for ViewHandle {
    fn drop(&mut self) {
        self.anchors.release();
    }
}
