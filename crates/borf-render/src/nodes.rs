#![forbid(unsafe_code)]

//! Static handles: elements, text and fragments.

use borf_dom::{Dom, Event, ListenerId, NodeId};
use borf_reactive::{Readable, Subscription};
use smallvec::SmallVec;

use crate::attributes::{Attributes, Binding, validate};
use crate::connectable::{Anchors, Connectable, connect_sequence};
use crate::context::RenderContext;
use crate::crash::CrashCollector;
use crate::error::Result;
use crate::markup::Markup;

/// Run a DOM write from inside a subscription, reporting failures.
fn write_or_report(crash: &CrashCollector, origin: &str, result: borf_dom::error::Result<()>) {
    if let Err(err) = result {
        crash.report(err.into(), origin);
    }
}

// ─── Element ────────────────────────────────────────────────────────────────

/// One owned element, its attribute bindings and its children.
pub(crate) struct ElementHandle {
    dom: Dom,
    crash: CrashCollector,
    node: NodeId,
    children: SmallVec<[Box<dyn Connectable>; 4]>,
    bindings: Vec<Binding>,
    subscriptions: Vec<Subscription>,
    listeners: Vec<ListenerId>,
}

impl ElementHandle {
    pub(crate) fn new(
        ctx: &RenderContext,
        tag: &str,
        attrs: &Attributes,
        children: &[Markup],
    ) -> Result<Self> {
        let dom = ctx.dom().clone();
        // Built first so an early return releases the node.
        let mut handle = Self {
            node: dom.create_element(tag),
            dom,
            crash: ctx.app.crash_collector().clone(),
            children: SmallVec::new(),
            bindings: Vec::new(),
            subscriptions: Vec::new(),
            listeners: Vec::new(),
        };
        for (name, value) in attrs.iter() {
            match validate(name, value)? {
                Some(Binding::Static(name, value)) => {
                    handle.dom.set_attribute(handle.node, &name, value)?;
                }
                Some(binding) => handle.bindings.push(binding),
                None => {}
            }
        }
        for child in children {
            handle.children.push(child.init(ctx)?);
        }
        Ok(handle)
    }

    fn bind(&mut self) -> Result<()> {
        let node = self.node;
        for binding in &self.bindings {
            let (dom, crash) = (self.dom.clone(), self.crash.clone());
            match binding {
                Binding::Static(..) => {}
                Binding::Bound(name, source) => {
                    let name = name.clone();
                    self.subscriptions.push(source.observe(move |value: &String| {
                        let result = dom.set_attribute(node, &name, value.clone());
                        write_or_report(&crash, "attribute", result);
                    }));
                }
                Binding::BoundBool(name, source) => {
                    let name = name.clone();
                    self.subscriptions.push(source.observe(move |present: &bool| {
                        let result = if *present {
                            dom.set_attribute(node, &name, "")
                        } else {
                            dom.remove_attribute(node, &name)
                        };
                        write_or_report(&crash, "attribute", result);
                    }));
                }
                Binding::TwoWay(name, writable) => {
                    let name = name.clone();
                    self.subscriptions.push(writable.observe(move |value: &String| {
                        let result = dom.set_attribute(node, &name, value.clone());
                        write_or_report(&crash, "two-way", result);
                    }));
                    for event in ["input", "change"] {
                        let writable = writable.clone();
                        let id = self.dom.add_event_listener(node, event, move |e: &Event| {
                            if let Some(value) = e.value() {
                                writable.set(value.to_owned());
                            }
                        })?;
                        self.listeners.push(id);
                    }
                }
                Binding::Handler(event, handler) => {
                    let handler = std::rc::Rc::clone(handler);
                    let id = self
                        .dom
                        .add_event_listener(node, event.as_str(), move |e: &Event| handler(e))?;
                    self.listeners.push(id);
                }
            }
        }
        Ok(())
    }
}

impl Connectable for ElementHandle {
    fn connect(&mut self, parent: NodeId, after: Option<NodeId>) -> Result<()> {
        if self.is_connected() {
            self.dom.insert_after(parent, self.node, after)?;
            return Ok(());
        }
        self.dom.insert_after(parent, self.node, after)?;
        connect_sequence(self.children.iter_mut(), self.node, None)?;
        self.bind()?;
        tracing::trace!(node = self.node.raw(), "element.connect");
        Ok(())
    }

    fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.subscriptions.clear();
        for id in self.listeners.drain(..) {
            self.dom.remove_event_listener(self.node, id);
        }
        let _ = self.dom.remove(self.node);
        for child in &mut self.children {
            child.disconnect();
        }
        tracing::trace!(node = self.node.raw(), "element.disconnect");
    }

    fn is_connected(&self) -> bool {
        self.dom.parent(self.node).is_some()
    }

    fn first_node(&self) -> NodeId {
        self.node
    }

    fn last_node(&self) -> NodeId {
        self.node
    }
}

impl Drop for ElementHandle {
    fn drop(&mut self) {
        self.dom.release(self.node);
    }
}

// ─── Text ───────────────────────────────────────────────────────────────────

pub(crate) struct TextHandle {
    dom: Dom,
    crash: CrashCollector,
    node: NodeId,
    source: Option<Readable<String>>,
    subscription: Option<Subscription>,
}

impl TextHandle {
    fn new(ctx: &RenderContext, text: &str, source: Option<Readable<String>>) -> Self {
        let dom = ctx.dom().clone();
        let node = dom.create_text(text);
        Self {
            dom,
            crash: ctx.app.crash_collector().clone(),
            node,
            source,
            subscription: None,
        }
    }

    pub(crate) fn fixed(ctx: &RenderContext, text: &str) -> Self {
        Self::new(ctx, text, None)
    }

    pub(crate) fn bound(ctx: &RenderContext, source: &Readable<String>) -> Self {
        Self::new(ctx, "", Some(source.clone()))
    }
}

impl Connectable for TextHandle {
    fn connect(&mut self, parent: NodeId, after: Option<NodeId>) -> Result<()> {
        let fresh = !self.is_connected();
        self.dom.insert_after(parent, self.node, after)?;
        if fresh && let Some(source) = &self.source {
            let (dom, crash, node) = (self.dom.clone(), self.crash.clone(), self.node);
            self.subscription = Some(source.observe(move |text: &String| {
                write_or_report(&crash, "text", dom.set_text(node, text.clone()));
            }));
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.subscription = None;
        let _ = self.dom.remove(self.node);
    }

    fn is_connected(&self) -> bool {
        self.dom.parent(self.node).is_some()
    }

    fn first_node(&self) -> NodeId {
        self.node
    }

    fn last_node(&self) -> NodeId {
        self.node
    }
}

impl Drop for TextHandle {
    fn drop(&mut self) {
        self.dom.release(self.node);
    }
}

// ─── Fragment ───────────────────────────────────────────────────────────────

/// A static list of children between two anchors. Also backs outlets that
/// project a view's declared children.
pub(crate) struct FragmentHandle {
    anchors: Anchors,
    children: Vec<Box<dyn Connectable>>,
}

impl FragmentHandle {
    /// `ctx` supplies the document; `children_ctx` is the context the
    /// children are initialized in.
    pub(crate) fn new(
        ctx: &RenderContext,
        kind: &str,
        children: &[Markup],
        children_ctx: &RenderContext,
    ) -> Result<Self> {
        let children = children
            .iter()
            .map(|child| child.init(children_ctx))
            .collect::<Result<_>>()?;
        let anchors = Anchors::new(ctx.dom(), kind, ctx.app.config().debug_anchors);
        Ok(Self { anchors, children })
    }
}

impl Connectable for FragmentHandle {
    fn connect(&mut self, parent: NodeId, after: Option<NodeId>) -> Result<()> {
        if self.is_connected() {
            return self.anchors.move_to(parent, after);
        }
        self.anchors.insert(parent, after)?;
        connect_sequence(self.children.iter_mut(), parent, Some(self.anchors.start))?;
        Ok(())
    }

    fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        for child in &mut self.children {
            child.disconnect();
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

impl Drop for FragmentHandle {
    fn drop(&mut self) {
        self.anchors.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttrValue;
    use borf_reactive::Writable;
    use std::cell::Cell;
    use std::rc::Rc;

    fn mount(markup: &Markup) -> (RenderContext, Box<dyn Connectable>) {
        let ctx = RenderContext::detached();
        let mut handle = markup.init(&ctx).unwrap();
        handle.connect(ctx.dom().body(), None).unwrap();
        (ctx, handle)
    }

    fn html(ctx: &RenderContext) -> String {
        ctx.dom().inner_html(ctx.dom().body())
    }

    #[test]
    fn bound_attributes_follow_their_source() {
        let title = Writable::new("a".to_string());
        let hidden = Writable::new(false);
        let markup = Markup::element("span")
            .attr("title", title.readable())
            .attr("hidden", hidden.readable());
        let (ctx, _handle) = mount(&markup);
        assert_eq!(html(&ctx), r#"<span title="a"></span>"#);

        title.set("b".into());
        hidden.set(true);
        assert_eq!(html(&ctx), r#"<span title="b" hidden=""></span>"#);
    }

    #[test]
    fn disconnect_stops_bindings() {
        let text = Writable::new("x".to_string());
        let markup = Markup::element("p").child(text.readable());
        let (ctx, mut handle) = mount(&markup);
        assert_eq!(text.observer_count(), 1);

        handle.disconnect();
        assert_eq!(text.observer_count(), 0);
        assert_eq!(html(&ctx), "");
        handle.disconnect();
        assert!(!handle.is_connected());
    }

    #[test]
    fn two_way_binding_syncs_both_directions() {
        let name = Writable::new("ada".to_string());
        let markup = Markup::element("input").attr("$$value", name.clone());
        let (ctx, handle) = mount(&markup);
        let input = handle.first_node();
        assert_eq!(ctx.dom().attribute(input, "value").as_deref(), Some("ada"));

        ctx.dom()
            .dispatch_event(input, &Event::new("input").with_value("grace"))
            .unwrap();
        assert_eq!(name.get(), "grace");
        assert_eq!(ctx.dom().attribute(input, "value").as_deref(), Some("grace"));

        name.set("linus".into());
        assert_eq!(ctx.dom().attribute(input, "value").as_deref(), Some("linus"));
    }

    #[test]
    fn handlers_are_native_listeners() {
        let clicks = Rc::new(Cell::new(0));
        let clicks_clone = Rc::clone(&clicks);
        let markup = Markup::element("button")
            .attr("onclick", AttrValue::handler(move |_| clicks_clone.set(clicks_clone.get() + 1)));
        let (ctx, mut handle) = mount(&markup);
        let button = handle.first_node();
        assert_eq!(ctx.dom().listener_count(button), 1);

        ctx.dom().dispatch_event(button, &Event::new("click")).unwrap();
        assert_eq!(clicks.get(), 1);

        handle.disconnect();
        assert_eq!(ctx.dom().listener_count(button), 0);
    }

    #[test]
    fn reconnecting_rebinds() {
        let text = Writable::new("one".to_string());
        let markup = Markup::element("p").child(text.readable());
        let (ctx, mut handle) = mount(&markup);
        handle.disconnect();
        text.set("two".into());
        handle.connect(ctx.dom().body(), None).unwrap();
        assert_eq!(html(&ctx), "<p>two</p>");
    }

    #[test]
    fn fragment_connects_children_in_order_and_moves_as_one() {
        let ctx = RenderContext::detached();
        let dom = ctx.dom().clone();
        let mut head = Markup::element("h1").init(&ctx).unwrap();
        let mut frag = Markup::fragment([Markup::text("a"), Markup::text("b")])
            .init(&ctx)
            .unwrap();
        frag.connect(dom.body(), None).unwrap();
        head.connect(dom.body(), None).unwrap();
        assert_eq!(dom.inner_html(dom.body()), "ab<h1></h1>");

        frag.connect(dom.body(), Some(head.last_node())).unwrap();
        assert_eq!(dom.inner_html(dom.body()), "<h1></h1>ab");
    }
}
