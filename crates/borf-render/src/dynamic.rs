#![forbid(unsafe_code)]

//! Re-render a region whenever a source readable changes.
//!
//! # Invariants
//!
//! 1. At most one rendered subtree lives between the anchors.
//! 2. The previous subtree is fully disconnected before its replacement is
//!    initialized and connected.
//! 3. A render error leaves the region empty and is reported; the handle
//!    keeps listening and the next change renders again.
//! 4. An update arriving while the same handle is mid-update (a render that
//!    sets its own source) is not lost: the region renders again from the
//!    source's latest value once the current pass finishes. A source that
//!    keeps changing for [`MAX_CATCH_UP_PASSES`] passes is reported as
//!    [`RenderError::Reentrant`] and the region keeps its last render.
//! 5. Dropping the handle releases its anchors and its content.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use borf_dom::NodeId;
use borf_reactive::{Readable, Subscription, merge_all, merge2};

use crate::connectable::{Anchors, Connectable, MAX_CATCH_UP_PASSES};
use crate::context::RenderContext;
use crate::error::{RenderError, Result};
use crate::markup::{Markup, Template};
use crate::renderable::Renderable;

type RenderFn<T> = Rc<dyn Fn(&T) -> Result<Renderable>>;

struct DynamicTemplate<T> {
    kind: &'static str,
    source: Readable<T>,
    render: RenderFn<T>,
}

impl<T: 'static> Template for DynamicTemplate<T> {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn init(&self, ctx: &RenderContext) -> Result<Box<dyn Connectable>> {
        Ok(Box::new(DynamicHandle {
            kind: self.kind,
            anchors: Anchors::new(ctx.dom(), self.kind, ctx.app.config().debug_anchors),
            ctx: ctx.clone(),
            source: self.source.clone(),
            render: Rc::clone(&self.render),
            current: Rc::new(RefCell::new(None)),
            subscription: None,
        }))
    }
}

/// Markup for a region driven by a single readable and a render function.
pub(crate) fn dynamic_markup<T: 'static>(
    kind: &'static str,
    source: &Readable<T>,
    render: impl Fn(&T) -> Result<Renderable> + 'static,
) -> Markup {
    Markup::template(DynamicTemplate {
        kind,
        source: source.clone(),
        render: Rc::new(render),
    })
}

/// Render `source` through `render`, again on every change.
pub fn dynamic<T, R>(source: &Readable<T>, render: impl Fn(&T) -> R + 'static) -> Markup
where
    T: 'static,
    R: Into<Renderable>,
{
    dynamic_markup("dynamic", source, move |value| Ok(render(value).into()))
}

/// Like [`dynamic`] with a fallible render function; errors are reported
/// through the crash collector and the region renders nothing.
pub fn try_dynamic<T: 'static>(
    source: &Readable<T>,
    render: impl Fn(&T) -> Result<Renderable> + 'static,
) -> Markup {
    dynamic_markup("dynamic", source, render)
}

/// Render from two sources; re-renders when either changes.
pub fn dynamic2<A, B, R>(
    a: &Readable<A>,
    b: &Readable<B>,
    render: impl Fn(&A, &B) -> R + 'static,
) -> Markup
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
    R: Into<Renderable>,
{
    let pair = merge2(a, b, |a, b| (a.clone(), b.clone()));
    dynamic_markup("dynamic", &pair, move |(a, b)| Ok(render(a, b).into()))
}

/// Render from any number of same-typed sources; re-renders when one
/// changes.
///
/// # Errors
///
/// [`RenderError::Reactive`] when `sources` is empty.
pub fn dynamic_all<T, R>(
    sources: &[Readable<T>],
    render: impl Fn(&[T]) -> R + 'static,
) -> Result<Markup>
where
    T: Clone + PartialEq + 'static,
    R: Into<Renderable>,
{
    let values = merge_all(sources.to_vec(), |values: &[T]| values.to_vec())?;
    Ok(dynamic_markup("dynamic", &values, move |values: &Vec<T>| {
        Ok(render(values).into())
    }))
}

/// Project a changing list of markup.
pub fn outlet(children: &Readable<Vec<Markup>>) -> Markup {
    dynamic_markup("outlet", children, |children| {
        Ok(Renderable::Markup(Markup::fragment(children.iter().cloned())))
    })
}

pub(crate) struct DynamicHandle<T> {
    kind: &'static str,
    anchors: Anchors,
    ctx: RenderContext,
    source: Readable<T>,
    render: RenderFn<T>,
    current: Rc<RefCell<Option<Box<dyn Connectable>>>>,
    subscription: Option<Subscription>,
}

/// Swap the region's content for a fresh render of `value`.
fn rerender<T>(
    kind: &'static str,
    anchors: &Anchors,
    ctx: &RenderContext,
    render: &RenderFn<T>,
    current: &mut Option<Box<dyn Connectable>>,
    value: &T,
) -> Result<()> {
    let _span = tracing::debug_span!("dynamic.render", kind).entered();
    if let Some(mut old) = current.take() {
        old.disconnect();
    }
    let Some(parent) = anchors.parent() else {
        return Ok(());
    };
    let mut handle = render(value)?.into_markup().init(ctx)?;
    handle.connect(parent, Some(anchors.start))?;
    *current = Some(handle);
    Ok(())
}

impl<T: 'static> Connectable for DynamicHandle<T> {
    fn connect(&mut self, parent: NodeId, after: Option<NodeId>) -> Result<()> {
        if self.is_connected() {
            return self.anchors.move_to(parent, after);
        }
        self.anchors.insert(parent, after)?;

        let kind = self.kind;
        let anchors = self.anchors.clone();
        let ctx = self.ctx.clone();
        let render = Rc::clone(&self.render);
        let current = Rc::clone(&self.current);
        let source = self.source.clone();
        let dirty = Rc::new(Cell::new(false));
        // The first notification is the replay, which renders initial content.
        self.subscription = Some(self.source.observe(move |value: &T| {
            let crash = ctx.app.crash_collector();
            let Ok(mut slot) = current.try_borrow_mut() else {
                // Raised by our own render; picked up below once it returns.
                dirty.set(true);
                return;
            };
            if let Err(err) = rerender(kind, &anchors, &ctx, &render, &mut slot, value) {
                crash.report(err, kind);
            }
            let mut passes = 0;
            while dirty.replace(false) {
                if passes == MAX_CATCH_UP_PASSES {
                    crash.report(RenderError::Reentrant { handle: kind }, kind);
                    break;
                }
                passes += 1;
                let latest = source.get();
                if let Err(err) = rerender(kind, &anchors, &ctx, &render, &mut slot, &latest) {
                    crash.report(err, kind);
                }
            }
        }));
        tracing::trace!(kind, "dynamic.connect");
        Ok(())
    }

    fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.subscription = None;
        match self.current.try_borrow_mut() {
            Ok(mut slot) => {
                if let Some(mut content) = slot.take() {
                    content.disconnect();
                }
            }
            Err(_) => self.ctx.app.crash_collector().report(
                RenderError::Reentrant { handle: self.kind },
                self.kind,
            ),
        }
        self.anchors.remove();
        tracing::trace!(kind = self.kind, "dynamic.disconnect");
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

impl<T> Drop for DynamicHandle<T> {
    fn drop(&mut self) {
        self.anchors.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use borf_reactive::Writable;

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
    fn rerenders_on_change() {
        let count = Writable::new(1);
        let (ctx, _handle) = mount(&dynamic(&count.readable(), |n| {
            Markup::element("b").child(format!("{n}"))
        }));
        assert_eq!(html(&ctx), "<b>1</b>");
        count.set(2);
        assert_eq!(html(&ctx), "<b>2</b>");
    }

    #[test]
    fn stays_between_siblings() {
        let ctx = RenderContext::detached();
        let dom = ctx.dom().clone();
        let word = Writable::new("mid".to_string());
        let markup = Markup::element("p").children([
            Markup::text("["),
            dynamic(&word.readable(), |w| w.clone()),
            Markup::text("]"),
        ]);
        let mut handle = markup.init(&ctx).unwrap();
        handle.connect(dom.body(), None).unwrap();
        word.set("changed".into());
        assert_eq!(dom.inner_html(dom.body()), "<p>[changed]</p>");
    }

    #[test]
    fn old_subtree_is_torn_down_first() {
        let flag = Writable::new(0);
        let inner = Writable::new("x".to_string());
        let inner_readable = inner.readable();
        let (ctx, _handle) = mount(&dynamic(&flag.readable(), move |n| {
            Markup::element("i").child(format!("{n}")).child(inner_readable.clone())
        }));
        assert_eq!(inner.observer_count(), 1);
        flag.set(1);
        assert_eq!(inner.observer_count(), 1);
        assert_eq!(html(&ctx), "<i>1x</i>");
    }

    #[test]
    fn render_errors_are_reported_and_recovered() {
        let n = Writable::new(1);
        let (ctx, _handle) = mount(&try_dynamic(&n.readable(), |n| {
            if *n < 0 {
                Err(RenderError::msg("negative"))
            } else {
                Ok(n.to_string().into())
            }
        }));
        n.set(-1);
        assert_eq!(html(&ctx), "");
        let reports = ctx.app.crash_collector().reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].message(), "negative");
        assert!(!ctx.app.crash_collector().is_crashed());

        n.set(3);
        assert_eq!(html(&ctx), "3");
    }

    #[test]
    fn render_that_sets_its_source_settles_on_the_latest_value() {
        let n = Writable::new(0);
        let writer = n.clone();
        let (ctx, _handle) = mount(&dynamic(&n.readable(), move |v| {
            if *v == 1 {
                writer.set(2);
            }
            v.to_string()
        }));
        n.set(1);
        assert_eq!(html(&ctx), "2");
        assert_eq!(n.get(), 2);
        assert!(ctx.app.crash_collector().reports().is_empty());
    }

    #[test]
    fn render_that_never_settles_is_reported() {
        let n = Writable::new(0);
        let writer = n.clone();
        let (ctx, _handle) = mount(&dynamic(&n.readable(), move |v| {
            if *v > 0 {
                writer.set(v + 1);
            }
            v.to_string()
        }));
        n.set(1);
        let reports = ctx.app.crash_collector().reports();
        assert_eq!(reports.len(), 1);
        assert!(matches!(*reports[0].error, RenderError::Reentrant { handle: "dynamic" }));
        // One render per pass: the initial one plus every catch-up pass.
        assert_eq!(html(&ctx), (MAX_CATCH_UP_PASSES + 1).to_string());
    }

    #[test]
    fn repeated_updates_reuse_node_slots() {
        let n = Writable::new(0);
        let (ctx, _handle) = mount(&dynamic(&n.readable(), |i| {
            Markup::element("b").child(i.to_string())
        }));
        // body, two anchors, <b> and its text.
        assert_eq!(ctx.dom().node_count(), 5);
        for i in 1..=10_000 {
            n.set(i);
        }
        assert_eq!(html(&ctx), "<b>10000</b>");
        assert_eq!(ctx.dom().node_count(), 5);
    }

    #[test]
    fn dropping_the_handle_frees_its_nodes() {
        let n = Writable::new(0);
        let (ctx, handle) = mount(&dynamic(&n.readable(), |i| {
            Markup::element("b").child(i.to_string())
        }));
        drop(handle);
        assert_eq!(html(&ctx), "");
        assert_eq!(ctx.dom().node_count(), 1);
        assert_eq!(n.observer_count(), 0);
    }

    #[test]
    fn dynamic2_reads_both() {
        let a = Writable::new(1);
        let b = Writable::new("x".to_string());
        let (ctx, _handle) = mount(&dynamic2(&a.readable(), &b.readable(), |a, b| {
            format!("{a}{b}")
        }));
        a.set(2);
        b.set("y".into());
        assert_eq!(html(&ctx), "2y");
    }

    #[test]
    fn dynamic_all_reads_every_source() {
        let parts: Vec<Writable<u32>> = (1..=3).map(Writable::new).collect();
        let readables: Vec<_> = parts.iter().map(Writable::readable).collect();
        let markup = dynamic_all(&readables, |v| v.iter().sum::<u32>().to_string()).unwrap();
        let (ctx, _handle) = mount(&markup);
        assert_eq!(html(&ctx), "6");
        parts[2].set(10);
        assert_eq!(html(&ctx), "13");
    }

    #[test]
    fn dynamic_all_needs_a_source() {
        let err = dynamic_all(&[] as &[Readable<u32>], |v| v.len().to_string()).err();
        assert!(matches!(
            err,
            Some(RenderError::Reactive(borf_reactive::ReactiveError::EmptySources))
        ));
    }

    #[test]
    fn outlet_projects_changing_children() {
        let items = Writable::new(vec![Markup::text("a")]);
        let (ctx, _handle) = mount(&outlet(&items.readable()));
        items.update(|list| list.push(Markup::element("hr")));
        assert_eq!(html(&ctx), "a<hr>");
    }

    #[test]
    fn disconnect_is_idempotent_and_unsubscribes() {
        let n = Writable::new(0);
        let (ctx, mut handle) = mount(&dynamic(&n.readable(), |n| n.to_string()));
        handle.disconnect();
        handle.disconnect();
        assert_eq!(n.observer_count(), 0);
        assert_eq!(ctx.dom().debug_html(ctx.dom().body()), "");
    }
}
