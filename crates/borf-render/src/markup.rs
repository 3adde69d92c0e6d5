#![forbid(unsafe_code)]

//! Inert descriptions of what to render.
//!
//! A [`Markup`] never holds document nodes. [`Markup::init`] turns it into a
//! fresh [`Connectable`] every time it is called, so one markup value can be
//! instantiated many times (every row of a repeat does exactly that).

use std::fmt;
use std::rc::Rc;

use borf_reactive::Readable;

use crate::attributes::{AttrValue, Attributes};
use crate::connectable::Connectable;
use crate::context::{ElementContext, RenderContext};
use crate::error::{RenderError, Result};
use crate::nodes::{ElementHandle, FragmentHandle, TextHandle};
use crate::view::{View, ViewHandle};

/// A reactive template (`cond`, `dynamic`, `repeat`, ...).
pub trait Template {
    /// Short kind label used for anchors and logs.
    fn kind(&self) -> &'static str;

    /// Build a fresh, inert handle.
    ///
    /// # Errors
    ///
    /// Template-specific construction errors.
    fn init(&self, ctx: &RenderContext) -> Result<Box<dyn Connectable>>;
}

pub(crate) enum MarkupNode {
    Element {
        tag: String,
        attrs: Attributes,
        children: Vec<Markup>,
    },
    Text(String),
    BoundText(Readable<String>),
    View {
        view: View,
        attrs: Attributes,
        children: Vec<Markup>,
    },
    Fragment(Vec<Markup>),
    Outlet,
    Template(Rc<dyn Template>),
}

/// Immutable, cheaply clonable markup tree. Equality is identity.
#[derive(Clone)]
pub struct Markup(Rc<MarkupNode>);

impl PartialEq for Markup {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            MarkupNode::Element {
                tag,
                attrs,
                children,
            } => f
                .debug_struct("Element")
                .field("tag", tag)
                .field("attrs", attrs)
                .field("children", children)
                .finish(),
            MarkupNode::Text(text) => f.debug_tuple("Text").field(text).finish(),
            MarkupNode::BoundText(_) => f.write_str("BoundText"),
            MarkupNode::View { view, children, .. } => f
                .debug_struct("View")
                .field("name", &view.name())
                .field("children", children)
                .finish(),
            MarkupNode::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            MarkupNode::Outlet => f.write_str("Outlet"),
            MarkupNode::Template(t) => f.debug_tuple("Template").field(&t.kind()).finish(),
        }
    }
}

/// What `m` builds.
#[derive(Clone)]
pub enum Tag {
    Element(String),
    View(View),
    Fragment,
    Outlet,
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self::Element(tag.to_owned())
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Self::Element(tag)
    }
}

impl From<View> for Tag {
    fn from(view: View) -> Self {
        Self::View(view)
    }
}

/// Build markup the way a template compiler would.
///
/// Fragments and outlets ignore `attrs`; outlets ignore `children` too.
pub fn m(
    tag: impl Into<Tag>,
    attrs: impl Into<Attributes>,
    children: impl IntoIterator<Item = Markup>,
) -> Markup {
    let children: Vec<Markup> = children.into_iter().collect();
    let node = match tag.into() {
        Tag::Element(tag) => MarkupNode::Element {
            tag,
            attrs: attrs.into(),
            children,
        },
        Tag::View(view) => MarkupNode::View {
            view,
            attrs: attrs.into(),
            children,
        },
        Tag::Fragment => MarkupNode::Fragment(children),
        Tag::Outlet => MarkupNode::Outlet,
    };
    Markup::from_node(node)
}

/// Tag names must start with an ASCII letter and continue with ASCII
/// alphanumerics or `-`.
fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl Markup {
    pub(crate) fn from_node(node: MarkupNode) -> Self {
        Self(Rc::new(node))
    }

    pub(crate) fn node(&self) -> &MarkupNode {
        &self.0
    }

    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self::from_node(MarkupNode::Element {
            tag: tag.into(),
            attrs: Attributes::new(),
            children: Vec::new(),
        })
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_node(MarkupNode::Text(text.into()))
    }

    /// Text that follows a readable.
    #[must_use]
    pub fn bound_text(text: &Readable<String>) -> Self {
        Self::from_node(MarkupNode::BoundText(text.clone()))
    }

    #[must_use]
    pub fn view(view: View) -> Self {
        Self::from_node(MarkupNode::View {
            view,
            attrs: Attributes::new(),
            children: Vec::new(),
        })
    }

    #[must_use]
    pub fn fragment(children: impl IntoIterator<Item = Markup>) -> Self {
        Self::from_node(MarkupNode::Fragment(children.into_iter().collect()))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::fragment([])
    }

    /// Projects the children given to the nearest enclosing view.
    #[must_use]
    pub fn outlet() -> Self {
        Self::from_node(MarkupNode::Outlet)
    }

    #[must_use]
    pub fn template(template: impl Template + 'static) -> Self {
        Self::from_node(MarkupNode::Template(Rc::new(template)))
    }

    /// Copy with one more attribute. Markup without attributes is returned
    /// unchanged.
    #[must_use]
    pub fn attr(self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.rebuild(|attrs, _| attrs.set(name, value))
    }

    /// Copy with one more child. Markup without children is returned
    /// unchanged.
    #[must_use]
    pub fn child(self, child: impl Into<Markup>) -> Self {
        let child = child.into();
        self.rebuild(|_, children| children.push(child))
    }

    #[must_use]
    pub fn children(self, more: impl IntoIterator<Item = Markup>) -> Self {
        let more: Vec<Markup> = more.into_iter().collect();
        self.rebuild(|_, children| children.extend(more))
    }

    fn rebuild(self, edit: impl FnOnce(&mut Attributes, &mut Vec<Markup>)) -> Self {
        let node = match &*self.0 {
            MarkupNode::Element {
                tag,
                attrs,
                children,
            } => {
                let (mut attrs, mut children) = (attrs.clone(), children.clone());
                edit(&mut attrs, &mut children);
                MarkupNode::Element {
                    tag: tag.clone(),
                    attrs,
                    children,
                }
            }
            MarkupNode::View {
                view,
                attrs,
                children,
            } => {
                let (mut attrs, mut children) = (attrs.clone(), children.clone());
                edit(&mut attrs, &mut children);
                MarkupNode::View {
                    view: view.clone(),
                    attrs,
                    children,
                }
            }
            MarkupNode::Fragment(children) => {
                let mut attrs = Attributes::new();
                let mut children = children.clone();
                edit(&mut attrs, &mut children);
                MarkupNode::Fragment(children)
            }
            _ => return self,
        };
        Self::from_node(node)
    }

    /// Instantiate a fresh inert handle.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidTag`], [`RenderError::InvalidAttribute`], view
    /// setup failures, and template construction errors anywhere in the tree.
    pub fn init(&self, ctx: &RenderContext) -> Result<Box<dyn Connectable>> {
        match self.node() {
            MarkupNode::Element {
                tag,
                attrs,
                children,
            } => {
                if !is_valid_tag(tag) {
                    return Err(RenderError::InvalidTag { tag: tag.clone() });
                }
                Ok(Box::new(ElementHandle::new(ctx, tag, attrs, children)?))
            }
            MarkupNode::Text(text) => Ok(Box::new(TextHandle::fixed(ctx, text))),
            MarkupNode::BoundText(text) => Ok(Box::new(TextHandle::bound(ctx, text))),
            MarkupNode::View {
                view,
                attrs,
                children,
            } => Ok(Box::new(ViewHandle::new(ctx, view, attrs, children)?)),
            MarkupNode::Fragment(children) => {
                Ok(Box::new(FragmentHandle::new(ctx, "fragment", children, ctx)?))
            }
            MarkupNode::Outlet => match &ctx.element.projection {
                Some(projection) => {
                    // Projected children see the stores in scope here, but
                    // project whatever their own declaring view was given.
                    let declared = RenderContext {
                        app: ctx.app.clone(),
                        element: ElementContext {
                            stores: ctx.element.stores.clone(),
                            projection: projection.declared_in.projection.clone(),
                        },
                    };
                    Ok(Box::new(FragmentHandle::new(
                        ctx,
                        "outlet",
                        &projection.children,
                        &declared,
                    )?))
                }
                None => Ok(Box::new(FragmentHandle::new(ctx, "outlet", &[], ctx)?)),
            },
            MarkupNode::Template(template) => {
                let _span = tracing::trace_span!("markup.init", kind = template.kind()).entered();
                template.init(ctx)
            }
        }
    }
}

impl From<&str> for Markup {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Markup {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<Readable<String>> for Markup {
    fn from(text: Readable<String>) -> Self {
        Self::bound_text(&text)
    }
}

impl From<View> for Markup {
    fn from(view: View) -> Self {
        Self::view(view)
    }
}
