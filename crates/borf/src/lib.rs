#![forbid(unsafe_code)]

//! borf public facade crate.
//!
//! Re-exports the reactive cells, the document model and the renderer, and
//! a prelude with the names most apps need.
//!
//! ```
//! use borf::prelude::*;
//!
//! let dom = Dom::new();
//! let name = Writable::new("world".to_string());
//! let greeting = name.map(|n| format!("hello, {n}"));
//! let app = App::new(m("p", (), [greeting.into()]));
//! app.mount(&dom, dom.body()).unwrap();
//! assert_eq!(dom.inner_html(dom.body()), "<p>hello, world</p>");
//!
//! name.set("borf".into());
//! assert_eq!(dom.inner_html(dom.body()), "<p>hello, borf</p>");
//! ```

pub use borf_dom as dom;
pub use borf_reactive as reactive;
pub use borf_render as render;

pub mod prelude {
    pub use borf_dom::{Dom, Event, NodeId};
    pub use borf_reactive::{Readable, Subscription, Writable, merge2, merge3, merge_all};
    pub use borf_render::{
        App, AttrValue, Attributes, Connectable, Markup, RenderConfig, RenderError, Renderable,
        View, ViewContext, cond, dynamic, dynamic_all, dynamic2, m, outlet, repeat, repeat_keyed,
        try_dynamic,
    };
}
