#![forbid(unsafe_code)]

//! In-memory document tree targeted by the borf renderer.
//!
//! The tree supports exactly what a fine-grained renderer needs: node
//! creation, positioned insertion and moves, detachment, attribute and
//! text writes, bubbling events, and HTML serialization for assertions.
//!
//! ```
//! use borf_dom::Dom;
//!
//! let dom = Dom::new();
//! let p = dom.create_element("p");
//! let text = dom.create_text("hello");
//! dom.append_child(p, text).unwrap();
//! dom.append_child(dom.body(), p).unwrap();
//! assert_eq!(dom.inner_html(dom.body()), "<p>hello</p>");
//! ```

pub mod document;
pub mod error;
pub mod event;
mod html;
pub mod node;

pub use document::{Dom, DomStats};
pub use error::DomError;
pub use event::Event;
pub use node::{ListenerId, NodeId, NodeKind};
