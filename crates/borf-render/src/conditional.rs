#![forbid(unsafe_code)]

//! Switch between two subtrees on a boolean readable.
//!
//! States: unrendered, then-branch, else-branch, disconnected. A switch
//! disconnects the outgoing branch before the incoming one is built. A
//! predicate update to the value it already had performs no document work.

use borf_reactive::Readable;

use crate::dynamic::dynamic_markup;
use crate::markup::Markup;
use crate::renderable::Renderable;

/// Render `then` while `predicate` holds, `otherwise` (or nothing) while it
/// does not.
pub fn cond(predicate: &Readable<bool>, then: Markup, otherwise: Option<Markup>) -> Markup {
    // `map` drops repeated values, so equal updates never reach the handle.
    let predicate = predicate.map(|b| *b);
    dynamic_markup("cond", &predicate, move |shown| {
        Ok(match (shown, &otherwise) {
            (true, _) => Renderable::Markup(then.clone()),
            (false, Some(otherwise)) => Renderable::Markup(otherwise.clone()),
            (false, None) => Renderable::Empty,
        })
    })
}
