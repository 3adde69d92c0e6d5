#![forbid(unsafe_code)]

//! Property tests for keyed reconciliation.
//!
//! # Invariants
//!
//! 1. **Order**: after any update, rendered rows appear in source order.
//! 2. **Identity**: a key present before and after an update keeps its
//!    element node.
//! 3. **No leaks**: the number of elements between the anchors equals the
//!    source length, the document holds no nodes beyond the live rows, and
//!    disconnect leaves nothing behind.
//! 4. **Counter agreement**: nodes created per update equal the number of
//!    keys that were not present before.

use std::collections::HashMap;

use borf_dom::{Dom, NodeId};
use borf_reactive::Writable;
use borf_render::{Markup, RenderContext, repeat};
use proptest::prelude::*;

fn unique_list() -> impl Strategy<Value = Vec<u8>> {
    prop::sample::subsequence((0u8..24).collect::<Vec<_>>(), 0..24).prop_shuffle()
}

fn rows(dom: &Dom) -> Vec<(String, NodeId)> {
    dom.children(dom.body())
        .into_iter()
        .filter(|n| dom.tag(*n).is_some())
        .map(|n| (dom.text_content(n), n))
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1-4. Reconciliation under arbitrary updates
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn order_and_identity_hold(updates in prop::collection::vec(unique_list(), 1..12)) {
        let items = Writable::new(Vec::<u8>::new());
        let ctx = RenderContext::detached();
        let dom = ctx.dom().clone();
        let markup = repeat(&items.readable(), |value, _| {
            Markup::element("li").child(value.map(|v| v.to_string()))
        });
        let mut handle = markup.init(&ctx).unwrap();
        handle.connect(dom.body(), None).unwrap();

        let mut previous: HashMap<String, NodeId> = HashMap::new();
        for update in updates {
            dom.reset_stats();
            let new_keys = update
                .iter()
                .filter(|k| !previous.contains_key(&k.to_string()))
                .count() as u64;
            items.set(update.clone());

            let rendered = rows(&dom);
            let labels: Vec<String> = rendered.iter().map(|(l, _)| l.clone()).collect();
            let expected: Vec<String> = update.iter().map(u8::to_string).collect();
            prop_assert_eq!(&labels, &expected);

            for (label, node) in &rendered {
                if let Some(old) = previous.get(label) {
                    prop_assert_eq!(old, node);
                }
            }
            // one element plus one text node per new row
            prop_assert_eq!(dom.stats().created, new_keys * 2);
            // body and the two anchors, then one element and one text per row
            prop_assert_eq!(dom.node_count(), 3 + 2 * update.len());
            previous = rendered.into_iter().collect();
        }

        handle.disconnect();
        prop_assert_eq!(dom.debug_html(dom.body()), "");
    }
}
