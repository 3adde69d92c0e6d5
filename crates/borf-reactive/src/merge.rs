#![forbid(unsafe_code)]

//! Combine several readables into one derived readable.
//!
//! Every merge re-runs its combiner with the current value of **every**
//! source, in source order, whenever any one of them notifies. Like
//! [`Readable::map`], merges are lazy: they subscribe to their sources only
//! while observed.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::derived::{Derived, upstream};
use crate::error::ReactiveError;
use crate::readable::Readable;

/// Merge two sources of possibly different types.
pub fn merge2<A, B, U>(
    a: &Readable<A>,
    b: &Readable<B>,
    combine: impl Fn(&A, &B) -> U + 'static,
) -> Readable<U>
where
    A: Clone + 'static,
    B: Clone + 'static,
    U: Clone + PartialEq + 'static,
{
    let (a_src, b_src) = (a.clone(), b.clone());
    let derived = Derived::new(smallvec::smallvec![upstream(a), upstream(b)], move || {
        combine(&a_src.get(), &b_src.get())
    });
    Readable::from_source(Rc::new(derived))
}

/// Merge three sources of possibly different types.
pub fn merge3<A, B, C, U>(
    a: &Readable<A>,
    b: &Readable<B>,
    c: &Readable<C>,
    combine: impl Fn(&A, &B, &C) -> U + 'static,
) -> Readable<U>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    U: Clone + PartialEq + 'static,
{
    let (a_src, b_src, c_src) = (a.clone(), b.clone(), c.clone());
    let links: SmallVec<[_; 2]> = [upstream(a), upstream(b), upstream(c)]
        .into_iter()
        .collect();
    let derived = Derived::new(links, move || {
        combine(&a_src.get(), &b_src.get(), &c_src.get())
    });
    Readable::from_source(Rc::new(derived))
}

/// Merge any number of same-typed sources; the combiner sees their values
/// as a slice in source order.
///
/// # Errors
///
/// Returns [`ReactiveError::EmptySources`] when `sources` is empty.
pub fn merge_all<T, U>(
    sources: Vec<Readable<T>>,
    combine: impl Fn(&[T]) -> U + 'static,
) -> Result<Readable<U>, ReactiveError>
where
    T: Clone + 'static,
    U: Clone + PartialEq + 'static,
{
    if sources.is_empty() {
        return Err(ReactiveError::EmptySources);
    }
    let links = sources.iter().map(upstream).collect();
    let derived = Derived::new(links, move || {
        let values: Vec<T> = sources.iter().map(Readable::get).collect();
        combine(&values)
    });
    Ok(Readable::from_source(Rc::new(derived)))
}
