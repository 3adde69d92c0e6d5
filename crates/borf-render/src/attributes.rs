#![forbid(unsafe_code)]

//! Element attributes and their binding kinds.

use std::fmt;
use std::rc::Rc;

use borf_dom::Event;
use borf_reactive::{Readable, Writable};

use crate::error::{RenderError, Result};

/// Key prefix marking a two-way binding.
pub const TWO_WAY_PREFIX: &str = "$$";

/// Key prefix marking an event handler.
pub const HANDLER_PREFIX: &str = "on";

/// Event handler stored in an `on<event>` attribute.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// Value of one attribute.
#[derive(Clone)]
pub enum AttrValue {
    Static(String),
    /// Present (empty value) when `true`, absent when `false`.
    Bool(bool),
    Bound(Readable<String>),
    BoundBool(Readable<bool>),
    /// Kept in sync both ways; only valid under a `$$` key.
    TwoWay(Writable<String>),
    /// Only valid under an `on<event>` key.
    Handler(EventHandler),
}

impl AttrValue {
    pub fn handler(f: impl Fn(&Event) + 'static) -> Self {
        Self::Handler(Rc::new(f))
    }

    /// The value when it is a static string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Static(s) => Some(s),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::Bool(_) => "bool",
            Self::Bound(_) => "bound",
            Self::BoundBool(_) => "bound-bool",
            Self::TwoWay(_) => "two-way",
            Self::Handler(_) => "handler",
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Static(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Readable<String>> for AttrValue {
    fn from(value: Readable<String>) -> Self {
        Self::Bound(value)
    }
}

impl From<Readable<bool>> for AttrValue {
    fn from(value: Readable<bool>) -> Self {
        Self::BoundBool(value)
    }
}

impl From<Writable<String>> for AttrValue {
    fn from(value: Writable<String>) -> Self {
        Self::TwoWay(value)
    }
}

/// Ordered attribute list. Setting an existing key replaces its value in
/// place.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: Vec<(String, AttrValue)>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let (name, value) = (name.into(), value.into());
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<()> for Attributes {
    fn from((): ()) -> Self {
        Self::new()
    }
}

impl<K: Into<String>, const N: usize> From<[(K, AttrValue); N]> for Attributes {
    fn from(entries: [(K, AttrValue); N]) -> Self {
        entries
            .into_iter()
            .fold(Self::new(), |attrs, (k, v)| attrs.with(k, v))
    }
}

impl<K: Into<String>> From<Vec<(K, AttrValue)>> for Attributes {
    fn from(entries: Vec<(K, AttrValue)>) -> Self {
        entries
            .into_iter()
            .fold(Self::new(), |attrs, (k, v)| attrs.with(k, v))
    }
}

/// A validated attribute, ready to apply to an element.
pub(crate) enum Binding {
    Static(String, String),
    Bound(String, Readable<String>),
    BoundBool(String, Readable<bool>),
    TwoWay(String, Writable<String>),
    Handler(String, EventHandler),
}

/// Check key/value pairing and strip binding prefixes.
pub(crate) fn validate(name: &str, value: &AttrValue) -> Result<Option<Binding>> {
    let invalid = |reason| RenderError::InvalidAttribute {
        name: name.to_owned(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("attribute names must not be empty"));
    }
    if let Some(target) = name.strip_prefix(TWO_WAY_PREFIX) {
        return match value {
            AttrValue::TwoWay(w) if !target.is_empty() => {
                Ok(Some(Binding::TwoWay(target.to_owned(), w.clone())))
            }
            AttrValue::TwoWay(_) => Err(invalid("two-way binding needs a target attribute")),
            _ => Err(invalid("`$$` keys require a writable binding")),
        };
    }
    let event = name
        .strip_prefix(HANDLER_PREFIX)
        .filter(|rest| !rest.is_empty());
    match (event, value) {
        (Some(event), AttrValue::Handler(h)) => Ok(Some(Binding::Handler(
            event.to_ascii_lowercase(),
            Rc::clone(h),
        ))),
        (Some(_), _) => Err(invalid("`on` keys require an event handler")),
        (None, AttrValue::Handler(_)) => Err(invalid("handlers must use an `on<event>` key")),
        (None, AttrValue::TwoWay(_)) => Err(invalid("writable bindings must use a `$$` key")),
        (None, AttrValue::Static(s)) => Ok(Some(Binding::Static(name.to_owned(), s.clone()))),
        (None, AttrValue::Bool(true)) => Ok(Some(Binding::Static(name.to_owned(), String::new()))),
        (None, AttrValue::Bool(false)) => Ok(None),
        (None, AttrValue::Bound(r)) => Ok(Some(Binding::Bound(name.to_owned(), r.clone()))),
        (None, AttrValue::BoundBool(r)) => {
            Ok(Some(Binding::BoundBool(name.to_owned(), r.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let attrs = Attributes::new()
            .with("id", "a")
            .with("class", "x")
            .with("id", "b");
        let keys: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["id", "class"]);
        assert_eq!(attrs.get("id").and_then(AttrValue::as_str), Some("b"));
    }

    #[test]
    fn two_way_requires_prefix_and_writable() {
        let w = Writable::new(String::new());
        assert!(matches!(
            validate("$$value", &AttrValue::TwoWay(w.clone())),
            Ok(Some(Binding::TwoWay(name, _))) if name == "value"
        ));
        assert!(matches!(
            validate("value", &AttrValue::TwoWay(w)),
            Err(RenderError::InvalidAttribute { .. })
        ));
        assert!(validate("$$value", &AttrValue::from("static")).is_err());
        assert!(validate("$$", &AttrValue::TwoWay(Writable::default())).is_err());
    }

    #[test]
    fn handlers_require_on_keys() {
        let handler = AttrValue::handler(|_| {});
        assert!(matches!(
            validate("onClick", &handler),
            Ok(Some(Binding::Handler(event, _))) if event == "click"
        ));
        assert!(validate("click", &handler).is_err());
        assert!(validate("onclick", &AttrValue::from("alert(1)")).is_err());
    }

    #[test]
    fn false_bool_is_absent() {
        assert!(matches!(validate("disabled", &AttrValue::Bool(false)), Ok(None)));
    }
}
