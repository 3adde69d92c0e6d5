#![forbid(unsafe_code)]

//! The closed set of things a view or render function may return.

use borf_reactive::Readable;
use serde_json::Value;

use crate::error::RenderError;
use crate::markup::Markup;

/// What a render function produced.
#[derive(Debug, Clone, Default)]
pub enum Renderable {
    /// Renders nothing (but keeps its position).
    #[default]
    Empty,
    Text(String),
    Markup(Markup),
    /// Text that follows a readable.
    Bound(Readable<String>),
    List(Vec<Renderable>),
}

impl Renderable {
    /// Lower into markup ready for `init`.
    #[must_use]
    pub fn into_markup(self) -> Markup {
        match self {
            Self::Empty => Markup::empty(),
            Self::Text(text) => Markup::text(text),
            Self::Markup(markup) => markup,
            Self::Bound(text) => Markup::bound_text(&text),
            Self::List(items) => Markup::fragment(items.into_iter().map(Self::into_markup)),
        }
    }
}

impl From<()> for Renderable {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<&str> for Renderable {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Renderable {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

macro_rules! renderable_from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for Renderable {
            fn from(n: $t) -> Self {
                Self::Text(n.to_string())
            }
        })*
    };
}

renderable_from_number!(i32, i64, u32, u64, usize, f64);

impl From<Markup> for Renderable {
    fn from(markup: Markup) -> Self {
        Self::Markup(markup)
    }
}

impl From<Readable<String>> for Renderable {
    fn from(text: Readable<String>) -> Self {
        Self::Bound(text)
    }
}

impl<T: Into<Renderable>> From<Option<T>> for Renderable {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl<T: Into<Renderable>> From<Vec<T>> for Renderable {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Untyped values, as a scripting bridge or a JSON payload would hand them
/// over: `null` and `false` render nothing, strings and numbers render as
/// text, arrays render their items. `true` and objects are rejected.
impl TryFrom<Value> for Renderable {
    type Error = RenderError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null | Value::Bool(false) => Ok(Self::Empty),
            Value::String(text) => Ok(Self::Text(text)),
            Value::Number(n) => Ok(Self::Text(n.to_string())),
            Value::Array(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Bool(true) => Err(RenderError::InvalidRenderable {
                type_name: "boolean",
                value: "true".into(),
            }),
            Value::Object(_) => Err(RenderError::InvalidRenderable {
                type_name: "object",
                value: value.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderContext;
    use serde_json::json;

    fn render(value: Renderable) -> String {
        let ctx = RenderContext::detached();
        let dom = ctx.dom().clone();
        let mut handle = value.into_markup().init(&ctx).unwrap();
        handle.connect(dom.body(), None).unwrap();
        dom.inner_html(dom.body())
    }

    #[test]
    fn json_shapes() {
        let value = Renderable::try_from(json!(["a", 1, null, false, ["b"]])).unwrap();
        assert_eq!(render(value), "a1b");
    }

    #[test]
    fn json_true_is_rejected_with_value() {
        let err = Renderable::try_from(json!(true)).unwrap_err();
        assert_eq!(err.to_string(), "cannot render a value of type boolean: true");
    }

    #[test]
    fn json_object_names_type_and_value() {
        let err = Renderable::try_from(json!({"id": 7})).unwrap_err();
        assert!(matches!(
            err,
            RenderError::InvalidRenderable { type_name: "object", ref value } if value == r#"{"id":7}"#
        ));
    }

    #[test]
    fn nested_invalid_item_fails_whole_list() {
        assert!(Renderable::try_from(json!(["ok", {"bad": true}])).is_err());
    }

    #[test]
    fn typed_conversions() {
        assert_eq!(render(Renderable::from(Some(42))), "42");
        assert_eq!(render(Renderable::from(None::<String>)), "");
        assert_eq!(render(Renderable::from(vec!["x", "y"])), "xy");
        assert_eq!(
            render(Renderable::from(Markup::element("b").child("bold"))),
            "<b>bold</b>"
        );
    }
}
