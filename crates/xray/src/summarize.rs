//! Short, human readable content for classified values

use crate::descriptor::{Content, TypeTag};
use crate::value::Value;
use chrono::SecondsFormat;

/// Appended to text that was cut at the cutoff
pub const ELLIPSIS: char = '…';

/// Content and length of a descriptor, before any children are added
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub content: Option<Content>,
    pub length: Option<usize>,
}

impl Summary {
    fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(Content::Text(text.into())),
            length: None,
        }
    }

    /// Containers only get a children slot when there is something to put in it
    fn container(length: usize) -> Self {
        Self {
            content: (length > 0).then(|| Content::Children(Vec::with_capacity(length))),
            length: Some(length),
        }
    }
}

/// Summarize `value`, already classified as `tag`.
///
/// Text content longer than `cutoff` characters is shortened with
/// [`apply_cutoff`], whatever the tag.
pub fn summarize(tag: TypeTag, value: &Value, cutoff: usize) -> Summary {
    let mut summary = match (tag, value) {
        (TypeTag::Boolean, Value::Bool(b)) => Summary::text(b.to_string()),
        (TypeTag::String, Value::String(s)) => Summary::text(&**s),
        (TypeTag::Number, Value::Number(n)) => Summary::text(format_number(*n)),
        (TypeTag::Regexp, Value::RegExp(re)) => Summary::text(re.to_string()),
        (TypeTag::Date, Value::Date(at)) => {
            Summary::text(at.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        (TypeTag::Symbol, Value::Symbol(description)) => Summary {
            content: description.as_deref().map(|d| Content::Text(d.to_string())),
            length: None,
        },
        (TypeTag::Function, Value::Function(func)) => {
            Summary::text(func.name.as_deref().unwrap_or("anonymous"))
        }
        (TypeTag::Instance, Value::Function(func)) => {
            Summary::text(func.constructor.as_deref().unwrap_or("Function"))
        }
        (TypeTag::Instance, Value::Object(object)) => {
            Summary::text(object.borrow().class.as_deref().unwrap_or("Object"))
        }
        (TypeTag::Array | TypeTag::Map | TypeTag::Set | TypeTag::Object, _) => {
            Summary::container(value.len().unwrap_or(0))
        }
        (TypeTag::Undefined | TypeTag::Null, _) => Summary::default(),
        _ => Summary::text("?"),
    };

    if let Some(Content::Text(text)) = &mut summary.content {
        apply_cutoff(text, cutoff);
    }

    summary
}

/// Cut `text` to `cutoff` characters and mark the cut with [`ELLIPSIS`].
///
/// Text at or under the cutoff is left alone. Applying this to its own output
/// changes nothing.
pub fn apply_cutoff(text: &mut String, cutoff: usize) {
    if let Some((byte_idx, _)) = text.char_indices().nth(cutoff) {
        text.truncate(byte_idx);
        text.push(ELLIPSIS);
    }
}

/// Format a number the way ECMAScript's `Number.prototype.toString` does.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        // -0 too
        return "0".to_string();
    }

    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{n}");
    }

    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
}
