//! Descriptor trees to collapsible HTML
//!
//! The markup is a nested list: containers with children become
//! `<ul class="tree">` groups with a `<label>`, everything else a single
//! `<li>` row. Groups below the root start out closed. The browser client
//! produces the same markup for the global tree, so the two must stay in step.

use crate::descriptor::{Descriptor, TypeTag};
use std::borrow::Cow;

/// Render a descriptor tree to a `<ul class="root">` fragment.
///
/// Keys and text content are escaped; children keep the order they have in
/// the tree.
pub fn render(root: &Descriptor) -> String {
    let mut out = String::from(r#"<ul class="root">"#);
    render_descriptor(&mut out, root, 0);
    out.push_str("</ul>");
    out
}

fn escape(s: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(s)
}

fn render_descriptor(out: &mut String, descriptor: &Descriptor, depth: usize) {
    let label = match descriptor.key.as_deref() {
        Some(key) if !key.is_empty() => format!("{}: ", escape(key)),
        _ => String::new(),
    };
    let class = descriptor.tag.as_str();

    match descriptor.tag {
        TypeTag::String
        | TypeTag::Number
        | TypeTag::Boolean
        | TypeTag::Regexp
        | TypeTag::Symbol
        | TypeTag::Date
        | TypeTag::Instance
        | TypeTag::Circular
        | TypeTag::Function
        | TypeTag::Unknown => {
            let text = descriptor.text().map(escape).unwrap_or_default();
            out.push_str(&format!(
                r#"<li>{label}<code class="{class}"><span>{text}</span></code></li>"#
            ));
        }

        TypeTag::Null | TypeTag::Undefined => {
            out.push_str(&format!(r#"<li>{label}<code class="{class}"></code></li>"#));
        }

        TypeTag::Object => {
            let badge = format!(r#"<code class="{class}"></code>"#);
            render_container(out, descriptor, depth, &label, &badge);
        }

        TypeTag::Array | TypeTag::Map | TypeTag::Set => {
            let length = descriptor.length.unwrap_or(0);
            let badge = format!(r#"<code class="{class}"><span>{length}</span></code>"#);
            render_container(out, descriptor, depth, &label, &badge);
        }
    }
}

fn render_container(
    out: &mut String,
    descriptor: &Descriptor,
    depth: usize,
    label: &str,
    badge: &str,
) {
    let children = descriptor.children();
    if children.is_empty() {
        out.push_str(&format!("<li>{label}{badge}</li>"));
        return;
    }

    let closed = if depth > 0 { " closed" } else { "" };
    out.push_str(&format!(
        r#"<li><ul class="tree{closed}"><label>{label}{badge}</label>"#
    ));
    for child in children {
        render_descriptor(out, child, depth + 1);
    }
    out.push_str("</ul></li>");
}
