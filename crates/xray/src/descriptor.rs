//! Descriptor tree produced by the parser
//!
//! A descriptor describes one inspected value: the key it was found under,
//! its type tag, and either a short text or its children. Descriptors are
//! write-only: they serialize to JSON for the browser and render to markup,
//! but nothing reads them back into values.

use crate::error::XrayError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The closed set of descriptor types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Undefined,
    Boolean,
    Number,
    String,
    Symbol,
    Function,
    Instance,
    Null,
    Array,
    Regexp,
    Date,
    Map,
    Set,
    Object,
    Circular,
    Unknown,
}

impl TypeTag {
    pub const ALL: [TypeTag; 16] = [
        TypeTag::Undefined,
        TypeTag::Boolean,
        TypeTag::Number,
        TypeTag::String,
        TypeTag::Symbol,
        TypeTag::Function,
        TypeTag::Instance,
        TypeTag::Null,
        TypeTag::Array,
        TypeTag::Regexp,
        TypeTag::Date,
        TypeTag::Map,
        TypeTag::Set,
        TypeTag::Object,
        TypeTag::Circular,
        TypeTag::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Undefined => "undefined",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Symbol => "symbol",
            TypeTag::Function => "function",
            TypeTag::Instance => "instance",
            TypeTag::Null => "null",
            TypeTag::Array => "array",
            TypeTag::Regexp => "regexp",
            TypeTag::Date => "date",
            TypeTag::Map => "map",
            TypeTag::Set => "set",
            TypeTag::Object => "object",
            TypeTag::Circular => "circular",
            TypeTag::Unknown => "unknown",
        }
    }

    /// Whether descriptors of this type carry a length and may have children
    pub fn is_container(self) -> bool {
        matches!(
            self,
            TypeTag::Array | TypeTag::Map | TypeTag::Set | TypeTag::Object
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = XrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| XrayError::UnknownType(s.to_string()))
    }
}

/// What a descriptor holds: a short text, or its children in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Children(Vec<Descriptor>),
}

/// One node of the descriptor tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    /// Key under which the value was found in its parent (none for set elements)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(rename = "type")]
    pub tag: TypeTag,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    /// Element or entry count, for containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

impl Descriptor {
    pub fn new(key: Option<String>, tag: TypeTag) -> Self {
        Self {
            key,
            tag,
            content: None,
            length: None,
        }
    }

    /// The text content, if this is a leaf with text
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(Content::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Children in display order (empty for leaves)
    pub fn children(&self) -> &[Descriptor] {
        match &self.content {
            Some(Content::Children(children)) => children,
            _ => &[],
        }
    }

    /// First direct child found under `key`
    pub fn child(&self, key: &str) -> Option<&Descriptor> {
        self.children()
            .iter()
            .find(|child| child.key.as_deref() == Some(key))
    }

    /// Follow a dot-separated chain of child keys
    pub fn lookup(&self, path: &str) -> Option<&Descriptor> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Depth of the deepest descendant (a lone node has depth 1)
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(Descriptor::depth)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_round_trip() {
        for tag in TypeTag::ALL {
            assert_eq!(tag.as_str().parse::<TypeTag>(), Ok(tag));
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert_eq!(
            "bigint".parse::<TypeTag>(),
            Err(XrayError::UnknownType("bigint".to_string()))
        );
    }

    #[test]
    fn test_serialize_leaf() {
        let mut d = Descriptor::new(Some("title".into()), TypeTag::String);
        d.content = Some(Content::Text("Hello".into()));
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"key":"title","type":"string","content":"Hello"}"#);
    }

    #[test]
    fn test_serialize_container() {
        let mut child = Descriptor::new(Some("0".into()), TypeTag::Number);
        child.content = Some(Content::Text("1".into()));
        let mut d = Descriptor::new(None, TypeTag::Array);
        d.length = Some(1);
        d.content = Some(Content::Children(vec![child]));

        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(
            json,
            r#"{"type":"array","content":[{"key":"0","type":"number","content":"1"}],"length":1}"#
        );
    }

    #[test]
    fn test_empty_container_omits_content() {
        let mut d = Descriptor::new(Some("tags".into()), TypeTag::Array);
        d.length = Some(0);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"key":"tags","type":"array","length":0}"#);
    }
}
