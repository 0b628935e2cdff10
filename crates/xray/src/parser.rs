//! Recursive walk from a template context to descriptor trees
//!
//! One context is split into two trees: the *global* tree (top-level keys in
//! the global-key set) and the *page* tree (everything else). Both passes
//! track which shared values they have already described; a value reached a
//! second time becomes a `circular` descriptor pointing at the path where it
//! was first seen. The page pass starts from what the global pass saw, so data
//! shared between the two is expanded once, in the global tree.
//!
//! Nesting is bounded by `max_depth`: anything deeper is left out, with no
//! placeholder.

use crate::classify::classify;
use crate::descriptor::{Content, Descriptor, TypeTag};
use crate::error::{Result, XrayError};
use crate::sort::sort_alpha_num;
use crate::summarize::{Summary, summarize};
use crate::value::{Identity, Value};
use std::collections::HashMap;

pub const DEFAULT_MAX_DEPTH: usize = 8;
pub const DEFAULT_CUTOFF: usize = 45;

/// Key of the synthetic root descriptor
pub const ROOT_KEY: &str = "root";

/// Keys summarized one level deep instead of being walked. The host puts its
/// auto-generated collection index under this name.
pub const DEFAULT_SHALLOW_KEYS: &[&str] = &["collections"];

/// Parser options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Depth at which the walk stops (the root is depth 0)
    pub max_depth: usize,
    /// Maximum length of text content before it is cut
    pub cutoff: usize,
    /// Objects found under these keys only list their members' sizes
    pub shallow_keys: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            cutoff: DEFAULT_CUTOFF,
            shallow_keys: DEFAULT_SHALLOW_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl ParseOptions {
    fn is_shallow(&self, key: &str) -> bool {
        self.shallow_keys.iter().any(|k| k == key)
    }
}

/// Which half of the context a pass produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Global,
    Page,
}

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    // Held so the identity cannot be handed to a new allocation while the
    // entry exists.
    _value: Value,
}

/// Shared values already described, by identity, with the path of the first sighting
#[derive(Debug, Clone, Default)]
pub struct SeenMap {
    entries: HashMap<Identity, Seen>,
}

impl SeenMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Path where `value` was first seen, if it is a reference seen before
    pub fn path_of(&self, value: &Value) -> Option<&str> {
        let identity = value.identity()?;
        self.entries.get(&identity).map(|seen| seen.path.as_str())
    }

    /// Record `value` at `path`. Primitives are ignored; the first path wins.
    pub fn insert(&mut self, value: &Value, path: &str) {
        if let Some(identity) = value.identity() {
            self.entries.entry(identity).or_insert_with(|| Seen {
                path: path.to_string(),
                _value: value.clone(),
            });
        }
    }
}

/// Splits template contexts into global and page descriptor trees.
///
/// One parser serves one build: call [`reset`](Self::reset) when a build
/// starts, [`set_global_keys`](Self::set_global_keys) before the first pass,
/// then [`parse_global_data`](Self::parse_global_data) once and
/// [`parse_page_data`](Self::parse_page_data) per page.
#[derive(Debug, Default)]
pub struct DataParser {
    options: ParseOptions,
    global_keys: Option<Vec<String>>,
    seen_global: SeenMap,
}

impl DataParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            global_keys: None,
            seen_global: SeenMap::new(),
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Forget everything seen so far, and the global keys.
    ///
    /// Identities from a previous build mean nothing in the next one.
    pub fn reset(&mut self) {
        self.seen_global.clear();
        self.global_keys = None;
    }

    /// Set the top-level keys that belong to global data
    pub fn set_global_keys<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_keys = Some(keys.into_iter().map(Into::into).collect());
    }

    pub fn global_keys(&self) -> Option<&[String]> {
        self.global_keys.as_deref()
    }

    /// Values described by the last global pass
    pub fn seen_global(&self) -> &SeenMap {
        &self.seen_global
    }

    /// Describe the global half of `context`.
    ///
    /// Returns `None` only when `max_depth` is 0.
    pub fn parse_global_data(&mut self, context: &Value) -> Result<Option<Descriptor>> {
        let global_keys = self
            .global_keys
            .as_deref()
            .ok_or(XrayError::GlobalKeysNotSet)?;
        tracing::debug!(?global_keys, "parsing global data");

        self.seen_global.clear();
        let mut crawler = Crawler {
            mode: Mode::Global,
            global_keys,
            options: &self.options,
            seen: &mut self.seen_global,
        };
        let parsed = crawler.crawl(Some(ROOT_KEY), context, 0, ROOT_KEY);

        tracing::debug!(seen = self.seen_global.len(), "global data parsed");
        Ok(parsed)
    }

    /// Describe the page half of `context`.
    ///
    /// Shared values already described by the global pass come out as
    /// `circular`. Call [`parse_global_data`](Self::parse_global_data) first.
    pub fn parse_page_data(&self, context: &Value) -> Result<Option<Descriptor>> {
        let global_keys = self
            .global_keys
            .as_deref()
            .ok_or(XrayError::GlobalKeysNotSet)?;
        tracing::debug!(?global_keys, "parsing page data");

        let mut seen = self.seen_global.clone();
        let mut crawler = Crawler {
            mode: Mode::Page,
            global_keys,
            options: &self.options,
            seen: &mut seen,
        };
        let parsed = crawler.crawl(Some(ROOT_KEY), context, 0, ROOT_KEY);

        tracing::debug!(seen = seen.len(), "page data parsed");
        Ok(parsed)
    }
}

/// State of one pass
struct Crawler<'a> {
    mode: Mode,
    global_keys: &'a [String],
    options: &'a ParseOptions,
    seen: &'a mut SeenMap,
}

impl Crawler<'_> {
    fn is_global(&self, key: &str) -> bool {
        self.global_keys.iter().any(|k| k == key)
    }

    /// Describe `value`, found under `key` at `depth`, or `None` to leave it out
    fn crawl(
        &mut self,
        key: Option<&str>,
        value: &Value,
        depth: usize,
        path: &str,
    ) -> Option<Descriptor> {
        if depth == self.options.max_depth {
            return None;
        }

        let key = key.filter(|k| !k.is_empty());

        // The global/page split happens right below the root, and only there.
        if depth == 1
            && let Some(key) = key
        {
            let wanted = match self.mode {
                Mode::Global => self.is_global(key),
                Mode::Page => !self.is_global(key),
            };
            if !wanted {
                return None;
            }
        }

        let mut descriptor = Descriptor::new(key.map(str::to_owned), TypeTag::Unknown);

        if depth > 0 {
            if let Some(first) = self.seen.path_of(value) {
                descriptor.tag = TypeTag::Circular;
                descriptor.content = Some(Content::Text(first.to_string()));
                return Some(descriptor);
            }
            // Registered before descending so a value holding itself is caught.
            self.seen.insert(value, path);
        }

        let tag = classify(value);
        let Summary { content, length } = summarize(tag, value, self.options.cutoff);
        descriptor.tag = tag;
        descriptor.content = content;
        descriptor.length = length;

        if let Some(Content::Children(slot)) = &mut descriptor.content {
            let children = self.children(tag, key, value, depth, path);
            slot.extend(children);
        }

        Some(descriptor)
    }

    fn children(
        &mut self,
        tag: TypeTag,
        key: Option<&str>,
        value: &Value,
        depth: usize,
        path: &str,
    ) -> Vec<Descriptor> {
        let depth = depth + 1;
        let mut children = Vec::new();

        match (tag, value) {
            (TypeTag::Array, Value::Array(items)) => {
                for (idx, item) in items.borrow().iter().enumerate() {
                    let idx = idx.to_string();
                    let child_path = format!("{path}.{idx}");
                    children.extend(self.crawl(Some(&idx), item, depth, &child_path));
                }
            }
            (TypeTag::Map, Value::Map(entries)) => {
                let entries = entries.borrow();
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort_by(|a, b| sort_alpha_num(a, b));
                for k in keys {
                    let child_path = format!("{path}.{k}");
                    children.extend(self.crawl(Some(k), &entries[k], depth, &child_path));
                }
            }
            (TypeTag::Set, Value::Set(items)) => {
                for (idx, item) in items.borrow().iter().enumerate() {
                    let child_path = format!("{path}.{idx}");
                    children.extend(self.crawl(None, item, depth, &child_path));
                }
            }
            (TypeTag::Object, Value::Object(object)) => {
                let object = object.borrow();
                let mut keys: Vec<&String> = object.fields.keys().collect();
                keys.sort_by(|a, b| sort_alpha_num(a, b));

                if key.is_some_and(|k| self.options.is_shallow(k)) {
                    children.extend(keys.into_iter().map(|k| shallow_summary(k, &object.fields[k])));
                } else {
                    for k in keys {
                        let child_path = format!("{path}.{k}");
                        children.extend(self.crawl(Some(k), &object.fields[k], depth, &child_path));
                    }
                }
            }
            _ => {}
        }

        children
    }
}

/// Size-only descriptor for a member of a shallow object
fn shallow_summary(key: &str, value: &Value) -> Descriptor {
    let tag = match value {
        Value::Array(_) => TypeTag::Array,
        _ => TypeTag::Object,
    };
    let mut descriptor = Descriptor::new(Some(key.to_string()), tag);
    descriptor.length = value.len();
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DataParser {
        let mut parser = DataParser::default();
        parser.set_global_keys(Vec::<String>::new());
        parser
    }

    #[test]
    fn test_requires_global_keys() {
        let mut parser = DataParser::default();
        let ctx = Value::object([("a", Value::from(1))]);
        assert_eq!(
            parser.parse_global_data(&ctx),
            Err(XrayError::GlobalKeysNotSet)
        );
        assert_eq!(parser.parse_page_data(&ctx), Err(XrayError::GlobalKeysNotSet));
    }

    #[test]
    fn test_root_descriptor() {
        let ctx = Value::object([("title", Value::from("Home"))]);
        let page = parser().parse_page_data(&ctx).unwrap().unwrap();
        assert_eq!(page.key.as_deref(), Some(ROOT_KEY));
        assert_eq!(page.tag, TypeTag::Object);
        assert_eq!(page.length, Some(1));
        assert_eq!(page.lookup("title").and_then(Descriptor::text), Some("Home"));
    }

    #[test]
    fn test_zero_depth_yields_nothing() {
        let mut parser = DataParser::new(ParseOptions {
            max_depth: 0,
            ..ParseOptions::default()
        });
        parser.set_global_keys(["site"]);
        let ctx = Value::object([("site", Value::from("x"))]);
        assert_eq!(parser.parse_global_data(&ctx).unwrap(), None);
    }

    #[test]
    fn test_object_keys_are_sorted() {
        let ctx = Value::object([(
            "items",
            Value::object([
                ("item10", Value::from(10)),
                ("item2", Value::from(2)),
                ("Item1", Value::from(1)),
            ]),
        )]);
        let page = parser().parse_page_data(&ctx).unwrap().unwrap();
        let keys: Vec<_> = page
            .lookup("items")
            .unwrap()
            .children()
            .iter()
            .map(|c| c.key.clone().unwrap())
            .collect();
        assert_eq!(keys, ["Item1", "item2", "item10"]);
    }

    #[test]
    fn test_map_keys_are_sorted() {
        let ctx = Value::object([(
            "m",
            Value::map([("b", Value::from(1)), ("a10", Value::from(2)), ("a9", Value::from(3))]),
        )]);
        let page = parser().parse_page_data(&ctx).unwrap().unwrap();
        let m = page.lookup("m").unwrap();
        assert_eq!(m.tag, TypeTag::Map);
        assert_eq!(m.length, Some(3));
        let keys: Vec<_> = m.children().iter().map(|c| c.key.as_deref().unwrap()).collect();
        assert_eq!(keys, ["a9", "a10", "b"]);
    }

    #[test]
    fn test_set_children_have_no_key() {
        let ctx = Value::object([("tags", Value::set([Value::from("a"), Value::from("b")]))]);
        let page = parser().parse_page_data(&ctx).unwrap().unwrap();
        let tags = page.lookup("tags").unwrap();
        assert_eq!(tags.tag, TypeTag::Set);
        assert_eq!(tags.length, Some(2));
        assert!(tags.children().iter().all(|c| c.key.is_none()));
        assert_eq!(tags.children()[1].text(), Some("b"));
    }

    #[test]
    fn test_set_elements_are_tracked_by_position() {
        let shared = Value::object([("x", Value::from(1))]);
        let ctx = Value::object([
            ("s", Value::set([Value::from(0), shared.clone()])),
            ("t", shared),
        ]);
        let page = parser().parse_page_data(&ctx).unwrap().unwrap();
        let t = page.lookup("t").unwrap();
        assert_eq!(t.tag, TypeTag::Circular);
        assert_eq!(t.text(), Some("root.s.1"));
    }

    #[test]
    fn test_instances_are_not_expanded() {
        let ctx = Value::object([(
            "page",
            Value::instance("Template", [("inputPath", Value::from("./a.md"))]),
        )]);
        let page = parser().parse_page_data(&ctx).unwrap().unwrap();
        let node = page.lookup("page").unwrap();
        assert_eq!(node.tag, TypeTag::Instance);
        assert_eq!(node.text(), Some("Template"));
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_collections_are_summarized() {
        let posts = Value::array([Value::object::<&str>([]), Value::object::<&str>([])]);
        let ctx = Value::object([(
            "collections",
            Value::object([
                ("posts", posts),
                ("all", Value::array(vec![Value::Null; 3])),
                ("tagMap", Value::object([("a", Value::Null)])),
            ]),
        )]);
        let mut parser = DataParser::default();
        parser.set_global_keys(["collections"]);
        let global = parser.parse_global_data(&ctx).unwrap().unwrap();

        let collections = global.lookup("collections").unwrap();
        let children = collections.children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].key.as_deref(), Some("all"));
        assert_eq!(children[0].tag, TypeTag::Array);
        assert_eq!(children[0].length, Some(3));
        assert_eq!(children[1].key.as_deref(), Some("posts"));
        assert_eq!(children[1].length, Some(2));
        assert_eq!(children[2].key.as_deref(), Some("tagMap"));
        assert_eq!(children[2].tag, TypeTag::Object);
        assert_eq!(children[2].length, Some(1));
        assert!(children.iter().all(|c| c.content.is_none()));
    }

    #[test]
    fn test_shallow_keys_are_configurable() {
        let ctx = Value::object([
            ("collections", Value::object([("all", Value::array([Value::from(1)]))])),
            ("nav", Value::object([("items", Value::array([Value::from(1)]))])),
        ]);
        let mut parser = DataParser::new(ParseOptions {
            shallow_keys: vec!["nav".to_string()],
            ..ParseOptions::default()
        });
        parser.set_global_keys(Vec::<String>::new());
        let page = parser.parse_page_data(&ctx).unwrap().unwrap();

        // "collections" is an ordinary key now and is walked
        let all = page.lookup("collections.all").unwrap();
        assert_eq!(all.children().len(), 1);

        let items = page.lookup("nav.items").unwrap();
        assert_eq!(items.length, Some(1));
        assert!(items.content.is_none());
    }

    #[test]
    fn test_empty_key_has_no_label() {
        let ctx = Value::object([("", Value::from(1))]);
        let page = parser().parse_page_data(&ctx).unwrap().unwrap();
        assert_eq!(page.children()[0].key, None);
    }

    #[test]
    fn test_reset_forgets_global_state() {
        let shared = Value::object([("x", Value::from(1))]);
        let ctx = Value::object([("site", shared.clone()), ("page", shared)]);

        let mut parser = DataParser::default();
        parser.set_global_keys(["site"]);
        parser.parse_global_data(&ctx).unwrap();
        assert_eq!(parser.seen_global().len(), 1);

        parser.reset();
        assert!(parser.seen_global().is_empty());
        assert_eq!(parser.global_keys(), None);

        parser.set_global_keys(["site"]);
        let page = parser.parse_page_data(&ctx).unwrap().unwrap();
        assert_eq!(page.lookup("page").unwrap().tag, TypeTag::Object);
    }

    #[test]
    fn test_page_pass_leaves_global_seen_map_untouched() {
        let ctx = Value::object([("a", Value::object([("b", Value::array([]))]))]);
        let parser = parser();
        parser.parse_page_data(&ctx).unwrap();
        assert!(parser.seen_global().is_empty());

        // A second page pass does not see the first one's values as circular
        let page = parser.parse_page_data(&ctx).unwrap().unwrap();
        assert_eq!(page.lookup("a").unwrap().tag, TypeTag::Object);
    }
}
