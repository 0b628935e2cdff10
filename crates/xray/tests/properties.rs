//! End-to-end behavior of the parser and renderer on whole contexts.

use xray::{Content, DataParser, Descriptor, ParseOptions, TypeTag, Value, render};

fn page_parser(global_keys: &[&str]) -> DataParser {
    let mut parser = DataParser::default();
    parser.set_global_keys(global_keys.iter().copied());
    parser
}

fn circulars(descriptor: &Descriptor) -> Vec<&Descriptor> {
    let mut found = Vec::new();
    if descriptor.tag == TypeTag::Circular {
        found.push(descriptor);
    }
    for child in descriptor.children() {
        found.extend(circulars(child));
    }
    found
}

fn top_level_keys(descriptor: &Descriptor) -> Vec<String> {
    descriptor
        .children()
        .iter()
        .filter_map(|c| c.key.clone())
        .collect()
}

/// `{ next: { next: ... } }`, `levels` objects deep
fn nested(levels: usize) -> Value {
    let mut value = Value::from("bottom");
    for _ in 0..levels {
        value = Value::object([("next", value)]);
    }
    value
}

#[test_log::test]
fn end_to_end_scenario() {
    let context = Value::object([(
        "a",
        Value::object([(
            "b",
            Value::array([
                Value::from(1),
                Value::from(2),
                Value::object([("c", Value::from("x".repeat(60)))]),
            ]),
        )]),
    )]);

    let mut parser = page_parser(&[]);
    let global = parser.parse_global_data(&context).unwrap().unwrap();
    assert!(global.children().is_empty());

    let page = parser.parse_page_data(&context).unwrap().unwrap();
    let a = page.child("a").unwrap();
    assert_eq!(a.tag, TypeTag::Object);
    assert_eq!(a.length, Some(1));

    let b = a.child("b").unwrap();
    assert_eq!(b.tag, TypeTag::Array);
    assert_eq!(b.length, Some(3));

    let items = b.children();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].tag, TypeTag::Number);
    assert_eq!(items[0].text(), Some("1"));
    assert_eq!(items[1].tag, TypeTag::Number);
    assert_eq!(items[1].text(), Some("2"));
    assert_eq!(items[2].tag, TypeTag::Object);
    assert_eq!(items[2].length, Some(1));

    let c = items[2].child("c").unwrap();
    assert_eq!(c.tag, TypeTag::String);
    assert_eq!(c.text(), Some(format!("{}…", "x".repeat(45)).as_str()));
}

#[test]
fn depth_is_bounded() {
    for max_depth in [1, 3, 8] {
        for extra in [1, 2, 5] {
            let mut parser = DataParser::new(ParseOptions {
                max_depth,
                ..ParseOptions::default()
            });
            parser.set_global_keys(Vec::<String>::new());

            let context = nested(max_depth + extra);
            let page = parser.parse_page_data(&context).unwrap().unwrap();
            assert_eq!(page.depth(), max_depth);

            // The deepest described object knows it has a member but does not show it
            let mut node = &page;
            while let Some(next) = node.child("next") {
                node = next;
            }
            assert_eq!(node.tag, TypeTag::Object);
            assert_eq!(node.length, Some(1));
            assert!(node.children().is_empty());
        }
    }
}

#[test]
fn direct_self_reference_is_circular() {
    let obj = Value::object([("name", Value::from("loop"))]);
    obj.set_field("me", obj.clone());
    let context = Value::object([("a", obj)]);

    let page = page_parser(&[]).parse_page_data(&context).unwrap().unwrap();
    let found = circulars(&page);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].key.as_deref(), Some("me"));
    assert_eq!(found[0].text(), Some("root.a"));
    assert_eq!(page.lookup("a.name").unwrap().text(), Some("loop"));
}

#[test]
fn transitive_cycle_is_circular() {
    let a = Value::object::<&str>([]);
    let b = Value::array([]);
    let c = Value::map::<&str>([]);
    a.set_field("b", b.clone());
    b.push(c.clone());
    c.set_field("back", a.clone());
    let context = Value::object([("a", a)]);

    let page = page_parser(&[]).parse_page_data(&context).unwrap().unwrap();
    let found = circulars(&page);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text(), Some("root.a"));
    assert_eq!(page.lookup("a.b.0.back").unwrap().tag, TypeTag::Circular);
}

#[test]
fn repeated_reference_points_at_first_path() {
    let shared = Value::array([Value::from("x")]);
    let context = Value::object([("first", shared.clone()), ("second", shared)]);

    let page = page_parser(&[]).parse_page_data(&context).unwrap().unwrap();
    assert_eq!(page.child("first").unwrap().tag, TypeTag::Array);
    let second = page.child("second").unwrap();
    assert_eq!(second.tag, TypeTag::Circular);
    assert_eq!(second.text(), Some("root.first"));
    assert_eq!(second.length, None);
}

#[test]
fn repeated_primitives_are_not_circular() {
    let s = Value::from("same");
    let context = Value::object([("x", s.clone()), ("y", s)]);
    let page = page_parser(&[]).parse_page_data(&context).unwrap().unwrap();
    assert!(circulars(&page).is_empty());
}

#[test]
fn partition_is_complete_and_disjoint() {
    let keys = ["collections", "eleventy", "page", "site", "title", "tags"];
    let context = Value::object(keys.map(|k| (k, Value::from(k))));

    for global_keys in [&[][..], &["site"][..], &["site", "collections", "eleventy"][..], &keys[..]] {
        let mut parser = page_parser(global_keys);
        let global = parser.parse_global_data(&context).unwrap().unwrap();
        let page = parser.parse_page_data(&context).unwrap().unwrap();

        let in_global = top_level_keys(&global);
        let in_page = top_level_keys(&page);
        for key in keys {
            let is_global = global_keys.contains(&key);
            assert_eq!(in_global.iter().any(|k| k == key), is_global, "{key} in global");
            assert_eq!(in_page.iter().any(|k| k == key), !is_global, "{key} in page");
        }
    }
}

#[test]
fn partition_only_applies_at_top_level() {
    let context = Value::object([("page", Value::object([("site", Value::from("nested"))]))]);
    let mut parser = page_parser(&["site"]);
    parser.parse_global_data(&context).unwrap();
    let page = parser.parse_page_data(&context).unwrap().unwrap();
    assert_eq!(page.lookup("page.site").unwrap().text(), Some("nested"));
}

#[test_log::test]
fn shared_values_are_expanded_in_global_tree_only() {
    let author = Value::object([("name", Value::from("Ada"))]);
    let context = Value::object([
        ("site", Value::object([("author", author.clone())])),
        ("post", Value::object([("by", author)])),
    ]);

    let mut parser = page_parser(&["site"]);
    let global = parser.parse_global_data(&context).unwrap().unwrap();
    let page = parser.parse_page_data(&context).unwrap().unwrap();

    let expanded = global.lookup("site.author").unwrap();
    assert_eq!(expanded.tag, TypeTag::Object);
    assert_eq!(expanded.child("name").unwrap().text(), Some("Ada"));

    let by = page.lookup("post.by").unwrap();
    assert_eq!(by.tag, TypeTag::Circular);
    assert_eq!(by.text(), Some("root.site.author"));

    // Every page pass starts again from the global state
    let again = parser.parse_page_data(&context).unwrap().unwrap();
    assert_eq!(again, page);
}

#[test]
fn page_only_values_are_not_circular_across_pages() {
    let context = Value::object([("post", Value::object([("id", Value::from(1))]))]);
    let mut parser = page_parser(&[]);
    parser.parse_global_data(&context).unwrap();
    let first = parser.parse_page_data(&context).unwrap().unwrap();
    let second = parser.parse_page_data(&context).unwrap().unwrap();
    assert_eq!(first.child("post").unwrap().tag, TypeTag::Object);
    assert_eq!(second.child("post").unwrap().tag, TypeTag::Object);
}

#[test]
fn keys_are_visited_in_natural_order() {
    let context = Value::object([
        ("item10", Value::from(10)),
        ("item2", Value::from(2)),
        ("Item1", Value::from(1)),
    ]);
    let page = page_parser(&[]).parse_page_data(&context).unwrap().unwrap();
    assert_eq!(top_level_keys(&page), ["Item1", "item2", "item10"]);
}

#[test]
fn rendered_strings_are_escaped() {
    let context = Value::object([("body", Value::from("<script>alert(1)</script>"))]);
    let page = page_parser(&[]).parse_page_data(&context).unwrap().unwrap();
    let html = render(&page);
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
}

#[test]
fn empty_containers_render_as_leaves() {
    let context = Value::object([
        ("list", Value::array([])),
        ("record", Value::object::<&str>([])),
    ]);
    let page = page_parser(&[]).parse_page_data(&context).unwrap().unwrap();

    let list = page.child("list").unwrap();
    assert_eq!(list.length, Some(0));
    assert_eq!(list.content, None);

    let html = render(&page);
    assert!(html.contains(r#"<li>list: <code class="array"><span>0</span></code></li>"#));
    assert!(html.contains(r#"<li>record: <code class="object"></code></li>"#));
    assert_eq!(html.matches(r#"<ul class="tree"#).count(), 1);
}

#[test]
fn every_value_kind_renders() {
    use chrono::{TimeZone, Utc};

    let context = Value::object([
        ("big", Value::BigInt(1 << 70)),
        ("date", Value::date(Utc.with_ymd_and_hms(2025, 3, 9, 8, 0, 0).unwrap())),
        ("fn", Value::function(None)),
        ("nothing", Value::Undefined),
        ("pattern", Value::regexp("\\d+", "g")),
        ("sym", Value::symbol(Some("id"))),
        ("flag", Value::from(true)),
    ]);
    let page = page_parser(&[]).parse_page_data(&context).unwrap().unwrap();

    let tags: Vec<TypeTag> = page.children().iter().map(|c| c.tag).collect();
    assert_eq!(
        tags,
        [
            TypeTag::Unknown,
            TypeTag::Date,
            TypeTag::Boolean,
            TypeTag::Function,
            TypeTag::Undefined,
            TypeTag::Regexp,
            TypeTag::Symbol,
        ]
    );

    let html = render(&page);
    assert!(html.contains(r#"big: <code class="unknown"><span>?</span></code>"#));
    assert!(html.contains("2025-03-09T08:00:00.000Z"));
    assert!(html.contains(r#"fn: <code class="function"><span>anonymous</span></code>"#));
    assert!(html.contains(r#"nothing: <code class="undefined"></code>"#));
    assert!(html.contains("/\\d+/g"));
}

#[test]
fn snapshot_json_shape() {
    let context = Value::object([("tags", Value::array([Value::from("a")]))]);
    let page = page_parser(&[]).parse_page_data(&context).unwrap().unwrap();
    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "key": "root",
            "type": "object",
            "length": 1,
            "content": [{
                "key": "tags",
                "type": "array",
                "length": 1,
                "content": [{ "key": "0", "type": "string", "content": "a" }]
            }]
        })
    );
    assert!(matches!(page.content, Some(Content::Children(_))));
}
