//! Data file loading for inspection.
//!
//! Turns JSON, TOML and YAML documents into an inspectable [`Value`]. JSON
//! and TOML go through `facet_value`, YAML through `serde_yaml` because
//! facet-yaml doesn't support dynamic values.
//!
//! YAML tags give access to the value kinds plain data can't express:
//!
//! ```yaml
//! published: !date 2024-05-01T10:00:00Z
//! slug: !regexp "^[a-z-]+$"
//! tags: !set [rust, web, rust]
//! render: !fn renderPost
//! author: !Person { name: Ada }
//! ```
//!
//! Any tag not listed in [`parse_data_file`] becomes an instance of a class
//! named after the tag.

use camino::Utf8Path;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use eyre::{Result, WrapErr, eyre};
use xray::Value;

/// Integers beyond this magnitude lose precision as numbers
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Supported data file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Toml,
    Yaml,
}

impl DataFormat {
    /// Determine format from file extension
    pub fn from_extension(path: &str) -> Option<Self> {
        let ext = path.rsplit('.').next()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Read and parse a data file, picking the format from its extension
pub fn load_data_file(path: &Utf8Path) -> Result<Value> {
    let format = DataFormat::from_extension(path.as_str())
        .ok_or_else(|| eyre!("Unsupported data file extension: {path}"))?;
    let content =
        fs_err::read_to_string(path).wrap_err_with(|| format!("Failed to read {path}"))?;
    parse_data_file(&content, format).wrap_err_with(|| format!("Failed to parse {path}"))
}

/// Parse a data file into a [`Value`].
///
/// YAML tags understood: `!date`, `!regexp`, `!set`, `!map`, `!fn`,
/// `!symbol`, `!undefined`, `!bigint`.
pub fn parse_data_file(content: &str, format: DataFormat) -> Result<Value> {
    match format {
        DataFormat::Json => parse_json(content),
        DataFormat::Toml => parse_toml(content),
        DataFormat::Yaml => parse_yaml(content),
    }
}

fn parse_json(content: &str) -> Result<Value> {
    let value: facet_value::Value =
        facet_json::from_str(content).map_err(|e| eyre!("JSON parse error: {e}"))?;
    Ok(facet_value_to_value(value))
}

fn parse_toml(content: &str) -> Result<Value> {
    let value: facet_value::Value =
        facet_toml::from_str(content).map_err(|e| eyre!("TOML parse error: {e}"))?;
    Ok(facet_value_to_value(value))
}

fn parse_yaml(content: &str) -> Result<Value> {
    let serde_value: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| eyre!("YAML parse error: {e}"))?;
    Ok(yaml_to_value(serde_value))
}

fn integer(i: i64) -> Value {
    if i.abs() > MAX_SAFE_INTEGER {
        Value::BigInt(i128::from(i))
    } else {
        Value::Number(i as f64)
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

/// Render a YAML scalar used as a mapping key
fn yaml_key(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_entries(map: serde_yaml::Mapping) -> Vec<(String, Value)> {
    map.into_iter()
        .filter_map(|(key, val)| {
            let Some(key) = yaml_key(&key) else {
                tracing::warn!("Skipping non-scalar YAML key: {key:?}");
                return None;
            };
            Some((key, yaml_to_value(val)))
        })
        .collect()
}

fn yaml_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null => None,
        other => yaml_key(other),
    }
}

/// Convert a serde_yaml::Value to an inspectable Value
fn yaml_to_value(v: serde_yaml::Value) -> Value {
    match v {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                integer(i)
            } else if let Some(u) = n.as_u64() {
                Value::BigInt(i128::from(u))
            } else {
                Value::Number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_yaml::Value::String(s) => Value::from(s),
        serde_yaml::Value::Sequence(items) => items.into_iter().map(yaml_to_value).collect(),
        serde_yaml::Value::Mapping(map) => Value::object(yaml_entries(map)),
        serde_yaml::Value::Tagged(tagged) => {
            let serde_yaml::value::TaggedValue { tag, value } = *tagged;
            tagged_to_value(&tag.to_string(), value)
        }
    }
}

fn tagged_to_value(tag: &str, value: serde_yaml::Value) -> Value {
    let name = tag.trim_start_matches('!');
    match (name, value) {
        ("date", serde_yaml::Value::String(s)) => match parse_date(&s) {
            Some(at) => Value::date(at),
            None => {
                tracing::warn!("Invalid !date value `{s}`, keeping it as a string");
                Value::from(s)
            }
        },
        ("regexp", serde_yaml::Value::String(source)) => Value::regexp(source, ""),
        ("regexp", serde_yaml::Value::Mapping(map)) => {
            let field = |k: &str| map.get(k).and_then(yaml_string).unwrap_or_default();
            Value::regexp(field("source"), field("flags"))
        }
        ("set", serde_yaml::Value::Sequence(items)) => {
            Value::set(items.into_iter().map(yaml_to_value))
        }
        ("map", serde_yaml::Value::Mapping(map)) => Value::map(yaml_entries(map)),
        ("fn", value) => Value::function(yaml_string(&value).as_deref()),
        ("symbol", value) => Value::symbol(yaml_string(&value).as_deref()),
        ("undefined", _) => Value::Undefined,
        ("bigint", serde_yaml::Value::Number(n)) => match n.as_i64() {
            Some(i) => Value::BigInt(i128::from(i)),
            None => Value::BigInt(n.as_u64().map(i128::from).unwrap_or_default()),
        },
        ("bigint", serde_yaml::Value::String(s)) => match s.parse::<i128>() {
            Ok(i) => Value::BigInt(i),
            Err(_) => {
                tracing::warn!("Invalid !bigint value `{s}`, keeping it as a string");
                Value::from(s)
            }
        },
        (class, serde_yaml::Value::Mapping(map)) => Value::instance(class, yaml_entries(map)),
        (class, _) => Value::instance::<String>(class, []),
    }
}

/// Convert a facet_value::Value to an inspectable Value
fn facet_value_to_value(v: facet_value::Value) -> Value {
    use facet_value::ValueType;

    match v.value_type() {
        ValueType::Null => Value::Null,
        ValueType::Bool => Value::Bool(v.as_bool().unwrap_or(false)),
        ValueType::Number => {
            if let Some(num) = v.as_number() {
                // Try integer first, then float
                if let Some(i) = num.to_i64() {
                    integer(i)
                } else if let Some(f) = num.to_f64() {
                    Value::Number(f)
                } else {
                    Value::Number(f64::NAN)
                }
            } else {
                Value::Number(f64::NAN)
            }
        }
        ValueType::String => match v.as_string() {
            Some(s) => Value::from(s.as_str()),
            None => Value::from(""),
        },
        ValueType::Bytes => match v.as_bytes() {
            Some(b) => b.as_slice().iter().map(|byte| Value::from(u32::from(*byte))).collect(),
            None => Value::array([]),
        },
        ValueType::Array => match v.as_array() {
            Some(arr) => arr
                .iter()
                .map(|item| facet_value_to_value(item.clone()))
                .collect(),
            None => Value::array([]),
        },
        ValueType::Object => match v.as_object() {
            Some(obj) => Value::object(
                obj.iter()
                    .map(|(key, val)| (key.to_string(), facet_value_to_value(val.clone()))),
            ),
            None => Value::object::<String>([]),
        },
        ValueType::DateTime => match v.as_datetime() {
            Some(dt) => match datetime_to_utc(dt) {
                Some(at) => Value::date(at),
                None => Value::from(format!(
                    "{:02}:{:02}:{:02}",
                    dt.hour(),
                    dt.minute(),
                    dt.second()
                )),
            },
            None => Value::Null,
        },
    }
}

/// Instant of a TOML datetime; local datetimes and dates are taken as UTC.
///
/// Returns `None` for a bare local time, which has no date.
fn datetime_to_utc(dt: &facet_value::VDateTime) -> Option<DateTime<Utc>> {
    use facet_value::DateTimeKind;

    let date = NaiveDate::from_ymd_opt(dt.year(), dt.month().into(), dt.day().into())?;
    let time = NaiveTime::from_hms_nano_opt(
        dt.hour().into(),
        dt.minute().into(),
        dt.second().into(),
        dt.nanos(),
    )?;
    let naive = date.and_time(time);
    match dt.kind() {
        DateTimeKind::Offset { offset_minutes } => {
            let offset = FixedOffset::east_opt(i32::from(offset_minutes) * 60)?;
            naive
                .and_local_timezone(offset)
                .single()
                .map(|at| at.with_timezone(&Utc))
        }
        DateTimeKind::LocalDateTime | DateTimeKind::LocalDate => Some(naive.and_utc()),
        DateTimeKind::LocalTime => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xray::{DataParser, TypeTag, classify};

    fn page(value: &Value) -> xray::Descriptor {
        let mut parser = DataParser::default();
        parser.set_global_keys(Vec::<String>::new());
        parser.parse_page_data(value).unwrap().unwrap()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DataFormat::from_extension("site.json"), Some(DataFormat::Json));
        assert_eq!(DataFormat::from_extension("a/b.TOML"), Some(DataFormat::Toml));
        assert_eq!(DataFormat::from_extension("x.yml"), Some(DataFormat::Yaml));
        assert_eq!(DataFormat::from_extension("x.yaml"), Some(DataFormat::Yaml));
        assert_eq!(DataFormat::from_extension("x.kdl"), None);
    }

    #[test]
    fn test_parse_json() {
        let value = parse_data_file(
            r#"{"title": "Hi", "count": 3, "ratio": 0.5, "tags": ["a", "b"], "draft": null}"#,
            DataFormat::Json,
        )
        .unwrap();
        let tree = page(&value);
        assert_eq!(tree.child("title").unwrap().text(), Some("Hi"));
        assert_eq!(tree.child("count").unwrap().text(), Some("3"));
        assert_eq!(tree.child("ratio").unwrap().text(), Some("0.5"));
        assert_eq!(tree.child("tags").unwrap().length, Some(2));
        assert_eq!(tree.child("draft").unwrap().tag, TypeTag::Null);
    }

    #[test]
    fn test_parse_toml() {
        let value = parse_data_file(
            "title = \"Site\"\n[author]\nname = \"Ada\"\n",
            DataFormat::Toml,
        )
        .unwrap();
        let tree = page(&value);
        assert_eq!(tree.lookup("author.name").unwrap().text(), Some("Ada"));
    }

    #[test]
    fn test_parse_toml_datetime() {
        let value = parse_data_file(
            "published = 1979-05-27T07:32:00Z\nshifted = 1979-05-27T00:32:00-07:00\n",
            DataFormat::Toml,
        )
        .unwrap();
        let tree = page(&value);
        for key in ["published", "shifted"] {
            let node = tree.child(key).unwrap();
            assert_eq!(node.tag, TypeTag::Date);
            assert_eq!(node.text(), Some("1979-05-27T07:32:00.000Z"));
        }
    }

    #[test]
    fn test_parse_yaml_plain() {
        let value = parse_data_file(
            "title: Hello\n1: numeric key\nnested:\n  list: [1, 2]\n",
            DataFormat::Yaml,
        )
        .unwrap();
        let tree = page(&value);
        assert_eq!(tree.child("title").unwrap().text(), Some("Hello"));
        assert_eq!(tree.child("1").unwrap().text(), Some("numeric key"));
        assert_eq!(tree.lookup("nested.list").unwrap().length, Some(2));
    }

    #[test]
    fn test_parse_yaml_tags() {
        let yaml = r#"
published: !date 2024-05-01
slug: !regexp "^[a-z-]+$"
tags: !set [rust, web, rust]
render: !fn renderPost
anon: !fn
id: !symbol post
missing: !undefined
big: !bigint "170141183460469231731687303715884105727"
author: !Person { name: Ada }
lookup: !map { a: 1 }
"#;
        let value = parse_data_file(yaml, DataFormat::Yaml).unwrap();
        let tree = page(&value);

        let tag = |key: &str| tree.child(key).unwrap().tag;
        assert_eq!(tag("published"), TypeTag::Date);
        assert_eq!(
            tree.child("published").unwrap().text(),
            Some("2024-05-01T00:00:00.000Z")
        );
        assert_eq!(tag("slug"), TypeTag::Regexp);
        assert_eq!(tree.child("slug").unwrap().text(), Some("/^[a-z-]+$/"));
        assert_eq!(tag("tags"), TypeTag::Set);
        assert_eq!(tree.child("tags").unwrap().length, Some(2));
        assert_eq!(tag("render"), TypeTag::Function);
        assert_eq!(tree.child("render").unwrap().text(), Some("renderPost"));
        assert_eq!(tree.child("anon").unwrap().text(), Some("anonymous"));
        assert_eq!(tag("id"), TypeTag::Symbol);
        assert_eq!(tag("missing"), TypeTag::Undefined);
        assert_eq!(tag("big"), TypeTag::Unknown);
        assert_eq!(tag("author"), TypeTag::Instance);
        assert_eq!(tree.child("author").unwrap().text(), Some("Person"));
        assert_eq!(tag("lookup"), TypeTag::Map);
    }

    #[test]
    fn test_large_integers_become_bigint() {
        let value = parse_data_file("[9007199254740993, 42]", DataFormat::Json).unwrap();
        let Value::Array(items) = &value else {
            panic!("expected an array");
        };
        let items = items.borrow();
        assert_eq!(classify(&items[0]), TypeTag::Unknown);
        assert_eq!(classify(&items[1]), TypeTag::Number);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_data_file("{", DataFormat::Json).is_err());
        assert!(parse_data_file("= nope", DataFormat::Toml).is_err());
        assert!(parse_data_file("a: [", DataFormat::Yaml).is_err());
    }

    #[test]
    fn test_load_data_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        let path = dir.join("site.yaml");
        fs_err::write(&path, "title: Loaded\n").unwrap();
        let tree = page(&load_data_file(&path).unwrap());
        assert_eq!(tree.child("title").unwrap().text(), Some("Loaded"));

        assert!(load_data_file(&dir.join("site.ini")).is_err());
        assert!(load_data_file(&dir.join("missing.json")).is_err());
    }
}
