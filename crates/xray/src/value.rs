//! Runtime values handed to the parser
//!
//! Template contexts are dynamic object graphs: scalars, lists, records,
//! class instances, and references shared between several places (or looping
//! back on themselves). `Value` models that graph. Reference kinds live behind
//! `Rc<RefCell<_>>` so they can be shared and mutated after construction, which
//! is also what makes cycles possible.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A dynamically typed value from a template context
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    /// A symbol with an optional description
    Symbol(Option<Rc<str>>),
    /// Arbitrary precision integers have no place in the descriptor taxonomy
    BigInt(i128),
    Function(Rc<Function>),
    Array(Rc<RefCell<Vec<Value>>>),
    RegExp(Rc<RegExp>),
    Date(Rc<DateTime<Utc>>),
    /// Keyed container that keeps insertion order
    Map(Rc<RefCell<IndexMap<String, Value>>>),
    /// Unique-element container that keeps insertion order
    Set(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
}

/// A callable value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Function {
    /// Declared name, `None` for anonymous functions
    pub name: Option<String>,
    /// Constructor identity for callables that are not plain functions
    /// (e.g. `AsyncFunction`, `GeneratorFunction`)
    pub constructor: Option<String>,
}

/// A regular expression literal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegExp {
    pub source: String,
    pub flags: String,
}

impl fmt::Display for RegExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// A key/value record, either a plain record or an instance of a named class
#[derive(Clone, Default)]
pub struct Object {
    /// Class name; `None` (or `"Object"`) marks a plain record
    pub class: Option<String>,
    pub fields: IndexMap<String, Value>,
}

impl Object {
    /// Whether this is a plain record rather than a class instance
    pub fn is_plain(&self) -> bool {
        matches!(self.class.as_deref(), None | Some("Object"))
    }
}

/// Identity of a shared (reference) value
///
/// Two values have the same identity iff they point at the same allocation.
/// An identity is only meaningful while the allocation is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(usize);

fn address<T: ?Sized>(rc: &Rc<T>) -> Identity {
    Identity(Rc::as_ptr(rc).cast::<()>() as usize)
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn symbol(description: Option<&str>) -> Self {
        Value::Symbol(description.map(Rc::from))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// A plain record
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object {
            class: None,
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })))
    }

    /// An instance of the class `class`
    pub fn instance<K: Into<String>>(
        class: impl Into<String>,
        fields: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        Value::Object(Rc::new(RefCell::new(Object {
            class: Some(class.into()),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })))
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// A set; duplicate elements are dropped
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let set = Value::Set(Rc::new(RefCell::new(Vec::new())));
        for item in items {
            set.push(item);
        }
        set
    }

    /// A plain function; `None` makes it anonymous
    pub fn function(name: Option<&str>) -> Self {
        Value::Function(Rc::new(Function {
            name: name.map(str::to_owned),
            constructor: None,
        }))
    }

    /// A callable built by a constructor other than the plain function one
    pub fn callable(name: Option<&str>, constructor: impl Into<String>) -> Self {
        Value::Function(Rc::new(Function {
            name: name.map(str::to_owned),
            constructor: Some(constructor.into()),
        }))
    }

    pub fn regexp(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Value::RegExp(Rc::new(RegExp {
            source: source.into(),
            flags: flags.into(),
        }))
    }

    pub fn date(at: DateTime<Utc>) -> Self {
        Value::Date(Rc::new(at))
    }

    /// Identity of a reference value, `None` for primitives
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Value::Undefined
            | Value::Null
            | Value::Bool(_)
            | Value::Number(_)
            | Value::String(_)
            | Value::Symbol(_)
            | Value::BigInt(_) => None,
            Value::Function(rc) => Some(address(rc)),
            Value::Array(rc) | Value::Set(rc) => Some(address(rc)),
            Value::RegExp(rc) => Some(address(rc)),
            Value::Date(rc) => Some(address(rc)),
            Value::Map(rc) => Some(address(rc)),
            Value::Object(rc) => Some(address(rc)),
        }
    }

    /// Whether this value is shared by reference (and can take part in a cycle)
    pub fn is_reference(&self) -> bool {
        self.identity().is_some()
    }

    /// Element or entry count of a container, `None` for everything else
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Array(items) | Value::Set(items) => Some(items.borrow().len()),
            Value::Map(entries) => Some(entries.borrow().len()),
            Value::Object(object) => Some(object.borrow().fields.len()),
            _ => None,
        }
    }

    /// Insert or replace a field (objects) or entry (maps).
    ///
    /// Returns `false` if this value is not keyed.
    pub fn set_field(&self, key: impl Into<String>, value: Value) -> bool {
        match self {
            Value::Object(object) => {
                object.borrow_mut().fields.insert(key.into(), value);
                true
            }
            Value::Map(entries) => {
                entries.borrow_mut().insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Append to an array, or add to a set if not already present.
    ///
    /// Returns `false` if this value is not a sequence.
    pub fn push(&self, value: Value) -> bool {
        match self {
            Value::Array(items) => {
                items.borrow_mut().push(value);
                true
            }
            Value::Set(items) => {
                let mut items = items.borrow_mut();
                if !items.iter().any(|existing| existing.same_value_zero(&value)) {
                    items.push(value);
                }
                true
            }
            _ => false,
        }
    }

    /// Equality used for set membership: primitives by value (with `NaN`
    /// equal to itself), references by identity.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            // Every symbol is unique
            (Value::Symbol(_), Value::Symbol(_)) => false,
            (a, b) => match (a.identity(), b.identity()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

// Shallow on purpose: a derived Debug would recurse forever on cyclic values.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Symbol(desc) => write!(f, "Symbol({})", desc.as_deref().unwrap_or("")),
            Value::BigInt(n) => write!(f, "{n}n"),
            Value::Function(func) => {
                write!(f, "[Function: {}]", func.name.as_deref().unwrap_or("anonymous"))
            }
            Value::Array(items) => write!(f, "Array({})", items.borrow().len()),
            Value::RegExp(re) => write!(f, "{re}"),
            Value::Date(at) => write!(f, "Date({at})"),
            Value::Map(entries) => write!(f, "Map({})", entries.borrow().len()),
            Value::Set(items) => write!(f, "Set({})", items.borrow().len()),
            Value::Object(object) => {
                let object = object.borrow();
                let keys: Vec<&str> = object.fields.keys().map(String::as_str).collect();
                write!(
                    f,
                    "{} {{{}}}",
                    object.class.as_deref().unwrap_or("Object"),
                    keys.join(", ")
                )
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(at: DateTime<Utc>) -> Self {
        Value::date(at)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::array(iter)
    }
}
