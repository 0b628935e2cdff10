//! Mapping runtime values onto descriptor types

use crate::descriptor::TypeTag;
use crate::value::Value;

/// Determine the descriptor type of a value.
///
/// Total: every value gets a tag. Callables and records split on whether they
/// carry a class identity of their own (`instance`) or not (`function`,
/// `object`). Value kinds the taxonomy has no slot for become `unknown`.
pub fn classify(value: &Value) -> TypeTag {
    match value {
        Value::Undefined => TypeTag::Undefined,
        Value::Bool(_) => TypeTag::Boolean,
        Value::Number(_) => TypeTag::Number,
        Value::String(_) => TypeTag::String,
        Value::Symbol(_) => TypeTag::Symbol,
        Value::Function(func) => {
            if func.constructor.is_none() {
                TypeTag::Function
            } else {
                TypeTag::Instance
            }
        }
        Value::Null => TypeTag::Null,
        Value::Array(_) => TypeTag::Array,
        Value::RegExp(_) => TypeTag::Regexp,
        Value::Date(_) => TypeTag::Date,
        Value::Map(_) => TypeTag::Map,
        Value::Set(_) => TypeTag::Set,
        Value::Object(object) => {
            if object.borrow().is_plain() {
                TypeTag::Object
            } else {
                TypeTag::Instance
            }
        }
        Value::BigInt(_) => TypeTag::Unknown,
    }
}
