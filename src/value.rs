//! The dynamically typed value that flows through scopes, the resolver and helpers.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::Result;

/// Ordered key/value mapping used for [`Value::Map`].
pub type Map = IndexMap<String, Value>;

/// Named-field access for host objects exposed to templates.
///
/// Context data that is not a plain map implements this trait to make its
/// fields reachable from dotted paths such as `${Context.Order.Total}`.
/// Lookups made by the resolver are case-insensitive: `field` is tried with the
/// name as written first, then against every entry of `field_names`.
pub trait Object: fmt::Debug + Send + Sync {
    /// Name used when the object itself is rendered or reported in logs.
    fn type_name(&self) -> &str;

    /// Returns the field with exactly this name.
    fn field(&self, name: &str) -> Option<Value>;

    /// All field names, used for case-insensitive fallback lookups.
    fn field_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Element count when the object behaves like a collection.
    fn len(&self) -> Option<usize> {
        None
    }

    /// String form used by `${...}` interpolation.
    fn render(&self) -> String {
        self.type_name().to_string()
    }
}

type Callable = dyn Fn(Value) -> Result<Value> + Send + Sync;

/// A callable value, produced by service lookups and invoked by `(...)` steps.
#[derive(Clone)]
pub struct Function {
    name: String,
    call: Arc<Callable>,
}

impl Function {
    pub fn new<S, F>(name: S, call: F) -> Self
    where
        S: Into<String>,
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            call: Arc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, argument: Value) -> Result<Value> {
        (self.call)(argument)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

/// A template value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Map(Map),
    Object(Arc<dyn Object>),
    Function(Function),
}

/// Case-insensitive key comparison shared by scopes, maps and objects.
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Looks a key up in a map, preferring an exact match.
pub(crate) fn map_lookup<'a>(map: &'a Map, key: &str) -> Option<&'a Value> {
    map.get(key)
        .or_else(|| map.iter().find(|(k, _)| eq_ignore_case(k, key)).map(|(_, v)| v))
}

/// Builds the `{Key, Value}` map used for map iteration and `first`/`last`.
pub(crate) fn entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert("Key".to_string(), Value::String(key.to_string()));
    map.insert("Value".to_string(), value);
    Value::Map(map)
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Decimal(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Element count for list-like values, `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            Value::Object(obj) => obj.len(),
            _ => None,
        }
    }

    /// True for null, the empty string and empty collections.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            other => other.len() == Some(0),
        }
    }

    /// Navigates one dotted-path segment. Never fails; absence is `None`.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map_lookup(map, name).cloned(),
            Value::Object(obj) => obj.field(name).or_else(|| {
                obj.field_names()
                    .iter()
                    .find(|candidate| eq_ignore_case(candidate, name))
                    .and_then(|candidate| obj.field(candidate))
            }),
            Value::List(items) => {
                if eq_ignore_case(name, "Count") || eq_ignore_case(name, "Length") {
                    Some(Value::Int(items.len() as i64))
                } else {
                    name.parse::<usize>().ok().and_then(|i| items.get(i).cloned())
                }
            }
            Value::String(s) if eq_ignore_case(name, "Length") => {
                Some(Value::Int(s.chars().count() as i64))
            }
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(&a.call, &b.call),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Object(obj) => f.write_str(&obj.render()),
            Value::Function(func) => write!(f, "{}()", func.name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(d) = n.as_u64().and_then(Decimal::from_u64) {
                    Value::Decimal(d)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    Decimal => Decimal,
    String => String,
    &str => String,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    Map => Map,
    Function => Function,
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<Arc<dyn Object>> for Value {
    fn from(value: Arc<dyn Object>) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
