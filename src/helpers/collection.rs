//! Collection helpers. Strings count as character sequences for `count`,
//! `first`, `last` and `reverse`, but are not joined.

use crate::value::{entry, Value};

pub(super) fn count(value: &Value, _: Option<&str>) -> Value {
    let n = match value {
        Value::Null => 0,
        Value::String(s) => s.chars().count(),
        other => other.len().unwrap_or(1),
    };
    Value::from(n)
}

fn pick(value: &Value, from_end: bool) -> Value {
    match value {
        Value::String(s) => {
            let c = if from_end {
                s.chars().next_back()
            } else {
                s.chars().next()
            };
            c.map(|c| Value::String(c.to_string())).unwrap_or(Value::Null)
        }
        Value::List(items) => {
            let item = if from_end {
                items.last()
            } else {
                items.first()
            };
            item.cloned().unwrap_or(Value::Null)
        }
        Value::Map(map) => {
            let pair = if from_end { map.last() } else { map.first() };
            pair.map(|(k, v)| entry(k, v.clone())).unwrap_or(Value::Null)
        }
        other => other.clone(),
    }
}

pub(super) fn first(value: &Value, _: Option<&str>) -> Value {
    pick(value, false)
}

pub(super) fn last(value: &Value, _: Option<&str>) -> Value {
    pick(value, true)
}

pub(super) fn join(value: &Value, argument: Option<&str>) -> Value {
    let separator = argument.unwrap_or(", ");
    let parts: Vec<String> = match value {
        Value::List(items) => items.iter().map(Value::to_string).collect(),
        Value::Map(map) => map.values().map(Value::to_string).collect(),
        other => return other.clone(),
    };
    Value::String(parts.join(separator))
}

pub(super) fn reverse(value: &Value, _: Option<&str>) -> Value {
    match value {
        Value::String(s) => Value::String(s.chars().rev().collect()),
        Value::List(items) => Value::List(items.iter().rev().cloned().collect()),
        other => other.clone(),
    }
}
