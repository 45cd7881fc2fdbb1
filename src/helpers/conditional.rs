//! Fallback and labelling helpers.

use crate::condition::is_truthy;
use crate::value::Value;

/// `default:fallback` and `ifempty:fallback`.
pub(super) fn default(value: &Value, argument: Option<&str>) -> Value {
    if value.is_blank() {
        Value::String(argument.unwrap_or_default().to_string())
    } else {
        value.clone()
    }
}

pub(super) fn yesno(value: &Value, argument: Option<&str>) -> Value {
    let (yes, no) = match argument {
        Some(labels) => labels.split_once(',').unwrap_or((labels, "No")),
        None => ("Yes", "No"),
    };
    Value::String(if is_truthy(value) { yes } else { no }.to_string())
}
