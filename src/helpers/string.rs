//! String helpers. Non-string input is converted to its display form first;
//! null passes through untouched.

use crate::value::Value;

fn map_text<F>(value: &Value, f: F) -> Value
where
    F: FnOnce(&str) -> String,
{
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(f(s)),
        other => Value::String(f(&other.to_string())),
    }
}

pub(super) fn upper(value: &Value, _: Option<&str>) -> Value {
    map_text(value, str::to_uppercase)
}

pub(super) fn lower(value: &Value, _: Option<&str>) -> Value {
    map_text(value, str::to_lowercase)
}

pub(super) fn trim(value: &Value, _: Option<&str>) -> Value {
    map_text(value, |s| s.trim().to_string())
}

pub(super) fn capitalize(value: &Value, _: Option<&str>) -> Value {
    map_text(value, |s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    })
}

pub(super) fn camelcase(value: &Value, _: Option<&str>) -> Value {
    map_text(value, cruet::to_camel_case)
}

pub(super) fn pascalcase(value: &Value, _: Option<&str>) -> Value {
    map_text(value, cruet::to_pascal_case)
}

pub(super) fn truncate(value: &Value, argument: Option<&str>) -> Value {
    let Some(limit) = argument.and_then(|a| a.trim().parse::<usize>().ok()) else {
        return value.clone();
    };
    map_text(value, |s| {
        if s.chars().count() <= limit {
            s.to_string()
        } else {
            let mut out: String = s.chars().take(limit.saturating_sub(3)).collect();
            out.push_str("...");
            out
        }
    })
}

pub(super) fn replace(value: &Value, argument: Option<&str>) -> Value {
    let Some(argument) = argument else {
        return value.clone();
    };
    let (from, to) = argument.split_once(',').unwrap_or((argument, ""));
    if from.is_empty() {
        return value.clone();
    }
    map_text(value, |s| s.replace(from, to))
}

/// Parses `N[,ch]`; the pad character defaults to a space.
fn pad_spec(argument: Option<&str>) -> Option<(usize, char)> {
    let argument = argument?;
    let (width, fill) = match argument.split_once(',') {
        Some((width, fill)) => (width, fill.chars().next().unwrap_or(' ')),
        None => (argument, ' '),
    };
    width.trim().parse().ok().map(|w| (w, fill))
}

fn pad(value: &Value, argument: Option<&str>, left: bool) -> Value {
    let Some((width, fill)) = pad_spec(argument) else {
        return value.clone();
    };
    map_text(value, |s| {
        let missing = width.saturating_sub(s.chars().count());
        let padding: String = std::iter::repeat(fill).take(missing).collect();
        if left {
            padding + s
        } else {
            format!("{s}{padding}")
        }
    })
}

pub(super) fn padleft(value: &Value, argument: Option<&str>) -> Value {
    pad(value, argument, true)
}

pub(super) fn padright(value: &Value, argument: Option<&str>) -> Value {
    pad(value, argument, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_spec() {
        assert_eq!(pad_spec(Some("5")), Some((5, ' ')));
        assert_eq!(pad_spec(Some("3,0")), Some((3, '0')));
        assert_eq!(pad_spec(Some("3,")), Some((3, ' ')));
        assert_eq!(pad_spec(Some("x")), None);
        assert_eq!(pad_spec(None), None);
    }

    #[test]
    fn test_null_passes_through() {
        assert_eq!(upper(&Value::Null, None), Value::Null);
        assert_eq!(truncate(&Value::Null, Some("2")), Value::Null);
    }
}
