use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use stencil::{Error, HelperRegistry, Map, Value};

fn apply(value: impl Into<Value>, name: &str, argument: Option<&str>) -> Value {
    HelperRegistry::new().apply(&value.into(), name, argument).unwrap()
}

fn text(s: &str) -> Value {
    Value::from(s)
}

fn list(items: &[&str]) -> Value {
    Value::List(items.iter().map(|s| Value::from(*s)).collect())
}

fn timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(14, 7, 9).unwrap()
}

#[test]
fn test_case_helpers() {
    assert_eq!(apply("john doe", "upper", None), text("JOHN DOE"));
    assert_eq!(apply("MiXeD", "lower", None), text("mixed"));
    assert_eq!(apply("  padded \n", "trim", None), text("padded"));
    assert_eq!(apply("hello", "capitalize", None), text("Hello"));
    assert_eq!(apply("", "capitalize", None), text(""));
    assert_eq!(apply("a", "capitalize", None), text("A"));
}

#[test]
fn test_helper_names_ignore_case() {
    assert_eq!(apply("abc", "UPPER", None), text("ABC"));
    assert!(HelperRegistry::new().exists("PadLeft"));
    assert!(!HelperRegistry::new().exists("nope"));
}

#[test]
fn test_word_case_helpers() {
    assert_eq!(apply("hello_world", "camelcase", None), text("helloWorld"));
    assert_eq!(apply("hello_world", "pascalcase", None), text("HelloWorld"));

    for input in ["hello world", "hello-world", "HelloWorld"] {
        assert_eq!(apply(input, "camelcase", None), text("helloWorld"), "{input}");
        assert_eq!(apply(input, "pascalcase", None), text("HelloWorld"), "{input}");
    }
}

#[test]
fn test_string_helpers_pass_null_through() {
    assert_eq!(apply(Value::Null, "upper", None), Value::Null);
    assert_eq!(apply(Value::Null, "padleft", Some("3")), Value::Null);
}

#[test]
fn test_truncate() {
    assert_eq!(apply("Hello World", "truncate", Some("8")), text("Hello..."));
    assert_eq!(apply("Hi", "truncate", Some("5")), text("Hi"));
    assert_eq!(apply("Hello", "truncate", None), text("Hello"));
}

#[test]
fn test_replace() {
    assert_eq!(apply("a-b-c", "replace", Some("-,_")), text("a_b_c"));
    assert_eq!(apply("a-b-c", "replace", Some("-")), text("abc"));
    assert_eq!(apply("abc", "replace", None), text("abc"));
}

#[test]
fn test_padding() {
    assert_eq!(apply("7", "padleft", Some("3,0")), text("007"));
    assert_eq!(apply(7, "padleft", Some("3,0")), text("007"));
    assert_eq!(apply("ab", "padright", Some("4")), text("ab  "));
    assert_eq!(apply("long", "padleft", Some("2")), text("long"));
}

#[test]
fn test_date_formatting() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    assert_eq!(apply(date, "format", Some("dd/MM/yyyy")), text("05/03/2024"));
    assert_eq!(apply(date, "date", None), text("2024-03-05"));
    assert_eq!(apply(date, "date", Some("MMM d, yyyy")), text("Mar 5, 2024"));
    assert_eq!(apply(timestamp(), "format", Some("HH:mm:ss")), text("14:07:09"));
    assert_eq!(apply(timestamp(), "format", Some("h:mm tt")), text("2:07 PM"));
}

#[test]
fn test_date_parses_strings() {
    assert_eq!(
        apply("2024-03-05T10:20:30", "date", Some("yyyy/MM/dd HH:mm")),
        text("2024/03/05 10:20")
    );
    assert_eq!(apply("not a date", "date", None), text("not a date"));
}

#[test]
fn test_number_formatting() {
    assert_eq!(apply(1234.567, "format", Some("N2")), text("1,234.57"));
    assert_eq!(apply(5, "format", Some("0.00")), text("5.00"));
    assert_eq!(apply(1234567, "format", Some("#,##0")), text("1,234,567"));
    assert_eq!(apply(0.256, "format", Some("P1")), text("25.6%"));
    assert_eq!(apply(42, "format", Some("D4")), text("0042"));
    assert_eq!(apply(2.5, "format", Some("F0")), text("3"));
    assert_eq!(apply("abc", "format", Some("N2")), text("abc"));
}

#[test]
fn test_percent_overflow_falls_back_to_plain_text() {
    let huge = 1e27_f64;
    assert_eq!(apply(huge, "format", Some("0%")), text(&huge.to_string()));
    assert_eq!(apply(huge, "format", Some("P0")), text(&huge.to_string()));
    assert_eq!(apply(huge, "number", Some("P0")), Value::Float(huge));
}

#[test]
fn test_number_defaults_to_two_places() {
    assert_eq!(apply(1234, "number", None), text("1,234.00"));
    assert_eq!(apply("abc", "number", None), text("abc"));
}

#[test]
fn test_rounding() {
    assert_eq!(apply(3.14159, "round", Some("2")), Value::Float(3.14));
    assert_eq!(apply(2.5, "round", None), Value::Float(2.0));
    assert_eq!(apply(3.5, "round", None), Value::Float(4.0));
    assert_eq!(
        apply(Decimal::new(12345, 3), "round", Some("1")),
        Value::Decimal(Decimal::new(123, 1))
    );
    assert_eq!(apply(7, "round", Some("2")), Value::Int(7));
    assert_eq!(apply("x", "round", None), text("x"));
    assert_eq!(apply(2.7, "floor", None), Value::Float(2.0));
    assert_eq!(apply(2.1, "ceiling", None), Value::Float(3.0));
    assert_eq!(apply(2.1, "ceil", None), Value::Float(3.0));
}

#[test]
fn test_round_leaves_large_floats_alone() {
    assert_eq!(apply(1e307, "round", Some("3")), Value::Float(1e307));
    assert_eq!(apply(-1e300, "round", Some("15")), Value::Float(-1e300));
    assert_eq!(apply(1e16, "round", Some("2")), Value::Float(1e16));
    assert_eq!(apply(1234.5678, "round", Some("2")), Value::Float(1234.57));
}

#[test]
fn test_json() {
    let born = NaiveDate::from_ymd_opt(1815, 12, 10).unwrap();
    let mut map = Map::new();
    map.insert("Name".to_string(), text("Ada"));
    map.insert("Tags".to_string(), list(&["a", "b"]));
    map.insert("Age".to_string(), Value::Int(36));
    map.insert("Born".to_string(), Value::from(born));

    assert_eq!(
        apply(map, "json", None),
        text(r#"{"Name":"Ada","Tags":["a","b"],"Age":36,"Born":"1815-12-10"}"#)
    );
    assert_eq!(apply(r#"say "hi""#, "json", None), text(r#""say \"hi\"""#));
    assert_eq!(apply(Value::Null, "json", None), text("null"));
    assert_eq!(apply(true, "json", None), text("true"));
}

#[test]
fn test_count() {
    assert_eq!(apply(Value::Null, "count", None), Value::Int(0));
    assert_eq!(apply("abc", "count", None), Value::Int(3));
    assert_eq!(apply(list(&["a", "b", "c"]), "count", None), Value::Int(3));
    assert_eq!(apply(5, "count", None), Value::Int(1));
    assert_eq!(apply(list(&["a"]), "length", None), Value::Int(1));
}

#[test]
fn test_first_and_last() {
    assert_eq!(apply("abc", "first", None), text("a"));
    assert_eq!(apply("abc", "last", None), text("c"));
    assert_eq!(apply(list(&["x", "y"]), "first", None), text("x"));
    assert_eq!(apply(list(&["x", "y"]), "last", None), text("y"));
    assert_eq!(apply(list(&[]), "first", None), Value::Null);
    assert_eq!(apply(Value::Null, "last", None), Value::Null);

    let mut map = Map::new();
    map.insert("Mode".to_string(), text("fast"));
    let first = apply(map, "first", None);
    assert_eq!(first.get_field("Key"), Some(text("Mode")));
    assert_eq!(first.get_field("Value"), Some(text("fast")));
}

#[test]
fn test_join_and_reverse() {
    assert_eq!(apply(list(&["a", "b"]), "join", None), text("a, b"));
    assert_eq!(apply(list(&["a", "b"]), "join", Some("-")), text("a-b"));
    assert_eq!(apply("ab", "join", Some("-")), text("ab"));
    assert_eq!(apply("abc", "reverse", None), text("cba"));
    assert_eq!(apply(list(&["a", "b"]), "reverse", None), list(&["b", "a"]));
    assert_eq!(apply(5, "reverse", None), Value::Int(5));
}

#[test]
fn test_default() {
    assert_eq!(apply(Value::Null, "default", Some("n/a")), text("n/a"));
    assert_eq!(apply("", "default", Some("n/a")), text("n/a"));
    assert_eq!(apply(list(&[]), "ifempty", Some("none")), text("none"));
    assert_eq!(apply("x", "default", Some("n/a")), text("x"));
    assert_eq!(apply(0, "default", Some("n/a")), Value::Int(0));
}

#[test]
fn test_yesno() {
    assert_eq!(apply(true, "yesno", None), text("Yes"));
    assert_eq!(apply(0, "yesno", None), text("No"));
    assert_eq!(apply(false, "yesno", Some("On,Off")), text("Off"));
    assert_eq!(apply(true, "yesno", Some("Y")), text("Y"));
    assert_eq!(apply(false, "yesno", Some("Y")), text("No"));
}

#[test]
fn test_unknown_helper_passes_value_through() {
    assert_eq!(apply("as is", "sparkle", Some("x")), text("as is"));
}

#[test]
fn test_registered_helper_overrides_builtin() {
    let mut registry = HelperRegistry::new();
    registry.register("upper", |value, _| Ok(Value::String(format!("<{value}>"))));
    registry.register("Wrap", |value, arg| {
        Ok(Value::String(format!("{0}{value}{0}", arg.unwrap_or("*"))))
    });

    assert_eq!(registry.apply(&text("a"), "upper", None).unwrap(), text("<a>"));
    assert_eq!(registry.apply(&text("a"), "wrap", Some("_")).unwrap(), text("_a_"));
    assert!(registry.names().contains(&"wrap".to_string()));
}

#[test]
fn test_failing_helper_returns_error() {
    let mut registry = HelperRegistry::new();
    registry.register("strict", |_, _| {
        Err(Error::HelperError {
            name: "strict".to_string(),
            message: "no".to_string(),
        })
    });

    let result = registry.apply(&text("a"), "strict", None);
    assert!(matches!(result, Err(Error::HelperError { name, .. }) if name == "strict"));
}
