//! Value-transform helpers applied through `${expr | name:argument}` pipes.
//!
//! The module is structured as:
//! - `string`: case conversion, trimming, truncation, replacement and padding
//! - `format`: date and number formatting, rounding, JSON output
//! - `collection`: counting, first/last, joining and reversing
//! - `conditional`: fallbacks for blank values and yes/no labels
//!
//! Every registry shares one immutable table of built-ins and layers its own
//! registrations on top, so two renderers never see each other's helpers.

use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use log::trace;

use crate::error::Result;
use crate::value::Value;

mod collection;
mod conditional;
mod format;
mod string;

pub use format::{format_date, format_number};

/// A helper: `(value, argument) -> value`.
pub type Helper = Arc<dyn Fn(&Value, Option<&str>) -> Result<Value> + Send + Sync>;

type Builtin = fn(&Value, Option<&str>) -> Value;

static BUILTINS: LazyLock<IndexMap<&'static str, Builtin>> = LazyLock::new(|| {
    let table: [(&'static str, Builtin); 27] = [
        ("upper", string::upper),
        ("lower", string::lower),
        ("trim", string::trim),
        ("capitalize", string::capitalize),
        ("camelcase", string::camelcase),
        ("pascalcase", string::pascalcase),
        ("truncate", string::truncate),
        ("replace", string::replace),
        ("padleft", string::padleft),
        ("padright", string::padright),
        ("format", format::format),
        ("date", format::date),
        ("number", format::number),
        ("round", format::round),
        ("floor", format::floor),
        ("ceiling", format::ceiling),
        ("json", format::json),
        ("count", collection::count),
        ("first", collection::first),
        ("last", collection::last),
        ("join", collection::join),
        ("reverse", collection::reverse),
        ("default", conditional::default),
        ("ifempty", conditional::default),
        ("yesno", conditional::yesno),
        ("ceil", format::ceiling),
        ("length", collection::count),
    ];
    table.into_iter().collect()
});

/// Helper table consulted by the resolver's pipe stage.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    overrides: IndexMap<String, Helper>,
}

impl std::fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a helper, replacing any built-in or earlier registration of the same name.
    pub fn register<F>(&mut self, name: &str, helper: F)
    where
        F: Fn(&Value, Option<&str>) -> Result<Value> + Send + Sync + 'static,
    {
        self.overrides.insert(name.to_lowercase(), Arc::new(helper));
    }

    pub fn exists(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.overrides.contains_key(&name) || BUILTINS.contains_key(name.as_str())
    }

    /// Names of every helper visible through this registry.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTINS.keys().map(|k| k.to_string()).collect();
        for name in self.overrides.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Applies the named helper. Unknown names leave the value untouched.
    pub fn apply(&self, value: &Value, name: &str, argument: Option<&str>) -> Result<Value> {
        let key = name.to_lowercase();
        if let Some(helper) = self.overrides.get(&key) {
            return helper(value, argument);
        }
        match BUILTINS.get(key.as_str()) {
            Some(builtin) => Ok(builtin(value, argument)),
            None => {
                trace!("Unknown helper '{}', value passed through", name);
                Ok(value.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_are_local_to_registry() {
        let mut custom = HelperRegistry::new();
        custom.register("upper", |_, _| Ok(Value::from("shadowed")));

        let stock = HelperRegistry::new();
        let value = Value::from("abc");
        assert_eq!(custom.apply(&value, "upper", None).unwrap(), Value::from("shadowed"));
        assert_eq!(stock.apply(&value, "upper", None).unwrap(), Value::from("ABC"));
    }

    #[test]
    fn test_names_include_overrides_once() {
        let mut registry = HelperRegistry::new();
        registry.register("slug", |v, _| Ok(v.clone()));
        registry.register("upper", |v, _| Ok(v.clone()));
        let names = registry.names();
        assert!(names.contains(&"slug".to_string()));
        assert_eq!(names.iter().filter(|n| *n == "upper").count(), 1);
    }
}
