//! Hierarchical execution scope: variables, services and the iteration cursor.
//!
//! Children are snapshots. [`Scope::create_child`] copies the parent's
//! variables and services at creation time; from then on the two scopes are
//! independent in both directions.

use std::sync::Arc;

use indexmap::IndexMap;
use log::trace;

use crate::error::Result;
use crate::value::{Function, Value};

/// Variable mirroring the item on top of the cursor stack.
pub const CURRENT: &str = "Current";
/// Variable mirroring the index on top of the cursor stack.
pub const CURRENT_INDEX: &str = "CurrentIndex";
/// Variable mirroring the key on top of the cursor stack.
pub const CURRENT_KEY: &str = "CurrentKey";

/// A named transform that can be registered as a service in one call.
pub trait NamedService: Send + Sync {
    fn name(&self) -> &str;
    fn invoke(&self, argument: Value) -> Result<Value>;
}

/// Insertion-ordered map with case-insensitive keys that remembers the
/// spelling used on the most recent insert.
#[derive(Clone, Debug)]
struct CaseInsensitiveMap<V> {
    entries: IndexMap<String, (String, V)>,
}

impl<V> Default for CaseInsensitiveMap<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> CaseInsensitiveMap<V> {
    fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(&key.to_lowercase()).map(|(_, v)| v)
    }

    fn insert(&mut self, key: &str, value: V) {
        self.entries.insert(key.to_lowercase(), (key.to_string(), value));
    }

    fn remove(&mut self, key: &str) {
        self.entries.shift_remove(&key.to_lowercase());
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(k, _)| k.as_str())
    }
}

fn lookup_service(services: &CaseInsensitiveMap<Function>, name: &str) -> Function {
    match services.get(name) {
        Some(service) => service.clone(),
        None => {
            trace!("Service '{}' is not registered", name);
            let message = format!("{name} not registered");
            Function::new(name, move |_| Ok(Value::String(message.clone())))
        }
    }
}

/// One entry of the iteration cursor stack.
#[derive(Clone, Debug, PartialEq)]
pub struct Cursor {
    pub item: Value,
    pub index: usize,
    pub key: Option<String>,
}

/// Variable and service store for a single render.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    key: Option<String>,
    parent: Option<String>,
    variables: CaseInsensitiveMap<Value>,
    services: CaseInsensitiveMap<Function>,
    cursors: Vec<Cursor>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scope carrying an identifying key.
    pub fn with_key<S: Into<String>>(key: S) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Key of the scope this one was created from, `None` for a root scope or
    /// an unkeyed parent. Diagnostic only.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn set<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.variables.insert(key, value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.variables.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variables.keys()
    }

    /// Snapshot-copies variables and services into a new scope.
    ///
    /// The cursor stack is not inherited, although the mirrored `Current*`
    /// variables are copied like any other variable.
    pub fn create_child(&self, key: Option<&str>) -> Scope {
        Scope {
            key: key.map(str::to_string),
            parent: self.key.clone(),
            variables: self.variables.clone(),
            services: self.services.clone(),
            cursors: Vec::new(),
        }
    }

    pub fn push_cursor<V: Into<Value>>(&mut self, item: V, index: usize, key: Option<&str>) {
        self.cursors.push(Cursor {
            item: item.into(),
            index,
            key: key.map(str::to_string),
        });
        self.sync_cursor();
    }

    pub fn pop_cursor(&mut self) -> Option<Cursor> {
        let popped = self.cursors.pop();
        self.sync_cursor();
        popped
    }

    pub fn current(&self) -> Option<&Value> {
        self.cursors.last().map(|c| &c.item)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.cursors.last().map(|c| c.index)
    }

    pub fn current_key(&self) -> Option<&str> {
        self.cursors.last().and_then(|c| c.key.as_deref())
    }

    fn sync_cursor(&mut self) {
        match self.cursors.last().cloned() {
            Some(top) => {
                self.variables.insert(CURRENT, top.item);
                self.variables.insert(CURRENT_INDEX, top.index.into());
                self.variables.insert(CURRENT_KEY, Value::from(top.key));
            }
            None => {
                self.variables.remove(CURRENT);
                self.variables.remove(CURRENT_INDEX);
                self.variables.remove(CURRENT_KEY);
            }
        }
    }

    /// Binds a function under `name`, replacing any earlier binding.
    pub fn register_service<F>(&mut self, name: &str, service: F)
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.services.insert(name, Function::new(name, service));
    }

    /// Binds a [`NamedService`] under its own name.
    pub fn register_service_instance(&mut self, service: Arc<dyn NamedService>) {
        let name = service.name().to_string();
        self.services.insert(&name, Function::new(name.as_str(), move |arg| service.invoke(arg)));
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.services.contains(name)
    }

    /// Looks a service up by name.
    ///
    /// A missing service yields a function returning `"<name> not registered"`
    /// so templates render a visible placeholder instead of failing.
    pub fn service(&self, name: &str) -> Function {
        lookup_service(&self.services, name)
    }

    /// Callable behind the `Services('name')` syntax: takes a service name and
    /// returns the bound function. Captures the services as they are now.
    pub fn services_accessor(&self) -> Function {
        let services = self.services.clone();
        Function::new("Services", move |name| {
            Ok(Value::Function(lookup_service(&services, &name.to_string())))
        })
    }

    /// Copies the named variables from `other`, skipping keys it does not have.
    pub fn merge(&mut self, other: &Scope, keys: &[&str]) {
        for key in keys {
            if let Some(value) = other.get(key) {
                self.variables.insert(key, value.clone());
            }
        }
    }
}
