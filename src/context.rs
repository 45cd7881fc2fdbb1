//! Loading template variables for the root scope.
//! Context documents may be JSON or YAML; the top-level mapping becomes the
//! scope's variables in document order.

use std::path::Path;

use indexmap::IndexMap;
use log::debug;

use crate::error::{Error, Result};
use crate::scope::Scope;
use crate::value::Value;

/// Parses a JSON or YAML mapping into `scope`.
///
/// # Arguments
/// * `content` - Raw context document
/// * `scope` - Scope receiving one variable per top-level key
///
/// # Errors
/// * `Error::ContextError` if the content is neither a JSON nor a YAML mapping
pub fn parse_context(content: &str, scope: &mut Scope) -> Result<()> {
    if content.trim().is_empty() {
        return Ok(());
    }

    // Try parsing as JSON first, explicitly as IndexMap
    let variables: IndexMap<String, serde_json::Value> = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => serde_yaml::from_str(content)
            .map_err(|e| Error::ContextError(format!("Invalid context format: {e}")))?,
    };

    for (key, value) in variables {
        scope.set(&key, Value::from(value));
    }
    Ok(())
}

/// Reads a context file and parses it into `scope`.
pub fn load_context<P: AsRef<Path>>(path: P, scope: &mut Scope) -> Result<()> {
    let path = path.as_ref();
    debug!("Loading context from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(Error::IoError)?;
    parse_context(&content, scope)
}

/// Parses a `KEY=VALUE` assignment. The value is read as JSON when it parses,
/// otherwise it is kept as a plain string.
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment.split_once('=').ok_or_else(|| {
        Error::ContextError(format!("Expected KEY=VALUE, got '{assignment}'"))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::ContextError(format!("Missing key in '{assignment}'")));
    }
    let value = serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Applies `KEY=VALUE` assignments on top of whatever `scope` already holds.
pub fn apply_assignments<S: AsRef<str>>(scope: &mut Scope, assignments: &[S]) -> Result<()> {
    for assignment in assignments {
        let (key, value) = parse_assignment(assignment.as_ref())?;
        debug!("Overriding '{}'", key);
        scope.set(&key, value);
    }
    Ok(())
}
