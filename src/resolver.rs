//! Expression resolution and `${...}` interpolation.
//!
//! Expressions are dotted paths rooted at a scope variable, optionally written
//! with the `Context.` prefix. A path may contain call steps:
//!
//! - `name('literal')` navigates to `name` and invokes it with a string
//! - `('literal')` invokes the current value with a string
//! - `(Context.Path)` invokes the current value with a resolved expression
//!
//! so `Services('slug')('Hello World')` looks up the `slug` service and calls
//! it. Lookups never fail: a missing segment, a non-callable value or a failed
//! call all resolve to null.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::condition::strip_quotes;
use crate::error::Result;
use crate::helpers::HelperRegistry;
use crate::scope::Scope;
use crate::value::{eq_ignore_case, Value};

/// Leading path segment that names the root scope.
pub const SCOPE_PREFIX: &str = "Context";

/// Root segment resolving to the service lookup function.
const SERVICES: &str = "Services";

static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(.*?)\}").expect("interpolation pattern is valid"));

static LITERAL_GET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^Context\s*\.\s*Get\(\s*["']([^"']*)["']\s*\)(.*)$"#)
        .expect("literal lookup pattern is valid")
});

#[derive(Debug, PartialEq)]
enum Argument<'s> {
    Literal(&'s str),
    Expression(&'s str),
}

#[derive(Debug, PartialEq)]
enum Step<'s> {
    Member(&'s str),
    Call(Argument<'s>),
}

/// Splits a path into member and call steps.
fn parse_steps(path: &str) -> Vec<Step<'_>> {
    let bytes = path.as_bytes();
    let mut steps = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'.' | b' ' | b'\t' => i += 1,
            b'(' => {
                let close = matching_paren(bytes, i).unwrap_or(bytes.len());
                let inner = path[i + 1..close].trim();
                let unquoted = strip_quotes(inner);
                let argument = if unquoted.len() != inner.len() {
                    Argument::Literal(unquoted)
                } else {
                    Argument::Expression(inner)
                };
                steps.push(Step::Call(argument));
                i = close + 1;
            }
            _ => {
                let end = path[i..]
                    .find(['.', '('])
                    .map_or(bytes.len(), |offset| i + offset);
                steps.push(Step::Member(path[i..end].trim()));
                i = end;
            }
        }
    }
    steps
}

/// Index of the `)` closing the `(` at `open`, skipping quoted text.
pub(crate) fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'\'' | b'"') => quote = Some(b),
            (None, b'(') => depth += 1,
            (None, b')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn lookup_root(name: &str, scope: &Scope) -> Value {
    if let Some(value) = scope.get(name) {
        return value.clone();
    }
    if eq_ignore_case(name, SERVICES) {
        return Value::Function(scope.services_accessor());
    }
    if scope.has_service(name) {
        return Value::Function(scope.service(name));
    }
    Value::Null
}

fn invoke(target: &Value, argument: &Argument<'_>, scope: &Scope) -> Value {
    let Value::Function(function) = target else {
        debug!("Cannot invoke non-callable value '{}'", target);
        return Value::Null;
    };
    let argument = match argument {
        Argument::Literal(text) => Value::String(text.to_string()),
        Argument::Expression(expr) => resolve_expression(expr, scope),
    };
    match function.call(argument) {
        Ok(value) => value,
        Err(err) => {
            debug!("Invocation of '{}' failed: {}", function.name(), err);
            Value::Null
        }
    }
}

/// Walks `steps` starting from `current`, stopping at the first null.
fn navigate(mut current: Value, steps: &[Step<'_>], scope: &Scope) -> Value {
    for step in steps {
        if current.is_null() {
            break;
        }
        current = match step {
            Step::Member(name) => current.get_field(name).unwrap_or_default(),
            Step::Call(argument) => invoke(&current, argument, scope),
        };
    }
    current
}

fn resolve_path(path: &str, scope: &Scope) -> Value {
    let steps = parse_steps(path);
    match steps.split_first() {
        Some((Step::Member(root), rest)) => navigate(lookup_root(root, scope), rest, scope),
        _ => Value::Null,
    }
}

/// Resolves an expression to a value.
pub fn resolve_expression(expr: &str, scope: &Scope) -> Value {
    let expr = expr.trim();
    if expr.is_empty() {
        return Value::Null;
    }

    if let Some(caps) = LITERAL_GET.captures(expr) {
        let key = caps.get(1).map_or("", |m| m.as_str());
        let rest = caps.get(2).map_or("", |m| m.as_str());
        let base = scope.get(key).cloned().unwrap_or_default();
        return navigate(base, &parse_steps(rest), scope);
    }

    let path = expr
        .strip_prefix(SCOPE_PREFIX)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(expr);
    resolve_path(path, scope)
}

/// Substitutes `${...}` spans, applying pipes and `??` fallbacks.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    helpers: &'a HelperRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(helpers: &'a HelperRegistry) -> Self {
        Self { helpers }
    }

    pub fn resolve_expression(&self, expr: &str, scope: &Scope) -> Value {
        resolve_expression(expr, scope)
    }

    /// Replaces every `${...}` span in `text`.
    ///
    /// # Errors
    /// * `Error::HelperError` if a registered helper fails
    pub fn resolve_string(&self, text: &str, scope: &Scope) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in INTERPOLATION.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.resolve_span(inner.as_str(), scope)?);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Resolves the inside of one `${...}`.
    ///
    /// `??` is honoured only when the span has no pipe; with a pipe present the
    /// whole span is treated as a pipe chain.
    fn resolve_span(&self, inner: &str, scope: &Scope) -> Result<String> {
        if !inner.contains('|') {
            if let Some((expr, fallback)) = inner.split_once("??") {
                let value = resolve_expression(expr, scope);
                return Ok(if value.is_null() || value.as_str() == Some("") {
                    strip_quotes(fallback.trim()).to_string()
                } else {
                    value.to_string()
                });
            }
        }

        let mut stages = inner.split('|');
        let mut value = resolve_expression(stages.next().unwrap_or_default(), scope);
        for stage in stages.map(str::trim).filter(|s| !s.is_empty()) {
            let (name, argument) = match stage.split_once(':') {
                Some((name, argument)) => (name.trim(), Some(strip_quotes(argument.trim()))),
                None => (stage, None),
            };
            value = self.helpers.apply(&value, name, argument)?;
        }
        Ok(value.to_string())
    }
}
