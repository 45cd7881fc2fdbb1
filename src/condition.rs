//! Condition grammar for `@if` and `} else if` clauses.
//!
//! ```text
//! condition  := '!' negated | comparison | path
//! negated    := '(' condition ')' | condition
//! comparison := path ' ' op ' ' operand
//! op         := '>=' | '<=' | '>' | '<' | '==' | '!='
//! operand    := path | literal
//! ```
//!
//! Operators are only recognised with exactly one space on each side, and are
//! tried in the order listed above rather than by position, so `a > b >= c`
//! splits on `>=`. The right operand is a path only when it mentions the scope
//! prefix; anything else is read as a literal.

use std::cmp::Ordering;
use std::fmt;

use crate::resolver::SCOPE_PREFIX;
use crate::value::{eq_ignore_case, Value};

const EPSILON: f64 = 1e-10;

/// Comparison operators, listed in matching priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
}

impl CompareOp {
    const ALL: [CompareOp; 6] =
        [CompareOp::Ge, CompareOp::Le, CompareOp::Gt, CompareOp::Lt, CompareOp::Eq, CompareOp::Ne];

    fn token(self) -> &'static str {
        match self {
            CompareOp::Ge => " >= ",
            CompareOp::Le => " <= ",
            CompareOp::Gt => " > ",
            CompareOp::Lt => " < ",
            CompareOp::Eq => " == ",
            CompareOp::Ne => " != ",
        }
    }

    fn test(self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Ge => compare(left, right) != Ordering::Less,
            CompareOp::Le => compare(left, right) != Ordering::Greater,
            CompareOp::Gt => compare(left, right) == Ordering::Greater,
            CompareOp::Lt => compare(left, right) == Ordering::Less,
            CompareOp::Eq => equals(left, right),
            CompareOp::Ne => !equals(left, right),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token().trim())
    }
}

/// Parsed condition tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Not(Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Literal(Value),
    Path(String),
}

impl Expr {
    /// Parses a condition. Parsing never fails: text that matches no other
    /// production becomes a path whose truthiness is tested.
    pub fn parse(condition: &str) -> Expr {
        let condition = condition.trim();

        if let Some(rest) = condition.strip_prefix('!') {
            let rest = rest.trim();
            let inner = rest
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .unwrap_or(rest);
            return Expr::Not(Box::new(Expr::parse(inner)));
        }

        for op in CompareOp::ALL {
            if let Some((left, right)) = condition.split_once(op.token()) {
                return Expr::Compare {
                    op,
                    left: Box::new(Expr::Path(left.trim().to_string())),
                    right: Box::new(Expr::operand(right.trim())),
                };
            }
        }

        Expr::Path(condition.to_string())
    }

    fn operand(text: &str) -> Expr {
        if text.contains(SCOPE_PREFIX) {
            Expr::Path(text.to_string())
        } else {
            Expr::Literal(parse_literal(text))
        }
    }

    /// Evaluates the tree, resolving paths through `resolve`.
    pub fn evaluate<F>(&self, resolve: &F) -> Value
    where
        F: Fn(&str) -> Value,
    {
        match self {
            Expr::Not(inner) => Value::Bool(!inner.test(resolve)),
            Expr::Compare { op, left, right } => {
                Value::Bool(op.test(&left.evaluate(resolve), &right.evaluate(resolve)))
            }
            Expr::Literal(value) => value.clone(),
            Expr::Path(path) => resolve(path),
        }
    }

    pub fn test<F>(&self, resolve: &F) -> bool
    where
        F: Fn(&str) -> Value,
    {
        is_truthy(&self.evaluate(resolve))
    }
}

/// Reads a right-hand literal: integer, float, boolean, `null`, else a string
/// with surrounding quotes removed.
pub fn parse_literal(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::Int(i);
    }
    if text.contains(|c: char| c.is_ascii_digit()) {
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
    }
    if eq_ignore_case(text, "true") {
        return Value::Bool(true);
    }
    if eq_ignore_case(text, "false") {
        return Value::Bool(false);
    }
    if text == "null" {
        return Value::Null;
    }
    Value::String(strip_quotes(text).to_string())
}

/// Removes one pair of matching single or double quotes.
pub fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Orders two values: null first, numbers numerically, everything else as
/// case-insensitive text.
pub fn compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => left.to_string().to_uppercase().cmp(&right.to_string().to_uppercase()),
        },
    }
}

/// Equality with a `1e-10` tolerance for numbers, so `0.1 + 0.2` equals `0.3`.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < EPSILON,
            _ => eq_ignore_case(&left.to_string(), &right.to_string()),
        },
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::String(s) => !s.is_empty(),
        Value::List(_) | Value::Map(_) | Value::Object(_) => value.len().map_or(true, |n| n > 0),
        _ => true,
    }
}
