//! Control-flow processing and the top-level `render` entry point.
//!
//! Rendering strips `@* ... *@` comments, then walks the template line by
//! line. A line starting (after indentation) with `@if` or `@foreach` opens a
//! region; every other line is plain text resolved for `${...}` spans.
//!
//! Regions are found by counting braces from the header's `{`:
//!
//! ```text
//! @if (Context.Score >= 90) {
//! A
//! } else if (Context.Score >= 80) {
//! B
//! } else {
//! C
//! }
//! ```
//!
//! A region whose closing brace never arrives runs to the end of the input.
//! The chosen clause or each loop iteration is rendered recursively, so
//! regions nest freely up to the renderer's depth limit. Once every region is
//! expanded, the whole output gets one more interpolation pass against the
//! root scope, resolving any `${...}` that expansion produced.

use std::borrow::Cow;
use std::sync::LazyLock;

use log::{debug, trace};
use regex::Regex;

use crate::condition::Expr;
use crate::error::{Error, Result};
use crate::helpers::HelperRegistry;
use crate::resolver::{matching_paren, resolve_expression, Resolver};
use crate::scope::Scope;
use crate::value::{entry, Value};

/// Default limit on nested region depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

const IF_KEYWORD: &str = "@if";
const FOREACH_KEYWORD: &str = "@foreach";

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)@\*.*?\*@").expect("comment pattern is valid"));

static FOREACH_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^var\s+(\w+)\s+in\s+(.+?)$").expect("foreach header pattern is valid")
});

/// Removes `@* ... *@` comments, including ones spanning several lines.
pub fn strip_comments(text: &str) -> Cow<'_, str> {
    COMMENT.replace_all(text, "")
}

/// One `if` / `else if` / `else` alternative. `condition` is `None` for `else`.
#[derive(Debug, PartialEq)]
struct Clause<'t> {
    condition: Option<&'t str>,
    body: &'t str,
}

#[derive(Debug, PartialEq)]
enum Region<'t> {
    Conditional { clauses: Vec<Clause<'t>> },
    Iteration {
        variable: &'t str,
        collection: &'t str,
        body: &'t str,
    },
}

/// States of the conditional chain scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    ScanningHeader,
    AccumulatingBody,
    Done,
}

enum Continuation<'t> {
    ElseIf(&'t str),
    Else,
}

/// Position-tracking reader over a template slice.
struct BlockCursor<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> BlockCursor<'t> {
    fn new(text: &'t str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn skip_inline_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches([' ', '\t']).len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Consumes the remainder of the current line when it is blank.
    fn skip_blank_line_end(&mut self) {
        let rest = self.rest();
        let line = rest.find('\n').map_or(rest, |nl| &rest[..=nl]);
        if line.trim().is_empty() {
            self.pos += line.len();
        }
    }

    fn parenthesized(&mut self) -> Option<&'t str> {
        if !self.rest().starts_with('(') {
            return None;
        }
        let close = matching_paren(self.text.as_bytes(), self.pos)?;
        let inner = &self.text[self.pos + 1..close];
        self.pos = close + 1;
        Some(inner.trim())
    }

    /// ScanningHeader: `keyword (header) {`. Returns the text in parentheses.
    fn header(&mut self, keyword: &str) -> Option<&'t str> {
        if !self.eat(keyword) {
            return None;
        }
        self.skip_whitespace();
        let inner = self.parenthesized()?;
        self.skip_whitespace();
        if !self.eat("{") {
            return None;
        }
        self.skip_blank_line_end();
        Some(inner)
    }

    /// AccumulatingBody: reads up to the brace that returns depth to zero.
    /// Returns the body and whether that brace was found.
    fn body(&mut self) -> (&'t str, bool) {
        let start = self.pos;
        let mut depth = 1usize;
        for (offset, b) in self.text.as_bytes()[start..].iter().enumerate() {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let end = start + offset;
                        self.pos = end + 1;
                        return (trim_closing_line(&self.text[start..end]), true);
                    }
                }
                _ => {}
            }
        }
        self.pos = self.text.len();
        (trim_closing_line(&self.text[start..]), false)
    }

    /// Looks for ` else if (...) {` or ` else {` right after a closing brace.
    fn continuation(&mut self) -> Option<Continuation<'t>> {
        let saved = self.pos;
        self.skip_inline_whitespace();
        if self.eat("else") {
            self.skip_inline_whitespace();
            if self.rest().starts_with("if") {
                if let Some(condition) = self.header("if") {
                    return Some(Continuation::ElseIf(condition));
                }
            } else if self.eat("{") {
                self.skip_blank_line_end();
                return Some(Continuation::Else);
            }
        }
        self.pos = saved;
        None
    }
}

/// Drops a trailing whitespace-only line, the indentation before a closing brace.
fn trim_closing_line(body: &str) -> &str {
    match body.rfind('\n') {
        Some(nl) if body[nl + 1..].trim().is_empty() => &body[..=nl],
        _ => body,
    }
}

fn scan_conditional(text: &str, start: usize) -> Option<(Region<'_>, usize)> {
    let mut cursor = BlockCursor::new(text, start);
    let mut clauses = Vec::new();
    let mut condition = None;
    let mut seen_else = false;
    let mut state = ScanState::ScanningHeader;

    while state != ScanState::Done {
        state = match state {
            ScanState::ScanningHeader => {
                condition = Some(cursor.header(IF_KEYWORD)?);
                ScanState::AccumulatingBody
            }
            ScanState::AccumulatingBody => {
                let (body, closed) = cursor.body();
                clauses.push(Clause {
                    condition: condition.take(),
                    body,
                });
                if !closed || seen_else {
                    ScanState::Done
                } else {
                    match cursor.continuation() {
                        Some(Continuation::ElseIf(next)) => {
                            condition = Some(next);
                            ScanState::AccumulatingBody
                        }
                        Some(Continuation::Else) => {
                            seen_else = true;
                            ScanState::AccumulatingBody
                        }
                        None => ScanState::Done,
                    }
                }
            }
            ScanState::Done => ScanState::Done,
        };
    }

    cursor.skip_blank_line_end();
    Some((Region::Conditional { clauses }, cursor.pos))
}

fn scan_iteration(text: &str, start: usize) -> Option<(Region<'_>, usize)> {
    let mut cursor = BlockCursor::new(text, start);
    let header = cursor.header(FOREACH_KEYWORD)?;
    let caps = FOREACH_HEADER.captures(header)?;
    let variable = caps.get(1)?.as_str();
    let collection = caps.get(2)?.as_str().trim();
    let (body, _) = cursor.body();
    cursor.skip_blank_line_end();
    let region = Region::Iteration {
        variable,
        collection,
        body,
    };
    Some((region, cursor.pos))
}

/// True when `line` begins with `keyword` followed by whitespace or `(`.
fn opens_with(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == '(' || c.is_whitespace())
}

/// Items of a foreach collection as `(item, key)` pairs.
fn iteration_items(value: Value) -> Vec<(Value, Option<String>)> {
    match value {
        Value::Null => Vec::new(),
        Value::List(items) => items.into_iter().map(|item| (item, None)).collect(),
        Value::Map(map) => map
            .into_iter()
            .map(|(key, value)| (entry(&key, value), Some(key)))
            .collect(),
        scalar => vec![(scalar, None)],
    }
}

/// Template renderer: a helper registry plus rendering limits.
#[derive(Clone, Debug)]
pub struct Renderer {
    helpers: HelperRegistry,
    max_depth: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new()
    }
}

impl Renderer {
    /// Creates a renderer with the built-in helpers and the default depth limit.
    pub fn new() -> Self {
        Self {
            helpers: HelperRegistry::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_helpers(mut self, helpers: HelperRegistry) -> Self {
        self.helpers = helpers;
        self
    }

    pub fn register_helper<F>(&mut self, name: &str, helper: F)
    where
        F: Fn(&Value, Option<&str>) -> Result<Value> + Send + Sync + 'static,
    {
        self.helpers.register(name, helper);
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    pub fn helpers_mut(&mut self) -> &mut HelperRegistry {
        &mut self.helpers
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.helpers)
    }

    /// Renders `template` against `scope`.
    ///
    /// # Errors
    /// * `Error::ControlFlowError` if a `@foreach` iterates over a string
    /// * `Error::HelperError` if a registered helper fails
    /// * `Error::RecursionLimitError` if regions nest deeper than the limit
    pub fn render(&self, template: &str, scope: &Scope) -> Result<String> {
        let text = strip_comments(template);
        let expanded = self.render_blocks(&text, scope, 0)?;
        self.resolve_string(&expanded, scope)
    }

    /// Substitutes `${...}` spans without any control-flow processing.
    pub fn resolve_string(&self, text: &str, scope: &Scope) -> Result<String> {
        self.resolver().resolve_string(text, scope)
    }

    /// Evaluates an `@if` condition against `scope`.
    pub fn evaluate_condition(&self, condition: &str, scope: &Scope) -> bool {
        Expr::parse(condition).test(&|path: &str| resolve_expression(path, scope))
    }

    fn render_blocks(&self, text: &str, scope: &Scope, depth: usize) -> Result<String> {
        if depth > self.max_depth {
            return Err(Error::RecursionLimitError {
                limit: self.max_depth,
            });
        }

        let resolver = self.resolver();
        let mut out = String::with_capacity(text.len());
        let mut plain = String::new();
        let mut pos = 0;

        while pos < text.len() {
            let line_end = text[pos..].find('\n').map_or(text.len(), |nl| pos + nl + 1);
            let line = &text[pos..line_end];
            let trimmed = line.trim_start();
            let start = pos + (line.len() - trimmed.len());

            let region = if opens_with(trimmed, IF_KEYWORD) {
                scan_conditional(text, start)
            } else if opens_with(trimmed, FOREACH_KEYWORD) {
                scan_iteration(text, start)
            } else {
                None
            };

            match region {
                Some((region, end)) => {
                    out.push_str(&resolver.resolve_string(&plain, scope)?);
                    plain.clear();
                    out.push_str(&self.render_region(&region, scope, depth)?);
                    pos = end;
                }
                None => {
                    plain.push_str(line);
                    pos = line_end;
                }
            }
        }

        out.push_str(&resolver.resolve_string(&plain, scope)?);
        Ok(out)
    }

    fn render_region(&self, region: &Region<'_>, scope: &Scope, depth: usize) -> Result<String> {
        match region {
            Region::Conditional { clauses } => {
                for (index, clause) in clauses.iter().enumerate() {
                    let selected = clause
                        .condition
                        .map_or(true, |condition| self.evaluate_condition(condition, scope));
                    if selected {
                        trace!("Selected clause {} of {}", index + 1, clauses.len());
                        return self.render_blocks(clause.body, scope, depth + 1);
                    }
                }
                trace!("No clause selected");
                Ok(String::new())
            }
            Region::Iteration { variable, collection, body } => {
                let value = resolve_expression(collection, scope);
                if matches!(value, Value::String(_)) {
                    return Err(Error::ControlFlowError {
                        collection: collection.to_string(),
                    });
                }
                let items = iteration_items(value);
                debug!("Iterating '{}' over {} item(s)", collection, items.len());

                let mut out = String::new();
                for (index, (item, key)) in items.into_iter().enumerate() {
                    let mut child = scope.create_child(Some(*variable));
                    child.set(variable, item.clone());
                    child.push_cursor(item, index, key.as_deref());
                    out.push_str(&self.render_blocks(body, &child, depth + 1)?);
                }
                Ok(out)
            }
        }
    }
}

/// Renders `template` with a default [`Renderer`].
pub fn render(template: &str, scope: &Scope) -> Result<String> {
    Renderer::new().render(template, scope)
}
