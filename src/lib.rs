//! stencil is a small template interpreter for code and document generation.
//! Templates interpolate `${...}` expressions with helper pipes, branch with
//! `@if`/`else if`/`else`, loop with `@foreach` and call services registered
//! on the scope. Templates are trusted input: there is no sandboxing.

/// Command-line interface module for the stencil binary
pub mod cli;

/// Condition parsing and the comparison, equality and truthiness rules
pub mod condition;

/// Loading root scope variables from JSON or YAML documents
pub mod context;

/// Control-flow processing and the top-level render entry point
pub mod engine;

/// Error types and handling for stencil
pub mod error;

/// Built-in and user-registered value helpers for `| name:arg` pipes
pub mod helpers;

/// Expression resolution and `${...}` interpolation
pub mod resolver;

/// Hierarchical variable and service scope
pub mod scope;

/// The dynamically typed template value
pub mod value;

pub use engine::{render, Renderer};
pub use error::{Error, Result};
pub use helpers::HelperRegistry;
pub use resolver::Resolver;
pub use scope::{NamedService, Scope};
pub use value::{Function, Map, Object, Value};
