//! Error handling for stencil.
//! Defines the error type and result alias used throughout the crate.
//!
//! Unresolved variables, properties and services are deliberately absent from
//! this enum: the interpreter renders them as blanks instead of failing.

use thiserror::Error;

/// Custom error types for stencil operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] std::io::Error),

    /// A `@foreach` region tried to iterate over a string value.
    #[error("Cannot iterate over string value of '{collection}' in @foreach.")]
    ControlFlowError { collection: String },

    /// A helper applied through a `| name` pipe failed.
    #[error("Helper '{name}' failed: {message}.")]
    HelperError { name: String, message: String },

    /// Control-flow regions nested deeper than the renderer allows.
    #[error("Template nesting exceeds the maximum depth of {limit}.")]
    RecursionLimitError { limit: usize },

    /// Represents errors that occur while loading the root scope.
    #[error("Context error: {0}.")]
    ContextError(String),
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The Error to handle
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
