//! Command-line interface implementation for stencil.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

use crate::engine::DEFAULT_MAX_DEPTH;

/// Command-line arguments structure for stencil.
#[derive(Parser, Debug)]
#[command(author, version, about = "stencil: render text templates against a JSON or YAML context", long_about = None)]
pub struct Args {
    /// Path to the template file, or '-' to read the template from stdin
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// JSON or YAML file whose top-level keys become template variables
    #[arg(short, long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Write the rendered output to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Set a variable, overriding the context file.
    /// The value is parsed as JSON when possible, e.g. `--set Count=3`.
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Identifying key for the root scope
    #[arg(short, long)]
    pub key: Option<String>,

    /// Maximum nesting depth of @if/@foreach regions
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
