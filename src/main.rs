//! stencil's command-line entry point.
//! Reads a template and a context document, renders, and writes the result.

use std::io::Read;
use std::path::Path;

use stencil::{
    cli::{get_args, Args},
    context::{apply_assignments, load_context},
    error::{default_error_handler, Error, Result},
    Renderer, Scope,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Off
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

fn read_template(source: &str) -> Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(source).map_err(Error::IoError)
    }
}

fn write_file<P: AsRef<Path>>(content: &str, dest_path: P) -> Result<()> {
    let dest_path = dest_path.as_ref();
    if let Some(parent) = dest_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(Error::IoError)?;
        }
    }
    std::fs::write(dest_path, content).map_err(Error::IoError)
}

/// Main application logic execution.
///
/// # Flow
/// 1. Reads the template from a file or stdin
/// 2. Builds the root scope from the context file and `--set` assignments
/// 3. Renders the template
/// 4. Writes the output to a file or stdout
fn run(args: Args) -> Result<()> {
    let template = read_template(&args.template)?;

    let mut scope = match &args.key {
        Some(key) => Scope::with_key(key.as_str()),
        None => Scope::new(),
    };
    if let Some(path) = &args.context {
        load_context(path, &mut scope)?;
    }
    apply_assignments(&mut scope, &args.set)?;

    let renderer = Renderer::new().with_max_depth(args.max_depth);
    let output = renderer.render(&template, &scope)?;

    match &args.output {
        Some(path) => {
            write_file(&output, path)?;
            log::info!("Rendered '{}' to '{}'", args.template, path.display());
        }
        None => print!("{output}"),
    }
    Ok(())
}
