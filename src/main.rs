use clap::Parser;
use serde_json::Value as Json;
use std::path::PathBuf;
use template_placeholder_evaluation::{
    escape, Context, EngineOptions, EscapeFunctions, KnownReplacements, TemplateEngine, WILDCARD,
};
use tracing::Level;

/// Render a `{{...}}` template against a JSON context.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Template text. Omit when using --template-file.
    template: Option<String>,
    /// Read the template from a file.
    #[arg(long, conflicts_with = "template")]
    template_file: Option<PathBuf>,
    /// Context as a JSON object.
    #[arg(long)]
    context: Option<String>,
    /// Read the context JSON from a file.
    #[arg(long, conflicts_with = "context")]
    context_file: Option<PathBuf>,
    /// Literal replacement applied before placeholders, as KEY=VALUE (repeatable)
    #[arg(long = "replace", value_name = "KEY=VALUE")]
    replacements: Vec<String>,
    /// Sanitizer for every substitution: html, markdown or json
    #[arg(long)]
    escape: Option<String>,
    /// Sanitizer for one placeholder expression, as EXPR=NAME (repeatable)
    #[arg(long = "escape-path", value_name = "EXPR=NAME")]
    escape_paths: Vec<String>,
    /// Evaluate the input as a single bare expression instead of a template
    #[arg(long)]
    expr: bool,
    /// Maximum nesting of function calls
    #[arg(long, default_value_t = template_placeholder_evaluation::engine::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(msg) = run(args) {
        eprintln!("{msg}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), String> {
    let template = match (&args.template, &args.template_file) {
        (Some(t), _) => t.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {e}", path.display()))?,
        (None, None) => return Err("No template given (pass TEMPLATE or --template-file)".into()),
    };

    let context_json = match (&args.context, &args.context_file) {
        (Some(c), _) => Some(c.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read {}: {e}", path.display()))?,
        ),
        (None, None) => None,
    };
    let ctx = match context_json {
        Some(text) => {
            let json: Json =
                serde_json::from_str(&text).map_err(|e| format!("Invalid JSON: {e}"))?;
            Context::try_from(json).map_err(|e| e.to_string())?
        }
        None => Context::Empty,
    };

    let mut known = KnownReplacements::new();
    for pair in &args.replacements {
        let (key, value) = split_pair(pair, "--replace")?;
        known.insert_text(key, value);
    }

    let mut escapes = EscapeFunctions::new();
    if let Some(name) = &args.escape {
        escapes.insert(WILDCARD, sanitizer(name)?);
    }
    for pair in &args.escape_paths {
        let (expr, name) = split_pair(pair, "--escape-path")?;
        escapes.insert(expr, sanitizer(name)?);
    }

    let engine = TemplateEngine::new().with_options(EngineOptions {
        max_depth: args.max_depth,
    });

    if args.expr {
        let value = engine.eval(&template, &ctx).map_err(|e| e.to_string())?;
        println!("{value}");
        return Ok(());
    }

    let out = engine
        .render(&template, &ctx, &known, &escapes)
        .map_err(|e| e.to_string())?;
    print!("{out}");
    Ok(())
}

fn split_pair<'a>(pair: &'a str, flag: &str) -> Result<(&'a str, &'a str), String> {
    pair.split_once('=')
        .ok_or_else(|| format!("{flag} expects KEY=VALUE, got `{pair}`"))
}

fn sanitizer(name: &str) -> Result<escape::Sanitizer, String> {
    escape::by_name(name).ok_or_else(|| format!("Unknown escape `{name}` (html, markdown, json)"))
}
