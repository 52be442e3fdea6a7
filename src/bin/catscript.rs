//! Evaluates a catalog script and writes the resulting catalog as JSON.
//!
//! `catscript [-I TEMPLATES]... [-o FILE] FILE`
//!
//! `-I` adds `package.searchpath` templates for `require`; `CATSCRIPT_PATH`
//! supplies fallback templates searched last. The script's `print` output
//! goes to stderr. Exits 1 with a message on any error.

use anyhow::{Context, Result};
use catscript::config::validate_templates;
use catscript::emit::{Output, write_catalog};
use catscript::{LogSink, ProcessConfig, Processor};
use clap::Parser;
use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "catscript",
    version,
    about = "Interprets a Lua catalog script and generates a resource catalog."
)]
struct Cli {
    /// Add a package path template in package.searchpath format.
    #[arg(short = 'I', value_name = "TEMPLATES", value_parser = parse_templates)]
    include: Vec<String>,

    /// Write output to FILE instead of stdout.
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Catalog script to evaluate.
    #[arg(value_name = "FILE")]
    source: PathBuf,
}

fn parse_templates(raw: &str) -> Result<String, String> {
    validate_templates(raw).map_err(|err| err.to_string())?;
    Ok(raw.to_string())
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("catscript: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ProcessConfig::from_env();
    for templates in &cli.include {
        config.add_include_path(templates)?;
    }

    let mut output = Output::open(cli.output.as_deref())?;
    output.ensure_not_terminal()?;

    let log: LogSink = Rc::new(RefCell::new(io::stderr()));
    let catalog = Processor::new(config).process_file(&cli.source, log)?;
    write_catalog(&catalog, &mut output)
        .with_context(|| format!("write catalog for {}", cli.source.display()))?;
    Ok(())
}
