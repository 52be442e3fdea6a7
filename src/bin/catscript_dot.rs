//! Renders a JSON catalog's dependency graph in Graphviz DOT format.
//!
//! Reads the catalog from FILE, or stdin when no file is given, and prints the
//! graph on stdout.

use anyhow::{Context, Result};
use catscript::catalog::dot::{load_graph_from_path, read_graph, write_dot};
use clap::Parser;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "catscript-dot",
    version,
    about = "Prints a catalog's dependency graph as a DOT digraph."
)]
struct Cli {
    /// Catalog written by catscript; stdin when omitted.
    #[arg(value_name = "FILE")]
    catalog: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("catscript-dot: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let graph = match cli.catalog {
        Some(path) => load_graph_from_path(&path)?,
        None => read_graph(io::stdin().lock())?,
    };
    let stdout = io::stdout();
    write_dot(&graph, BufWriter::new(stdout.lock())).context("write graph")?;
    Ok(())
}
