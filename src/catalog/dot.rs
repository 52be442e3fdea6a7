//! Graphviz rendering of a catalog's dependency graph.
//!
//! Only the graph-shaped part of a catalog is read back (`id`, `comment`,
//! `dependencies`); payloads are ignored so any catalog produced by
//! `catscript` can be rendered without knowing its payload schemas.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CatalogGraph {
    pub resources: Vec<GraphNode>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub dependencies: Vec<u64>,
}

pub fn read_graph<R: Read>(reader: R) -> Result<CatalogGraph> {
    serde_json::from_reader(reader).context("read catalog")
}

pub fn load_graph_from_path(path: &Path) -> Result<CatalogGraph> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_graph(BufReader::new(file)).with_context(|| format!("parse {}", path.display()))
}

/// Emit `digraph catalog { ... }`: a labelled node for every resource with a
/// comment and an edge to each of its dependencies, in catalog order.
pub fn write_dot<W: Write>(graph: &CatalogGraph, mut out: W) -> io::Result<()> {
    writeln!(out, "digraph catalog {{")?;
    for node in &graph.resources {
        if !node.comment.is_empty() {
            writeln!(out, "  {} [label={}];", node.id, quote(&node.comment))?;
        }
        for dep in &node.dependencies {
            writeln!(out, "  {} -> {};", node.id, dep)?;
        }
        writeln!(out)?;
    }
    writeln!(out, "}}")?;
    out.flush()
}

fn quote(label: &str) -> String {
    let mut quoted = String::with_capacity(label.len() + 2);
    quoted.push('"');
    for ch in label.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
