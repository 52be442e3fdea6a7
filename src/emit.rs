//! Catalog serialization and output selection.

use crate::catalog::Catalog;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;

const TERMINAL_REFUSAL: &str = "output file is a tty\n\nWriting a catalog will likely mess up your terminal. Either\nredirect stdout or use -o.";

/// Where the catalog goes: stdout, or a file created (or truncated) up front.
pub enum Output {
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

impl Output {
    /// Open the destination before any script runs so a bad `-o` fails fast.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("open {}", path.display()))?;
                Ok(Output::File(BufWriter::new(file)))
            }
            None => Ok(Output::Stdout(io::stdout())),
        }
    }

    /// Refuse interactive terminals.
    pub fn ensure_not_terminal(&self) -> Result<()> {
        let interactive = match self {
            Output::Stdout(stdout) => stdout.is_terminal(),
            Output::File(file) => file.get_ref().is_terminal(),
        };
        if interactive {
            bail!(TERMINAL_REFUSAL);
        }
        Ok(())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(stdout) => stdout.write(buf),
            Output::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(stdout) => stdout.flush(),
            Output::File(file) => file.flush(),
        }
    }
}

/// Serialize `catalog` as one JSON document followed by a newline.
pub fn write_catalog<W: Write>(catalog: &Catalog, mut out: W) -> Result<()> {
    serde_json::to_writer(&mut out, catalog).context("serialize catalog")?;
    out.write_all(b"\n").context("write catalog")?;
    out.flush().context("flush catalog")?;
    Ok(())
}

pub fn catalog_to_json(catalog: &Catalog) -> Result<String> {
    serde_json::to_string_pretty(catalog).context("serialize catalog")
}
