//! One "process a script" operation.
//!
//! A processor evaluates a script in a fresh [`ScriptHost`] and returns the
//! resulting catalog, or the first error. The log sink receiving the script's
//! `print` output is flushed before returning, whether the script succeeded
//! or not; no partial catalog escapes a failed run.

use crate::catalog::{Catalog, RegistrationError};
use crate::config::ProcessConfig;
use crate::script::{LogSink, ScriptHost, registration_error};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("empty source")]
    EmptySource,

    #[error("{0}")]
    Script(String),

    #[error("{message}")]
    Registration {
        message: String,
        error: RegistrationError,
    },

    #[error("flush log")]
    Log(#[source] io::Error),
}

impl ProcessError {
    /// Typed registration failure behind a script error, if any.
    pub fn registration(&self) -> Option<&RegistrationError> {
        match self {
            ProcessError::Registration { error, .. } => Some(error),
            _ => None,
        }
    }

    fn from_script(err: mlua::Error) -> Self {
        match registration_error(&err) {
            Some(error) => ProcessError::Registration {
                message: script_location(&err)
                    .map(|location| format!("{location}: {error}"))
                    .unwrap_or_else(|| error.to_string()),
                error: error.clone(),
            },
            None => ProcessError::Script(err.to_string()),
        }
    }
}

/// First `chunk:line` frame of the script that raised the error.
fn script_location(err: &mlua::Error) -> Option<String> {
    let mlua::Error::CallbackError { traceback, .. } = err else {
        return None;
    };
    traceback
        .lines()
        .map(str::trim)
        .filter(|frame| !frame.starts_with('['))
        .find_map(|frame| {
            let (location, _) = frame.split_once(": in ")?;
            Some(location.to_string())
        })
}

#[derive(Clone, Debug, Default)]
pub struct Processor {
    config: ProcessConfig,
}

impl Processor {
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    /// Read and evaluate a script file. Relative `require`s resolve next to it.
    pub fn process_file(&self, path: &Path, log: LogSink) -> Result<Catalog, ProcessError> {
        if path.as_os_str().is_empty() {
            return Err(ProcessError::EmptySource);
        }
        let source = fs::read(path).map_err(|source| ProcessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = format!("@{}", path.display());
        self.run(&source, &name, Some(path), log)
    }

    /// Evaluate an in-memory script under chunk name `name`.
    pub fn process_source(
        &self,
        name: &str,
        source: &[u8],
        log: LogSink,
    ) -> Result<Catalog, ProcessError> {
        self.run(source, &format!("={name}"), None, log)
    }

    fn run(
        &self,
        source: &[u8],
        chunk_name: &str,
        script: Option<&Path>,
        log: LogSink,
    ) -> Result<Catalog, ProcessError> {
        let outcome = self.evaluate(source, chunk_name, script, log.clone());
        let flushed = log.borrow_mut().flush();
        let catalog = outcome?;
        flushed.map_err(ProcessError::Log)?;
        info!(
            chunk = chunk_name,
            resources = catalog.len(),
            "processed script"
        );
        Ok(catalog)
    }

    fn evaluate(
        &self,
        source: &[u8],
        chunk_name: &str,
        script: Option<&Path>,
        log: LogSink,
    ) -> Result<Catalog, ProcessError> {
        let host = ScriptHost::new(&self.config, log, script).map_err(ProcessError::from_script)?;
        host.exec(source, chunk_name)
            .map_err(ProcessError::from_script)?;
        Ok(host.finish())
    }
}
