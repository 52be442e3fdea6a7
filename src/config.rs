//! Processing configuration and module search-path construction.
//!
//! Include templates use the `package.searchpath` format: `;`-separated
//! entries, each containing a `?` that `require` replaces with the module
//! name. Templates given on the command line are validated strictly; the
//! fallback from `CATSCRIPT_PATH` is filtered instead.

use crate::marshal::DEFAULT_MAX_DEPTH;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Environment variable holding the fallback include templates.
pub const FALLBACK_INCLUDE_ENV: &str = "CATSCRIPT_PATH";

const TEMPLATE_SEPARATOR: char = ';';
const WILDCARD: char = '?';

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("path '{0}' does not include a '?' wildcard")]
    MissingWildcard(String),
}

/// Settings for one processing call.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessConfig {
    /// Validated templates, in the order they were added.
    pub include_paths: Vec<String>,
    /// Filtered fallback templates, searched after `include_paths`.
    pub fallback_include: Vec<String>,
    /// Bound on nested tables, both when importing script values and while
    /// marshalling payloads.
    pub max_depth: u32,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            fallback_include: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ProcessConfig {
    /// Defaults plus the fallback read from [`FALLBACK_INCLUDE_ENV`].
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(fallback) = env::var(FALLBACK_INCLUDE_ENV) {
            config.set_fallback_include(&fallback);
        }
        config
    }

    /// Append a `;`-separated template list. Every entry must contain `?`;
    /// on error nothing is added.
    pub fn add_include_path(&mut self, templates: &str) -> Result<(), ConfigError> {
        validate_templates(templates)?;
        self.include_paths
            .extend(templates.split(TEMPLATE_SEPARATOR).map(str::to_string));
        Ok(())
    }

    /// Replace the fallback templates, dropping entries without `?`.
    pub fn set_fallback_include(&mut self, templates: &str) {
        self.fallback_include.clear();
        if templates.is_empty() {
            return;
        }
        for entry in templates.split(TEMPLATE_SEPARATOR) {
            if is_valid_template(entry) {
                self.fallback_include.push(entry.to_string());
            } else {
                warn!(entry, "dropping fallback include entry without '?' wildcard");
            }
        }
    }

    /// Effective `package.path` for a script.
    ///
    /// A script read from `dir/name.lua` searches `dir/?.lua` and
    /// `dir/?/init.lua` first; scripts without a file only get the
    /// configured templates.
    pub fn search_path(&self, script: Option<&Path>) -> String {
        let mut entries = Vec::new();
        if let Some(script) = script {
            let dir = script_dir(script);
            entries.push(format!("{dir}/?.lua"));
            entries.push(format!("{dir}/?/init.lua"));
        }
        entries.extend(self.include_paths.iter().cloned());
        entries.extend(self.fallback_include.iter().cloned());
        entries.join(";")
    }
}

/// Check that every `;`-separated entry of `templates` contains `?`.
pub fn validate_templates(templates: &str) -> Result<(), ConfigError> {
    match templates
        .split(TEMPLATE_SEPARATOR)
        .find(|entry| !is_valid_template(entry))
    {
        Some(bad) => Err(ConfigError::MissingWildcard(bad.to_string())),
        None => Ok(()),
    }
}

fn is_valid_template(entry: &str) -> bool {
    entry.contains(WILDCARD)
}

fn script_dir(script: &Path) -> String {
    match script.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.display().to_string(),
        _ => ".".to_string(),
    }
}
