use anyhow::{Context, Result, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

pub fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn catscript_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_catscript"))
}

pub fn dot_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_catscript-dot"))
}

/// A `catscript` invocation with a clean fallback include path.
pub fn catscript_command() -> Command {
    let mut cmd = Command::new(catscript_bin());
    cmd.env_remove("CATSCRIPT_PATH");
    cmd.env_remove("RUST_LOG");
    cmd
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}

/// Run a command that is expected to fail; returns its stderr.
pub fn run_failing(mut cmd: Command) -> Result<String> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        bail!(
            "command {:?} unexpectedly succeeded\nstdout: {}",
            cmd,
            String::from_utf8_lossy(&output.stdout)
        );
    }
    assert_eq!(output.status.code(), Some(1), "unexpected exit status");
    Ok(String::from_utf8_lossy(&output.stderr).into_owned())
}

pub fn write_script(dir: &Path, relative: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

pub fn read_json(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("parse {}", path.display()))
}

/// Validate an emitted catalog against `schema/catalog.schema.json`.
pub fn validate_catalog(catalog: &Value) -> Result<()> {
    static CATALOG_SCHEMA: OnceLock<Value> = OnceLock::new();
    let schema_value = if let Some(existing) = CATALOG_SCHEMA.get() {
        existing
    } else {
        let loaded = read_json(&repo_root().join("schema/catalog.schema.json"))?;
        CATALOG_SCHEMA.get_or_init(move || loaded)
    };

    let compiled = JSONSchema::compile(schema_value)?;
    if let Err(errors) = compiled.validate(catalog) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!("catalog failed schema validation:\n{details}");
    }
    Ok(())
}
