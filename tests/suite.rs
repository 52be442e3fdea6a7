#![cfg(unix)]

// Integration suite: runs real catalog scripts through the library and the
// compiled binaries, validating emitted catalogs against the JSON schema.
mod support;

use anyhow::{Context, Result};
use catscript::catalog::{Id, Payload, ResourceRegistry, ResourceType, tag};
use catscript::{CapabilityObject, ProcessConfig, ProcessError, Processor, Table, Value};
use serde_json::Value as Json;
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use std::rc::Rc;
use support::{
    catscript_command, dot_bin, read_json, run_command, run_failing, validate_catalog,
    write_script,
};
use tempfile::TempDir;

const SITE_SCRIPT: &str = r#"
local update = mcm.hash("apt-get update")

mcm.resource(update, {}, mcm.exec{
  command = {argv = {"apt-get", "update"}},
})

local motd = mcm.file{path = "/etc/motd"}
motd.plain = {
  content = "welcome\n",
  mode = {bits = 420, user = {name = "root"}, group = {id = 0}},
}
mcm.resource("motd", {update}, motd)

mcm.resource("done", {"motd", update}, mcm.noop)
"#;

fn id_of(comment: &str) -> u64 {
    Id::hash(comment).value
}

fn ids(catalog: &Json) -> Vec<u64> {
    catalog["resources"]
        .as_array()
        .expect("resources array")
        .iter()
        .map(|resource| resource["id"].as_u64().expect("u64 id"))
        .collect()
}

fn process_with_log(source: &str) -> (Result<catscript::Catalog, ProcessError>, Vec<u8>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let result = Processor::default().process_source("suite", source.as_bytes(), log.clone());
    let written = log.borrow().clone();
    (result, written)
}

// The CLI writes a schema-valid catalog in registration order.
#[test]
fn cli_emits_schema_valid_catalog() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write_script(dir.path(), "site.lua", SITE_SCRIPT)?;
    let out = dir.path().join("catalog.json");

    let mut cmd = catscript_command();
    cmd.arg("-o").arg(&out).arg(&script);
    run_command(cmd)?;

    let catalog = read_json(&out)?;
    validate_catalog(&catalog)?;
    assert_eq!(
        ids(&catalog),
        vec![id_of("apt-get update"), id_of("motd"), id_of("done")]
    );

    let resources = &catalog["resources"];
    assert_eq!(resources[0]["comment"], "apt-get update");
    assert_eq!(
        resources[0]["exec"]["command"]["argv"],
        serde_json::json!(["apt-get", "update"])
    );
    assert_eq!(resources[1]["file"]["path"], "/etc/motd");
    assert_eq!(resources[1]["file"]["plain"]["mode"]["bits"], 420);
    assert_eq!(
        resources[1]["file"]["plain"]["content"],
        serde_json::json!(b"welcome\n".to_vec())
    );
    assert_eq!(
        resources[1]["dependencies"],
        serde_json::json!([id_of("apt-get update")])
    );
    assert_eq!(resources[2]["noop"], serde_json::json!({}));
    assert_eq!(
        resources[2]["dependencies"],
        serde_json::json!([id_of("motd"), id_of("apt-get update")])
    );
    Ok(())
}

// Without -o the catalog goes to stdout and print output to stderr.
#[test]
fn cli_writes_stdout_and_logs_to_stderr() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write_script(
        dir.path(),
        "hello.lua",
        r#"print("declaring", 1) mcm.resource("hello", {}, mcm.noop)"#,
    )?;

    let mut cmd = catscript_command();
    cmd.arg(&script).stdin(Stdio::null());
    let output = run_command(cmd)?;

    let catalog: Json = serde_json::from_slice(&output.stdout)?;
    validate_catalog(&catalog)?;
    assert_eq!(ids(&catalog), vec![id_of("hello")]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("declaring\t1\n"));
    Ok(())
}

// Full-width unsigned values and id handles both land in UInt64 lists.
#[test]
fn uint64_fields_accept_full_range_and_ids() -> Result<()> {
    let (result, _) = process_with_log(
        r#"
        mcm.resource("guarded", {}, mcm.exec{
          command = {bash = "true"},
          condition = {ifDepsChanged = {0xffffffffffffffff, mcm.hash("dep"), 7}},
        })
        "#,
    );
    let catalog = result?;
    let Payload::Exec(exec) = &catalog.resources[0].payload else {
        panic!("expected exec payload");
    };
    let condition = exec.get("condition").and_then(|v| v.as_struct()).context("condition")?;
    let values: Vec<u64> = condition
        .get("ifDepsChanged")
        .and_then(|v| v.as_list())
        .context("ifDepsChanged")?
        .iter()
        .filter_map(|v| v.as_uint())
        .collect();
    assert_eq!(values, vec![u64::MAX, id_of("dep"), 7]);
    Ok(())
}

// Explicit ids and hashed strings resolve in declaration order.
#[test]
fn registry_resolves_mixed_dependency_sources() {
    let mut registry = ResourceRegistry::default();
    let mut noop = CapabilityObject::default();
    tag(&mut noop, ResourceType::NOOP);

    let deps = Value::from(Table::sequence([Value::from(Id::new(5, "")), Value::from("foo")]));
    registry
        .register(&Value::from("bar"), &deps, &Value::from(noop.clone()))
        .expect("registration succeeds");
    registry
        .register(&Value::from("baz"), &Value::from(Table::new()), &Value::from(noop))
        .expect("registration succeeds");

    let catalog = registry.finish();
    assert_eq!(catalog.resources[0].dependencies, vec![5, id_of("foo")]);
    assert!(catalog.resources[1].dependencies.is_empty());
}

// `require` finds modules next to the script, then in -I templates.
#[test]
fn cli_resolves_modules_from_script_dir_and_includes() -> Result<()> {
    let dir = TempDir::new()?;
    write_script(
        dir.path(),
        "site/helpers.lua",
        r#"return {motd = function(text) return mcm.file{path = "/etc/motd", plain = {content = text}} end}"#,
    )?;
    write_script(
        dir.path(),
        "shared/pkgs/init.lua",
        r#"return {update = mcm.exec{command = {argv = {"apt-get", "update"}}}}"#,
    )?;
    let script = write_script(
        dir.path(),
        "site/main.lua",
        r#"
        local helpers = require("helpers")
        local pkgs = require("pkgs")
        mcm.resource("update", {}, pkgs.update)
        mcm.resource("motd", {"update"}, helpers.motd("hi"))
        "#,
    )?;

    let include = format!("{}/shared/?/init.lua", dir.path().display());
    let mut cmd = catscript_command();
    cmd.arg("-I").arg(&include).arg(&script);
    let output = run_command(cmd)?;

    let catalog: Json = serde_json::from_slice(&output.stdout)?;
    validate_catalog(&catalog)?;
    assert_eq!(ids(&catalog), vec![id_of("update"), id_of("motd")]);
    Ok(())
}

// CATSCRIPT_PATH supplies fallback templates; entries without '?' are ignored.
#[test]
fn cli_uses_fallback_include_from_env() -> Result<()> {
    let dir = TempDir::new()?;
    write_script(
        dir.path(),
        "lib/common.lua",
        r#"return {name = "common"}"#,
    )?;
    let script = write_script(
        dir.path(),
        "site/main.lua",
        r#"mcm.resource(require("common").name, {}, mcm.noop)"#,
    )?;

    let fallback = format!("/does/not/exist;{}/lib/?.lua", dir.path().display());
    let mut cmd = catscript_command();
    cmd.env("CATSCRIPT_PATH", fallback).arg(&script);
    let output = run_command(cmd)?;

    let catalog: Json = serde_json::from_slice(&output.stdout)?;
    assert_eq!(ids(&catalog), vec![id_of("common")]);
    Ok(())
}

#[test]
fn cli_rejects_include_without_wildcard() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write_script(dir.path(), "main.lua", "")?;

    let mut cmd = catscript_command();
    cmd.arg("-I").arg("lib/?.lua;/opt/modules").arg(&script);
    let output = cmd.output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("path '/opt/modules' does not include a '?' wildcard"),
        "stderr: {stderr}"
    );
    Ok(())
}

// Script faults exit 1 with the runtime's message and no catalog.
#[test]
fn cli_reports_script_errors() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write_script(
        dir.path(),
        "broken.lua",
        "mcm.resource(\"a\", {}, mcm.noop)\nerror(\"kaboom\")\n",
    )?;
    let out = dir.path().join("catalog.json");

    let mut cmd = catscript_command();
    cmd.arg("-o").arg(&out).arg(&script);
    let stderr = run_failing(cmd)?;
    assert!(stderr.contains("kaboom"), "stderr: {stderr}");
    assert!(stderr.contains("broken.lua:2"), "stderr: {stderr}");
    assert_eq!(fs::read(&out)?, b"");
    Ok(())
}

// Marshalling failures name the full path to the offending value.
#[test]
fn cli_reports_marshal_path() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write_script(
        dir.path(),
        "bad_mode.lua",
        r#"mcm.resource("f", {}, mcm.file{path = "/x", plain = {mode = {bits = 4.5}}})"#,
    )?;

    let mut cmd = catscript_command();
    cmd.arg(&script);
    let stderr = run_failing(cmd)?;
    assert!(
        stderr.contains(
            "struct File, field \"plain\", struct Plain, field \"mode\", struct Mode, field \"bits\": non-integer value"
        ),
        "stderr: {stderr}"
    );
    Ok(())
}

#[test]
fn cli_reports_missing_source() -> Result<()> {
    let dir = TempDir::new()?;
    let missing = dir.path().join("absent.lua");
    let mut cmd = catscript_command();
    cmd.arg(&missing);
    let stderr = run_failing(cmd)?;
    assert!(stderr.contains("absent.lua"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn unknown_fields_abort_processing() {
    let (result, _) = process_with_log(
        r#"
        mcm.resource("ok", {}, mcm.noop)
        mcm.resource("bad", {}, mcm.file{path = "/x", owner = "root"})
        "#,
    );
    let err = result.expect_err("unknown field must fail");
    assert!(err.registration().is_some());
    assert!(err.to_string().contains("could not find field \"owner\""), "{err}");
}

#[test]
fn fallback_config_from_library() -> Result<()> {
    let dir = TempDir::new()?;
    write_script(dir.path(), "mods/extra.lua", "return 'extra'")?;
    let script = write_script(
        dir.path(),
        "main.lua",
        r#"mcm.resource(require("extra"), {}, mcm.noop)"#,
    )?;

    let mut config = ProcessConfig::default();
    config.set_fallback_include(&format!("{}/mods/?.lua", dir.path().display()));
    let log = Rc::new(RefCell::new(Vec::new()));
    let catalog = Processor::new(config).process_file(&script, log)?;
    assert_eq!(catalog.resources[0].id, id_of("extra"));
    Ok(())
}

// catscript-dot renders a catalog produced by catscript.
#[test]
fn dot_renders_catalog_graph() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write_script(dir.path(), "site.lua", SITE_SCRIPT)?;
    let out = dir.path().join("catalog.json");
    let mut cmd = catscript_command();
    cmd.arg("-o").arg(&out).arg(&script);
    run_command(cmd)?;

    let mut dot = Command::new(dot_bin());
    dot.arg(&out);
    let output = run_command(dot)?;
    let expected = format!(
        "digraph catalog {{\n  {update} [label=\"apt-get update\"];\n\n  {motd} [label=\"motd\"];\n  {motd} -> {update};\n\n  {done} [label=\"done\"];\n  {done} -> {motd};\n  {done} -> {update};\n\n}}\n",
        update = id_of("apt-get update"),
        motd = id_of("motd"),
        done = id_of("done"),
    );
    assert_eq!(String::from_utf8(output.stdout)?, expected);
    Ok(())
}

#[test]
fn dot_reads_stdin() -> Result<()> {
    let mut child = Command::new(dot_bin())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .context("spawn catscript-dot")?;
    child
        .stdin
        .take()
        .context("stdin")?
        .write_all(br#"{"resources":[{"id":2,"comment":"","dependencies":[1],"noop":{}}]}"#)?;
    let output = child.wait_with_output()?;
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout)?,
        "digraph catalog {\n  2 -> 1;\n\n}\n"
    );
    Ok(())
}
