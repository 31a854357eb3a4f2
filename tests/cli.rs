//! Integration tests for the `c-docgen` binary.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_c-docgen")))
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn cli_parse_to_stdout() {
    cmd()
        .arg("parse")
        .arg(fixture("queue.h"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Job Queue\""))
        .stdout(predicate::str::contains("\"c:@S@job\""));
}

#[test]
fn cli_parse_to_file() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("models/queue.json");

    cmd()
        .arg("parse")
        .arg(fixture("queue.h"))
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let json = fs::read_to_string(&output).unwrap();
    assert!(json.contains("\"QUEUE_DEFAULT_CAPACITY\""));
}

#[test]
fn cli_parse_missing_file_fails() {
    cmd()
        .args(["parse", "/definitely/not/here.h"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn cli_parse_reports_diagnostics() {
    let dir = TempDir::new().unwrap();
    let header = dir.path().join("broken.h");
    fs::write(&header, "#include \"absent.h\"\n\n// Value.\nint value;\n").unwrap();

    cmd()
        .arg("parse")
        .arg(&header)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"c:@value\""))
        .stderr(predicate::str::contains("'absent.h' file not found"))
        .stderr(predicate::str::contains("output may be incomplete"));
}

#[test]
fn cli_include_dirs_resolve_includes() {
    let dir = TempDir::new().unwrap();
    let include = dir.path().join("include");
    fs::create_dir_all(&include).unwrap();
    fs::write(include.join("absent.h"), "int other;\n").unwrap();
    let header = dir.path().join("uses.h");
    fs::write(&header, "#include \"absent.h\"\nint value;\n").unwrap();

    cmd()
        .arg("parse")
        .arg(&header)
        .arg("--")
        .arg(format!("-I{}", include.display()))
        .assert()
        .success()
        .stderr(predicate::str::contains("file not found").not());
}

#[test]
fn cli_html_renders_directory() {
    let dir = TempDir::new().unwrap();
    let models = dir.path().join("models");
    let site = dir.path().join("site");

    cmd()
        .arg("parse")
        .arg(fixture("queue.h"))
        .arg("-o")
        .arg(models.join("queue.json"))
        .assert()
        .success();

    cmd()
        .arg("html")
        .arg("--input-dir")
        .arg(&models)
        .arg("--output-dir")
        .arg(&site)
        .args(["--project-name", "Jobs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 1 pages"));

    let page = fs::read_to_string(site.join("queue.html")).unwrap();
    assert!(page.contains("<title>Jobs: Job Queue</title>"));
    let index = fs::read_to_string(site.join("index.html")).unwrap();
    assert!(index.contains("<a href=\"queue.html\">queue</a> Job Queue"));
}

#[test]
fn cli_html_names_nested_models_by_path() {
    let dir = TempDir::new().unwrap();
    let models = dir.path().join("models");
    let site = dir.path().join("site");
    fs::create_dir_all(models.join("a")).unwrap();
    fs::create_dir_all(models.join("b")).unwrap();
    fs::write(models.join("a/x.json"), r#"{"name": "First"}"#).unwrap();
    fs::write(models.join("b/x.json"), r#"{"name": "Second"}"#).unwrap();

    cmd()
        .arg("html")
        .arg("--input-dir")
        .arg(&models)
        .arg("--output-dir")
        .arg(&site)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 2 pages"));

    let first = fs::read_to_string(site.join("a-x.html")).unwrap();
    assert!(first.contains("<h1>First</h1>"));
    let second = fs::read_to_string(site.join("b-x.html")).unwrap();
    assert!(second.contains("<h1>Second</h1>"));
    let index = fs::read_to_string(site.join("index.html")).unwrap();
    assert!(index.contains("<a href=\"a-x.html\">a-x</a> First"));
    assert!(index.contains("<a href=\"b-x.html\">b-x</a> Second"));
}

#[test]
fn cli_html_rejects_colliding_page_names() {
    let dir = TempDir::new().unwrap();
    let models = dir.path().join("models");
    fs::create_dir_all(models.join("a")).unwrap();
    fs::write(models.join("a/x.json"), r#"{"name": "Nested"}"#).unwrap();
    fs::write(models.join("a-x.json"), r#"{"name": "Flat"}"#).unwrap();

    cmd()
        .arg("html")
        .arg("--input-dir")
        .arg(&models)
        .arg("--output-dir")
        .arg(dir.path().join("site"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("would both be rendered to a-x.html"));
}

#[test]
fn cli_doc_uses_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("docs.toml");
    fs::write(&config, "project_name = \"Configured\"\n").unwrap();
    let site = dir.path().join("site");

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("doc")
        .arg(fixture("queue.h"))
        .arg("--output-dir")
        .arg(&site)
        .assert()
        .success();

    let page = fs::read_to_string(site.join("queue.html")).unwrap();
    assert!(page.contains("<title>Configured: Job Queue</title>"));
    assert!(site.join("index.html").exists());
}

#[test]
fn cli_bad_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("docs.toml");
    fs::write(&config, "unknown = 1\n").unwrap();

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("parse")
        .arg(fixture("queue.h"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config error"));
}
