//! `--json` output checked against the schemas printed by `ddl-convert schema`.

use jsonschema::Validator;
use serde_json::Value;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const DUMP: &str = "CREATE TABLE `a` (`id` int(11) NOT NULL AUTO_INCREMENT, `b_id` int(11), PRIMARY KEY (`id`), CONSTRAINT `fk_b` FOREIGN KEY (`b_id`) REFERENCES `b` (`id`));\n\
CREATE TABLE `b` (`id` int(11) NOT NULL, `state` enum('x','y'));\n\
INSERT INTO `a` VALUES (1,NULL);\n";

fn ddl_convert() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ddl-convert"))
}

fn load_schema(name: &str) -> Validator {
    let output = ddl_convert().args(["schema", name]).output().unwrap();
    assert!(output.status.success(), "no schema named {name}");
    let schema: Value = serde_json::from_slice(&output.stdout).expect("schema is not JSON");
    jsonschema::validator_for(&schema).expect("schema does not compile")
}

fn json_stdout(args: &[&str]) -> Value {
    let output = ddl_convert().args(args).output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn assert_valid(validator: &Validator, json: &Value) {
    let errors: Vec<String> = validator.iter_errors(json).map(|e| e.to_string()).collect();
    assert!(errors.is_empty(), "schema violations: {errors:?}\n{json:#}");
}

#[test]
fn test_convert_json_matches_schema() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("dump.sql");
    fs::write(&input, DUMP).unwrap();
    let out = dir.path().join("out.sql");

    let json = json_stdout(&[
        "convert",
        input.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--json",
    ]);
    assert_valid(&load_schema("convert"), &json);

    assert_eq!(json["statistics"]["tables"], 2);
    assert_eq!(json["statistics"]["foreign_keys"], 1);
    assert_eq!(json["encoding"], "utf-8");
    assert!(!json["warnings"].as_array().unwrap().is_empty());
    assert!(out.exists());
}

#[test]
fn test_convert_json_dry_run_without_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("dump.sql");
    fs::write(&input, DUMP).unwrap();

    let json = json_stdout(&["convert", input.to_str().unwrap(), "--json", "--dry-run"]);
    assert_valid(&load_schema("convert"), &json);
    assert_eq!(json["dry_run"], true);
    assert!(json.get("output_file").is_none());
}

#[test]
fn test_convert_json_needs_output_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("dump.sql");
    fs::write(&input, DUMP).unwrap();

    let output = ddl_convert()
        .args(["convert", input.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_convert_multi_json_matches_schema() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("one.sql"), DUMP).unwrap();
    fs::write(dir.path().join("two.sql"), DUMP).unwrap();
    let pattern = dir.path().join("*.sql");
    let out_dir = dir.path().join("out");

    let json = json_stdout(&[
        "convert",
        pattern.to_str().unwrap(),
        "-o",
        out_dir.to_str().unwrap(),
        "--json",
    ]);
    assert_valid(&load_schema("convert-multi"), &json);
    assert_eq!(json["total_files"], 2);
    assert_eq!(json["succeeded"], 2);
}

#[test]
fn test_extract_json_matches_schema() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("dump.sql");
    fs::write(&input, DUMP).unwrap();

    let json = json_stdout(&["extract", input.to_str().unwrap(), "--json"]);
    assert_valid(&load_schema("extract"), &json);
    assert_eq!(json["statistics"]["statements_kept"], 2);
    assert_eq!(json["statistics"]["statements_skipped"], 1);
    assert!(json["output_file"]
        .as_str()
        .unwrap()
        .ends_with("dump_schema_only.sql"));
}

#[test]
fn test_extract_multi_json_matches_schema() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("one.sql"), DUMP).unwrap();
    fs::write(dir.path().join("two.sql"), DUMP).unwrap();
    let pattern = dir.path().join("*.sql");
    let out_dir = dir.path().join("schemas");

    let json = json_stdout(&[
        "extract",
        pattern.to_str().unwrap(),
        "-o",
        out_dir.to_str().unwrap(),
        "--json",
    ]);
    assert_valid(&load_schema("extract-multi"), &json);
    assert!(out_dir.join("one_schema_only.sql").exists());
    assert!(out_dir.join("two_schema_only.sql").exists());
}
