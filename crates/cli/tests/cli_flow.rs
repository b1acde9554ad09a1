//! End-to-end tests for the `quarry` binary: build, query, verify, and the
//! exit-code contract.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(path, content).expect("write fixture");
}

fn fixture() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    write(
        temp.path(),
        "quarry.json",
        r#"{
  "outputDir": ".quarry",
  "engine": { "name": "quarry-hash-tf", "version": "1", "dimension": 64 },
  "isolation": { "mode": "none" }
}
"#,
    );
    write(
        temp.path(),
        "backend/src/routes/playback.ts",
        r#"import { Router } from 'express';

const router = Router();

router.get('/playback/state', (req, res) => {
  // report playback state to the client
  res.json(playbackState());
});

export default router;
"#,
    );
    write(
        temp.path(),
        "frontend/components/badge.ts",
        "export function badgeColor(state) {\n  return state ? 'green' : 'gray';\n}\n",
    );
    temp
}

fn quarry(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quarry").expect("binary");
    cmd.current_dir(dir.path());
    cmd
}

#[test]
fn build_query_verify_happy_path() {
    let temp = fixture();

    quarry(&temp)
        .args(["build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("files:"));

    quarry(&temp)
        .args(["query", "playback state route"])
        .assert()
        .success()
        .stdout(predicate::str::contains("routes/playback.ts"));

    quarry(&temp)
        .args(["verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verify: ok"));
}

#[test]
fn invalid_top_falls_back_to_default() {
    let temp = fixture();
    quarry(&temp).args(["build"]).assert().success();

    quarry(&temp)
        .args(["query", "playback state", "--top", "not-a-number"])
        .assert()
        .success()
        .stdout(predicate::str::contains("routes/playback.ts"));
}

#[test]
fn query_json_is_machine_readable() {
    let temp = fixture();
    quarry(&temp).args(["build"]).assert().success();

    let output = quarry(&temp)
        .args(["query", "playback state", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let payload: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert!(payload["hits"].is_array());
    assert_eq!(payload["query"], "playback state");
}

#[test]
fn deleted_source_is_a_warning_unless_strict() {
    let temp = fixture();
    quarry(&temp).args(["build"]).assert().success();

    std::fs::remove_file(temp.path().join("frontend/components/badge.ts")).expect("delete");

    quarry(&temp)
        .args(["verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("warnings"));

    quarry(&temp)
        .args(["verify", "--strict"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("verify: error"));
}

#[test]
fn missing_config_is_fatal() {
    let temp = TempDir::new().expect("tempdir");
    quarry(&temp)
        .args(["build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn unknown_subcommand_prints_usage_and_exits_zero() {
    let temp = TempDir::new().expect("tempdir");
    quarry(&temp)
        .args(["frobnicate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}
