//! CLI tests for the `vs` binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use vectorstore::{EmbeddingStore, NewRecord};

fn seeded_store() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let store = EmbeddingStore::open(temp.path()).expect("open store");
    store
        .upsert(&NewRecord {
            id: "entry-1".to_string(),
            index_text: "What is the capital of France?".to_string(),
            content: "Paris".to_string(),
            metadata: json!({"kind": "validated"}),
            embedding: vec![1.0, 0.0, 0.0],
        })
        .expect("upsert");
    temp
}

fn vs(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vs").expect("vs binary");
    cmd.current_dir(temp.path()).arg("--store").arg(temp.path());
    cmd
}

#[test]
fn test_count_and_list() {
    let temp = seeded_store();
    vs(&temp).arg("count").assert().success().stdout("1\n");
    vs(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("entry-1"))
        .stdout(predicate::str::contains("capital of France"));
}

#[test]
fn test_show_record() {
    let temp = seeded_store();
    vs(&temp)
        .args(["show", "entry-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dimensions: 3"))
        .stdout(predicate::str::contains("Paris"));
}

#[test]
fn test_delete_unknown_record_fails() {
    let temp = seeded_store();
    vs(&temp)
        .args(["delete", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record not found"));
}

#[test]
fn test_clear_requires_confirmation() {
    let temp = seeded_store();
    vs(&temp).arg("clear").assert().failure();
    vs(&temp).arg("count").assert().success().stdout("1\n");

    vs(&temp)
        .args(["clear", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1 records"));
    vs(&temp).arg("count").assert().success().stdout("0\n");
}
