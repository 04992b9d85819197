//! Integration tests for prompt lifecycle operations via CLI.
//!
//! Covers the full release-engine lifecycle end-to-end:
//! create -> save -> deploy -> adopt -> checkout -> releases, plus the
//! error shapes for duplicate versions and conflicting deploy flags.

use predicates::prelude::*;

mod common;
use common::TestEnv;

/// Create a prompt and return its entity id.
fn create_prompt(env: &TestEnv, name: &str) -> String {
    let created = env.cap_json(&[
        "prompt", "create", name, "--agent", "agt-1", "--content", "Hello {{name}}",
    ]);
    created["id"].as_str().unwrap().to_string()
}

#[test]
fn test_create_seeds_first_release() {
    let env = TestEnv::init();
    let created = env.cap_json(&[
        "prompt", "create", "Welcome", "--agent", "agt-1", "--content", "Hi",
    ]);

    assert_eq!(created["release"]["version"], "0.0.1");
    assert_eq!(created["slug"], "welcome");
    assert_eq!(
        created["current_release_id"].as_str().unwrap(),
        created["release"]["id"].as_str().unwrap()
    );
}

#[test]
fn test_create_reserved_slug_fails() {
    let env = TestEnv::init();
    env.cap()
        .args(["prompt", "create", "New", "--agent", "agt-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reserved"));
}

#[test]
fn test_save_and_deploy_bump() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    let saved = env.cap_json(&["prompt", "save", &id, "--content", "Updated text"]);
    assert_eq!(saved["entity_id"].as_str().unwrap(), id);

    let release = env.cap_json(&["prompt", "deploy", &id, "--bump", "minor"]);
    assert_eq!(release["version"], "0.1.0");
    assert_eq!(release["content"]["content"], "Updated text");
}

#[test]
fn test_idempotent_save_hash() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    let first = env.cap_json(&["prompt", "save", &id, "--content", "Same"]);
    let second = env.cap_json(&["prompt", "save", &id, "--content", "Same"]);
    assert_eq!(first["content_hash"], second["content_hash"]);
}

#[test]
fn test_deploy_duplicate_version_fails() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    env.cap_json(&["prompt", "deploy", &id, "--version", "0.1.0"]);
    env.cap()
        .args(["prompt", "deploy", id.as_str(), "--version", "0.1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_deploy_version_and_bump_conflict() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    env.cap()
        .args([
            "prompt", "deploy", id.as_str(), "--version", "0.1.0", "--bump", "patch",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not both"));
}

#[test]
fn test_adopt_rolls_pointer_back() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    let first_release = env.cap_json(&["prompt", "releases", &id])[0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    env.cap_json(&["prompt", "deploy", &id, "--bump", "minor"]);

    let adopted = env.cap_json(&["prompt", "adopt", &id, &first_release]);
    assert_eq!(adopted["version"], "0.0.1");

    let shown = env.cap_json(&["prompt", "show", &id]);
    assert_eq!(
        shown["entity"]["current_release_id"].as_str().unwrap(),
        first_release
    );

    // Adoption created no release
    let releases = env.cap_json(&["prompt", "releases", &id]);
    assert_eq!(releases.as_array().unwrap().len(), 2);
}

#[test]
fn test_checkout_restores_draft() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    let first_release = env.cap_json(&["prompt", "releases", &id])[0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    env.cap_json(&["prompt", "save", &id, "--content", "Draft to discard"]);

    env.cap_json(&["prompt", "checkout", &id, &first_release]);

    let shown = env.cap_json(&["prompt", "show", &id]);
    assert_eq!(
        shown["working_copy"]["content"]["content"],
        "Hello {{name}}"
    );
}

#[test]
fn test_releases_ordered_by_version() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    env.cap_json(&["prompt", "deploy", &id, "--version", "1.0.0"]);
    env.cap_json(&["prompt", "deploy", &id, "--version", "0.5.0"]);

    let releases = env.cap_json(&["prompt", "releases", &id]);
    let versions: Vec<&str> = releases
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["version"].as_str().unwrap())
        .collect();
    assert_eq!(versions, vec!["1.0.0", "0.5.0", "0.0.1"]);
}

#[test]
fn test_show_by_slug_and_list() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    let shown = env.cap_json(&["prompt", "show", "welcome"]);
    assert_eq!(shown["entity"]["id"].as_str().unwrap(), id);

    let listed = env.cap_json(&["prompt", "list"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn test_rm_deletes_history() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    env.cap_json(&["prompt", "rm", &id]);
    env.cap()
        .args(["prompt", "show", id.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_org_isolation_through_cli() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    env.cap()
        .args(["prompt", "show", id.as_str(), "--org", "org-other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_resolve_modes() {
    let env = TestEnv::init();
    let id = create_prompt(&env, "Welcome");

    let first_release = env.cap_json(&["prompt", "releases", &id])[0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    env.cap_json(&["prompt", "deploy", &id, "--bump", "minor"]);

    let current = env.cap_json(&["prompt", "resolve", &id]);
    assert_eq!(current["version"], "0.1.0");

    let fixed = env.cap_json(&[
        "prompt", "resolve", &id, "--mode", "fixed", "--release", &first_release,
    ]);
    assert_eq!(fixed["version"], "0.0.1");
}

#[test]
fn test_human_output() {
    let env = TestEnv::init();
    env.cap()
        .args([
            "prompt", "create", "Welcome", "--agent", "agt-1", "-H",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created prompt"))
        .stdout(predicate::str::contains("0.0.1"));
}
