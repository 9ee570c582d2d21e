//! Integration tests for the search and open commands

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Isolated config and store file
struct TestEnv {
    _temp_dir: TempDir,
    config_path: PathBuf,
    store_path: PathBuf,
}

impl TestEnv {
    fn with_state(state: &str) -> Self {
        Self::with_state_and_config(state, "")
    }

    fn with_state_and_config(state: &str, extra_config: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let store_path = temp_dir.path().join("state.json");

        fs::write(&store_path, state).unwrap();
        fs::write(
            &config_path,
            format!("store = {:?}\n{}", store_path.to_str().unwrap(), extra_config),
        )
        .unwrap();

        Self {
            _temp_dir: temp_dir,
            config_path,
            store_path,
        }
    }

    fn cmd(&self) -> AssertCommand {
        let mut cmd = shopease_cmd();
        cmd.args(["--config", self.config_path.to_str().unwrap()]);
        cmd
    }
}

fn shopease_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("shopease").unwrap()
}

const TWO_PRODUCTS: &str = r#"{
    "products": {"items": [
        {"id": 1, "title": "Red Shirt", "price": 120, "image": "/img/red.png"},
        {"id": 2, "title": "Blue Jeans", "price": 300}
    ]},
    "cart": {"items": []}
}"#;

// =============================================================================
// search
// =============================================================================

#[test]
fn test_search_single_match() {
    let env = TestEnv::with_state(TWO_PRODUCTS);

    env.cmd()
        .args(["search", "shirt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Résultats pour : \"shirt\""))
        .stdout(predicate::str::contains("1 produit(s)"))
        .stdout(predicate::str::contains("Red Shirt\t120 DH\t/img/red.png"))
        .stdout(predicate::str::contains("Blue Jeans").not());
}

#[test]
fn test_search_is_case_insensitive_and_trimmed() {
    let env = TestEnv::with_state(TWO_PRODUCTS);

    env.cmd()
        .args(["search", "  JEANS  "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Résultats pour : \"JEANS\""))
        .stdout(predicate::str::contains("Blue Jeans\t300 DH\tno image"));
}

#[test]
fn test_search_whitespace_query_does_nothing() {
    let env = TestEnv::with_state(TWO_PRODUCTS);

    env.cmd()
        .args(["search", "   "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to search"))
        .stdout(predicate::str::contains("produit(s)").not());
}

#[test]
fn test_search_json_output() {
    let env = TestEnv::with_state(TWO_PRODUCTS);

    let output = env
        .cmd()
        .args(["search", "shirt", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["query"], "shirt");
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["title"], "Red Shirt");
    assert_eq!(body["items"][0]["id"], 1);
}

#[test]
fn test_search_without_store_file_finds_nothing() {
    let env = TestEnv::with_state("[]");
    fs::remove_file(&env.store_path).unwrap();

    env.cmd()
        .args(["search", "anything"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 produit(s)"));
}

#[test]
fn test_search_store_flag_overrides_config() {
    let env = TestEnv::with_state("[]");
    let other = env.store_path.with_file_name("other.json");
    fs::write(&other, r#"[{"id": "a1", "name": "Sac à dos", "price": "89.5"}]"#).unwrap();

    env.cmd()
        .args(["--store", other.to_str().unwrap(), "search", "sac"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 produit(s)"))
        .stdout(predicate::str::contains("Sac à dos\t89.5 DH"));
}

#[test]
fn test_search_extended_fields_and_currency() {
    let state = r#"{"items": [{"id": 3, "title": "Air Max", "brand": "Nike", "price": 900}]}"#;

    let name_only = TestEnv::with_state(state);
    name_only
        .cmd()
        .args(["search", "nike"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 produit(s)"));

    let extended =
        TestEnv::with_state_and_config(state, "currency = \"EUR\"\n[search]\nfields = \"extended\"\n");
    extended
        .cmd()
        .args(["search", "nike"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Air Max\t900 EUR"));
}

#[test]
fn test_search_malformed_store_fails() {
    let env = TestEnv::with_state("{ not json");

    env.cmd()
        .args(["search", "shirt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse store file"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");

    shopease_cmd()
        .args(["--config", missing.to_str().unwrap(), "search", "shirt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

// =============================================================================
// open
// =============================================================================

#[test]
fn test_open_encoded_target() {
    let env = TestEnv::with_state(TWO_PRODUCTS);

    env.cmd()
        .args(["open", "/productcherche?q=red%20shirt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Résultats pour : \"red shirt\""))
        .stdout(predicate::str::contains("1 produit(s)"));
}

#[test]
fn test_open_without_parameter_is_empty_search() {
    let env = TestEnv::with_state(TWO_PRODUCTS);

    env.cmd()
        .args(["open", "/productcherche"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Résultats pour : \"\""))
        .stdout(predicate::str::contains("0 produit(s)"));
}

#[test]
fn test_open_malformed_parameter_is_empty_search() {
    let env = TestEnv::with_state(TWO_PRODUCTS);

    env.cmd()
        .args(["open", "/productcherche?q=%E0%A4%A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 produit(s)"));
}

#[test]
fn test_open_other_routes() {
    let env = TestEnv::with_state(TWO_PRODUCTS);

    env.cmd()
        .args(["open", "/cart-items"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CART"));

    env.cmd()
        .args(["open", "/nowhere"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT FOUND: /nowhere"));
}
