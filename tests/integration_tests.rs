//! Integration tests for the bestiary CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use bestiary::core::{DocumentStore, EntityId, EntityKind, LinkField, MirrorIntent, SqliteStore};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Helper to get a bestiary command
fn bestiary() -> Command {
    let mut cmd = Command::cargo_bin("bestiary").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("BESTIARY_DATABASE")
        .env_remove("BESTIARY_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    bestiary().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Run a command that prints an id (`--format id`) and return it
fn run_for_id(tmp: &TempDir, args: &[&str]) -> String {
    let output = bestiary()
        .current_dir(tmp.path())
        .args(args)
        .args(["--format", "id"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Run `<kind> show <id> --format json` and parse the result
fn show_json(tmp: &TempDir, kind: &str, id: &str) -> Value {
    let output = bestiary()
        .current_dir(tmp.path())
        .args([kind, "show", id, "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

fn ids(value: &Value, field: &str) -> Vec<String> {
    value[field]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    bestiary()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("creature"))
        .stdout(predicate::str::contains("handler"))
        .stdout(predicate::str::contains("link"));
}

#[test]
fn test_version_displays() {
    bestiary()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bestiary"));
}

#[test]
fn test_completions_generate() {
    bestiary()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bestiary"));
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_creates_project() {
    let tmp = TempDir::new().unwrap();
    bestiary()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized bestiary project"));

    assert!(tmp.path().join(".bestiary/config.yaml").exists());
    assert!(tmp.path().join(".bestiary/catalog.db").exists());
}

#[test]
fn test_init_twice_reports_existing() {
    let tmp = setup_test_project();
    bestiary()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();
    bestiary()
        .current_dir(tmp.path())
        .args(["creature", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a bestiary project"));
}

#[test]
fn test_project_flag_selects_project() {
    let tmp = setup_test_project();
    let elsewhere = TempDir::new().unwrap();
    let project = tmp.path().to_string_lossy().to_string();

    bestiary()
        .current_dir(elsewhere.path())
        .args(["--project", &project, "move", "add", "Tackle"])
        .assert()
        .success();
    assert_eq!(show_json(&tmp, "move", "1")["name"], "Tackle");
}

// ============================================================================
// Entity Tests
// ============================================================================

#[test]
fn test_move_add_and_show() {
    let tmp = setup_test_project();
    let id = run_for_id(&tmp, &["move", "add", "Thunderbolt", "--power", "90", "--accuracy", "1.0"]);
    assert_eq!(id, "1");

    let shown = show_json(&tmp, "move", &id);
    assert_eq!(shown["name"], "Thunderbolt");
    assert_eq!(shown["power"], 90);

    bestiary()
        .current_dir(tmp.path())
        .args(["move", "update", "1", "--power", "95"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated move"));
    assert_eq!(show_json(&tmp, "move", "1")["power"], 95);
}

#[test]
fn test_show_missing_entity_fails() {
    let tmp = setup_test_project();
    bestiary()
        .current_dir(tmp.path())
        .args(["creature", "show", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Creature with ID 9 not found"));
}

#[test]
fn test_handler_mirror_scenario() {
    let tmp = setup_test_project();
    let ash = run_for_id(&tmp, &["handler", "add", "Ash"]);
    let pikachu = run_for_id(&tmp, &["creature", "add", "Pikachu"]);

    bestiary()
        .current_dir(tmp.path())
        .args(["handler", "update", &ash, "--creatures", &pikachu])
        .assert()
        .success();
    assert_eq!(ids(&show_json(&tmp, "creature", &pikachu), "handler_ids"), vec![ash.clone()]);

    bestiary()
        .current_dir(tmp.path())
        .args(["handler", "delete", &ash])
        .assert()
        .success()
        .stdout(predicate::str::contains("Handler deleted successfully with Id 1"));
    assert!(ids(&show_json(&tmp, "creature", &pikachu), "handler_ids").is_empty());
}

#[test]
fn test_empty_list_clears_links() {
    let tmp = setup_test_project();
    let ash = run_for_id(&tmp, &["handler", "add", "Ash"]);
    let pikachu = run_for_id(&tmp, &["creature", "add", "Pikachu", "--handlers", &ash]);
    assert_eq!(ids(&show_json(&tmp, "handler", &ash), "creature_ids"), vec![pikachu.clone()]);

    bestiary()
        .current_dir(tmp.path())
        .args(["creature", "update", &pikachu, "--handlers", ""])
        .assert()
        .success();
    assert!(ids(&show_json(&tmp, "handler", &ash), "creature_ids").is_empty());
    assert!(ids(&show_json(&tmp, "creature", &pikachu), "handler_ids").is_empty());
}

#[test]
fn test_type_strengths_are_mirrored() {
    let tmp = setup_test_project();
    let fire = run_for_id(&tmp, &["type", "add", "Fire"]);
    let water = run_for_id(&tmp, &["type", "add", "Water", "--strong", &fire]);

    assert_eq!(ids(&show_json(&tmp, "type", &fire), "weak_against_ids"), vec![water.clone()]);

    let output = bestiary()
        .current_dir(tmp.path())
        .args(["type", "show", &fire, "--resolve", "--format", "json"])
        .output()
        .unwrap();
    let resolved: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(resolved["weak_against"][0]["name"], "Water");
}

#[test]
fn test_delete_move_cascades_to_creatures() {
    let tmp = setup_test_project();
    let tackle = run_for_id(&tmp, &["move", "add", "Tackle"]);
    let eevee = run_for_id(&tmp, &["creature", "add", "Eevee", "--moves", &tackle]);

    bestiary()
        .current_dir(tmp.path())
        .args(["move", "delete", &tackle])
        .assert()
        .success()
        .stdout(predicate::str::contains("Move deleted successfully with Id 1"));
    assert!(ids(&show_json(&tmp, "creature", &eevee), "move_ids").is_empty());
}

#[test]
fn test_ids_are_not_reused() {
    let tmp = setup_test_project();
    for name in ["Tackle", "Growl", "Ember"] {
        run_for_id(&tmp, &["move", "add", name]);
    }
    bestiary()
        .current_dir(tmp.path())
        .args(["move", "delete", "3"])
        .assert()
        .success();
    assert_eq!(run_for_id(&tmp, &["move", "add", "Surf"]), "4");
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_duplicate_name_rejected() {
    let tmp = setup_test_project();
    run_for_id(&tmp, &["creature", "add", "Pikachu"]);
    bestiary()
        .current_dir(tmp.path())
        .args(["creature", "add", "PIKACHU"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_invalid_reference_rejected() {
    let tmp = setup_test_project();
    bestiary()
        .current_dir(tmp.path())
        .args(["creature", "add", "Eevee", "--moves", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid IDs detected: Moves: 4"));

    bestiary()
        .current_dir(tmp.path())
        .args(["creature", "list", "--count"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_malformed_id_rejected_by_parser() {
    let tmp = setup_test_project();
    bestiary()
        .current_dir(tmp.path())
        .args(["creature", "add", "Eevee", "--moves", "1,abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid id"));
}

// ============================================================================
// Output Format Tests
// ============================================================================

#[test]
fn test_list_formats() {
    let tmp = setup_test_project();
    run_for_id(&tmp, &["handler", "add", "Ash"]);
    run_for_id(&tmp, &["handler", "add", "Misty"]);

    bestiary()
        .current_dir(tmp.path())
        .args(["handler", "list", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ID,NAME,CREATURES"))
        .stdout(predicate::str::contains("2,Misty,-"));

    bestiary()
        .current_dir(tmp.path())
        .args(["handler", "list", "--format", "id"])
        .assert()
        .success()
        .stdout("1\n2\n");

    bestiary()
        .current_dir(tmp.path())
        .args(["handler", "list", "--search", "mis", "--format", "md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Misty"))
        .stdout(predicate::str::contains("Ash").not());
}

// ============================================================================
// Link Check Tests
// ============================================================================

#[test]
fn test_link_check_clean_project() {
    let tmp = setup_test_project();
    let ash = run_for_id(&tmp, &["handler", "add", "Ash"]);
    run_for_id(&tmp, &["creature", "add", "Pikachu", "--handlers", &ash]);

    bestiary()
        .current_dir(tmp.path())
        .args(["link", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All links are valid"));
}

#[test]
fn test_link_check_finds_and_fixes_broken_links() {
    let tmp = setup_test_project();
    run_for_id(&tmp, &["handler", "add", "Ash"]);

    // Simulate a mutation that stopped before its mirror update
    {
        let store = SqliteStore::open(&tmp.path().join(".bestiary/catalog.db")).unwrap();
        store
            .insert_one(
                EntityKind::Creature,
                serde_json::json!({
                    "id": "1",
                    "name": "Pikachu",
                    "handler_ids": ["1"],
                    "move_ids": ["7"]
                }),
            )
            .unwrap();
    }

    bestiary()
        .current_dir(tmp.path())
        .args(["link", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 broken link(s) found"));

    bestiary()
        .current_dir(tmp.path())
        .args(["link", "check", "--fix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Repaired 2 link(s)"));

    bestiary()
        .current_dir(tmp.path())
        .args(["link", "check"])
        .assert()
        .success();
    assert_eq!(ids(&show_json(&tmp, "handler", "1"), "creature_ids"), vec!["1".to_string()]);
    assert!(ids(&show_json(&tmp, "creature", "1"), "move_ids").is_empty());
}

#[test]
fn test_link_check_fix_finishes_interrupted_removal() {
    let tmp = setup_test_project();
    let ash = run_for_id(&tmp, &["handler", "add", "Ash"]);
    run_for_id(&tmp, &["creature", "add", "Pikachu", "--handlers", &ash]);

    // Ash dropped Pikachu, but the process died before Pikachu was updated
    {
        let store = SqliteStore::open(&tmp.path().join(".bestiary/catalog.db")).unwrap();
        store
            .record_intent(&MirrorIntent {
                kind: EntityKind::Handler,
                id: EntityId::new(1),
                fields: vec![LinkField::CreatureIds],
            })
            .unwrap();
        let mut fields = serde_json::Map::new();
        fields.insert("creature_ids".to_string(), serde_json::json!([]));
        store
            .set_fields(EntityKind::Handler, EntityId::new(1), fields)
            .unwrap();
    }

    bestiary()
        .current_dir(tmp.path())
        .args(["link", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 interrupted update(s) pending"));

    bestiary()
        .current_dir(tmp.path())
        .args(["link", "check", "--fix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Finished 1 interrupted update(s)"))
        .stdout(predicate::str::contains("Repaired").not());

    bestiary()
        .current_dir(tmp.path())
        .args(["link", "check"])
        .assert()
        .success();
    assert!(ids(&show_json(&tmp, "handler", "1"), "creature_ids").is_empty());
    assert!(ids(&show_json(&tmp, "creature", "1"), "handler_ids").is_empty());
}
