//! Script replay from files

use appcell_harness::{run_script, Script, DEMO_SCRIPT};
use pretty_assertions::assert_eq;
use std::io::Write;

#[tokio::test]
async fn script_file_replays_like_the_demo() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DEMO_SCRIPT.as_bytes()).unwrap();

    let script = Script::from_path(file.path()).unwrap();
    let report = run_script(script).await.unwrap();

    assert!(report.passed(), "{}", report.generate_text());
    assert_eq!(report.final_state.as_deref(), Some("{mode: success}"));
}

#[tokio::test]
async fn failed_expectation_is_reported() {
    let mut script = Script::from_json(DEMO_SCRIPT).unwrap();
    script.steps.truncate(0);
    script.steps.push(
        serde_json::from_value(serde_json::json!({
            "step": "expect",
            "state": { "mode": "success" }
        }))
        .unwrap(),
    );

    let report = run_script(script).await.unwrap();

    assert!(!report.passed());
    assert_eq!(report.violations.len(), 1);
    assert!(report.generate_text().contains("Result: FAIL (1 violations)"));
}

#[test]
fn unreadable_script_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");

    let err = Script::from_path(&missing).unwrap_err();

    assert!(format!("{err:#}").contains("missing.json"));
}

#[test]
fn malformed_script_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ \"steps\": 3 }").unwrap();

    assert!(Script::from_path(file.path()).is_err());
}
