//! Validation orchestration against an in-memory ETABS.

mod common;

use common::{FakeEtabs, Workspace};
use etab_cli::{validate_model, AnalysisStatus};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn messages(result: &etab_cli::OperationResult<etab_cli::ValidationData>) -> Vec<String> {
    result
        .data
        .as_ref()
        .map(|d| d.validation_messages.clone().into_vec())
        .unwrap_or_default()
}

#[test]
fn test_not_installed_fails_first() {
    let ws = Workspace::new();
    let model = ws.file("tower.edb");
    let fake = FakeEtabs::not_installed();
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("ETABS installation not found or not running")
    );
    let data = result.data.as_ref().unwrap();
    assert!(!data.etabs_installed);
    assert!(data.file_exists.is_none());
    assert_eq!(fake.connection_attempts(), 0);
}

#[test]
fn test_missing_file_fails_without_connecting() {
    let ws = Workspace::new();
    let model = ws.path("model.e2k");
    let fake = FakeEtabs::running();
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert_eq!(result.exit_code(), 1);
    let json: Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(json["success"], json!(false));
    assert_eq!(json["error"], json!("File not found"));
    assert_eq!(json["data"]["fileExists"], json!(false));
    assert!(json["data"].get("fileValid").is_none());
    assert_eq!(fake.connection_attempts(), 0);
    assert!(messages(&result)
        .last()
        .unwrap()
        .starts_with("✗ File not found: "));
}

#[test]
fn test_invalid_extension_fails_without_connecting() {
    let ws = Workspace::new();
    let model = ws.file("notes.txt");
    let fake = FakeEtabs::running();
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Invalid file type"));
    let data = result.data.as_ref().unwrap();
    assert_eq!(data.file_exists, Some(true));
    assert_eq!(data.file_valid, Some(false));
    assert_eq!(data.file_extension.as_deref(), Some(".txt"));
    assert_eq!(fake.connection_attempts(), 0);
    assert_eq!(
        messages(&result)[2..].to_vec(),
        vec!["✗ Invalid file type: .txt", "Expected: .edb or .e2k"]
    );
}

#[test]
fn test_health_check_without_file() {
    let fake = FakeEtabs::running();
    let mut files = fake.files();

    let result = validate_model(&mut files, None);

    assert!(result.success);
    let data = result.data.unwrap();
    assert!(data.etabs_installed);
    assert_eq!(data.etabs_version.as_deref(), Some("22.1.0"));
    assert!(data.file_path.is_none());
    assert!(data.is_analyzed.is_none());
}

#[test]
fn test_unknown_version_is_not_fatal() {
    let ws = Workspace::new();
    let model = ws.file("tower.e2k");
    let fake = FakeEtabs::running();
    fake.state.borrow_mut().version = None;
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(result.success);
    assert!(result.data.as_ref().unwrap().etabs_version.is_none());
    assert!(messages(&result).contains(&"⚠ ETABS version: Unknown".to_string()));
}

#[test]
fn test_already_open_file_is_not_reopened() {
    let ws = Workspace::new();
    let model = ws.file("tower.edb");
    let fake = FakeEtabs::running().open(&model);
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(result.success);
    assert!(fake.open_calls().is_empty());
    let data = result.data.as_ref().unwrap();
    assert_eq!(data.file_valid, Some(true));
    assert_eq!(data.is_analyzed, Some(true));
    assert!(messages(&result).contains(&"✓ File is already open in ETABS".to_string()));
}

#[test]
fn test_restores_previously_open_file() {
    let ws = Workspace::new();
    let model = ws.file("tower.edb");
    let original = ws.file("podium.edb");
    let fake = FakeEtabs::running().open(&original);
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(result.success);
    assert_eq!(fake.open_calls(), vec![model.clone(), original.clone()]);
    assert_eq!(fake.current(), Some(original));

    insta::assert_snapshot!(messages(&result).join("\n"), @r"
    ✓ ETABS is installed
    ✓ File exists: tower.edb
    ✓ Valid ETABS file type: .edb
    ✓ ETABS version: 22.1.0
    ℹ Currently open file: podium.edb
    ℹ Opening file for validation: tower.edb
    ✓ Model has been analyzed
    ℹ Restoring previously open file: podium.edb
    ");
}

#[test]
fn test_no_restore_when_nothing_was_open() {
    let ws = Workspace::new();
    let model = ws.file("tower.edb");
    let fake = FakeEtabs::running();
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(result.success);
    assert_eq!(fake.open_calls(), vec![model.clone()]);
    assert_eq!(fake.current(), Some(model));
}

#[test]
fn test_open_failure_reports_status_code() {
    let ws = Workspace::new();
    let model = ws.file("tower.edb");
    let fake = FakeEtabs::running();
    fake.state.borrow_mut().open_failures.insert(model.clone(), 2);
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Could not open file for validation")
    );
    assert_eq!(result.data.as_ref().unwrap().file_valid, Some(false));
    assert_eq!(
        messages(&result).last().map(String::as_str),
        Some("✗ Failed to open file for validation: Failed to open file. Error code: 2")
    );
}

#[test]
fn test_unreadable_analysis_status_is_unknown_not_failure() {
    let ws = Workspace::new();
    let model = ws.file("tower.edb");
    let fake = FakeEtabs::running();
    fake.state.borrow_mut().cases = None;
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(result.success);
    let data = result.data.as_ref().unwrap();
    assert_eq!(data.is_analyzed, Some(false));
    assert_eq!(data.analysis_status, Some(AnalysisStatus::Unknown));
}

#[test]
fn test_not_analyzed_model() {
    let ws = Workspace::new();
    let model = ws.file("tower.edb");
    let fake = FakeEtabs::running();
    fake.state.borrow_mut().cases = Some(vec![etab_cli::CaseStatus::new("Dead", 1)]);
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(result.success);
    let data = result.data.as_ref().unwrap();
    assert_eq!(data.analysis_status, Some(AnalysisStatus::NotAnalyzed));
    assert!(messages(&result).contains(&"⚠ Model has not been analyzed".to_string()));
}

#[test]
fn test_restore_failure_is_only_a_warning() {
    let ws = Workspace::new();
    let model = ws.file("tower.edb");
    let original = ws.file("podium.edb");
    let fake = FakeEtabs::running().open(&original);
    fake.state
        .borrow_mut()
        .open_failures
        .insert(original.clone(), 5);
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(result.success);
    assert_eq!(fake.current(), Some(model));
    assert!(messages(&result)
        .last()
        .unwrap()
        .starts_with("⚠ Warning: Could not restore original file."));
}

#[test]
fn test_unexpected_error_is_reported_in_envelope() {
    let ws = Workspace::new();
    let model = ws.file("tower.edb");
    let fake = FakeEtabs::running();
    fake.state.borrow_mut().crash_on_model_path = true;
    let mut files = fake.files();

    let result = validate_model(&mut files, Some(&model));

    assert!(!result.success);
    assert_eq!(result.exit_code(), 1);
    assert_eq!(
        result.error.as_deref(),
        Some("Validation failed: interop layer crashed")
    );
    let data = result.data.as_ref().unwrap();
    assert!(data.etabs_installed);
    assert_eq!(data.file_exists, Some(true));
    assert_eq!(data.file_extension.as_deref(), Some(".edb"));
    assert!(data.file_valid.is_none());
    assert_eq!(
        data.validation_messages.last(),
        Some("✗ Unexpected error: interop layer crashed")
    );
}
