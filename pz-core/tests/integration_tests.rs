/*
 * Integration tests for pz-core
 *
 * Drive the controller end to end against the in-memory line backend and a
 * temporary data file.
 */

use pz_core::{
    Controller, Level, LineManager, LineOp, MemoryLineClient, ParamStore, PinMap, PinzoneError,
    Polarity, ShutdownOutcome,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// Test utilities
struct Rig {
    _dir: TempDir,
    path: PathBuf,
    client: MemoryLineClient,
    controller: Arc<Controller<MemoryLineClient>>,
}

fn rig() -> Rig {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("40pin.json");
    let client = MemoryLineClient::new();
    let lines = LineManager::new(client.clone()).with_settle_delay(Duration::ZERO);
    let controller = Arc::new(Controller::new(lines, ParamStore::new(&path), PinMap::default()));
    controller.load().unwrap();
    controller.init_lines().unwrap();
    Rig { _dir: dir, path, client, controller }
}

fn form(fields: &[(&str, &str)]) -> BTreeMap<String, String> {
    fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Zone 1 on pin 11 (enabled), zone 2 on pin 13 (disabled), low-active board
fn two_zone_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("active", "low"),
        ("order_11", "1"),
        ("enable_11", "on"),
        ("notes_11", "front lawn"),
        ("order_13", "2"),
        ("notes_13", "back beds"),
    ]
}

fn configured_rig() -> Rig {
    let rig = rig();
    let outcome = rig.controller.apply_settings(&form(&two_zone_form())).unwrap();
    assert!(outcome.changed && outcome.reinit);
    rig.client.take_ops();
    rig
}

// ============================================================================
// Startup
// ============================================================================

#[test]
fn test_first_start_writes_default_file() {
    let rig = rig();
    assert!(rig.path.exists());

    let raw = fs::read_to_string(&rig.path).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved["active"], "low");
    assert!(rig.controller.status().held_lines.is_empty());
}

#[test]
fn test_corrupt_file_refuses_to_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("40pin.json");
    fs::write(&path, "{ not json").unwrap();

    let lines = LineManager::new(MemoryLineClient::new()).with_settle_delay(Duration::ZERO);
    let controller = Controller::new(lines, ParamStore::new(&path), PinMap::default());
    assert!(matches!(controller.load(), Err(PinzoneError::JsonParse(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    assert!(!controller.status().config_loaded);
}

#[test]
fn test_init_request_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("40pin.json");
    fs::write(
        &path,
        r#"{"active":"low","pins":[{"pin":11,"notes":"","enabled":true,"order":1}]}"#,
    )
    .unwrap();

    let client = MemoryLineClient::new();
    client.fail_request(17);
    let lines = LineManager::new(client.clone()).with_settle_delay(Duration::ZERO);
    let controller = Controller::new(lines, ParamStore::new(&path), PinMap::default());
    controller.load().unwrap();

    let err = controller.init_lines().unwrap_err();
    assert!(matches!(err, PinzoneError::LineRequest { line: 17, .. }));
    assert!(!controller.status().lines_ready);

    client.clear_faults();
    controller.init_lines().unwrap();
    assert_eq!(controller.status().held_lines, vec![17]);
}

// ============================================================================
// Switching
// ============================================================================

#[test]
fn test_zone_on_low_active_drives_low_and_skips_disabled() {
    let rig = configured_rig();

    let report = rig.controller.zone_change(vec![true, false]);
    assert_eq!(rig.client.writes(), vec![(17, Level::Low)]);
    assert_eq!(report.writes.len(), 1);
    assert_eq!(report.writes[0].physical, 11);
}

#[test]
fn test_zone_off_low_active_drives_high() {
    let rig = configured_rig();
    rig.controller.zone_change(vec![true]);
    rig.controller.zone_change(vec![false]);
    assert_eq!(rig.client.writes(), vec![(17, Level::Low), (17, Level::High)]);
}

#[test]
fn test_write_failure_does_not_abort_sweep() {
    let rig = rig();
    let mut fields = two_zone_form();
    fields.push(("enable_13", "on"));
    rig.controller.apply_settings(&form(&fields)).unwrap();
    rig.client.take_ops();
    rig.client.fail_write(17);

    let report = rig.controller.zone_change(vec![true, true]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(rig.client.level(27), Some(Level::Low));
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_duplicate_orders_rejected_and_file_untouched() {
    let rig = configured_rig();
    let before = fs::read_to_string(&rig.path).unwrap();

    let err = rig
        .controller
        .apply_settings(&form(&[("active", "low"), ("order_3", "5"), ("order_7", "5")]))
        .unwrap_err();

    match err {
        PinzoneError::DuplicateOrder { values } => assert_eq!(values, vec![5]),
        other => panic!("expected duplicate order error, got {:?}", other),
    }
    assert_eq!(fs::read_to_string(&rig.path).unwrap(), before);
    assert!(rig.client.ops().is_empty());
}

#[test]
fn test_notes_change_saves_without_reinit() {
    let rig = configured_rig();
    let mut fields = two_zone_form();
    fields.retain(|(k, _)| *k != "notes_11");
    fields.push(("notes_11", "front lawn (drip)"));

    let outcome = rig.controller.apply_settings(&form(&fields)).unwrap();
    assert!(outcome.changed);
    assert!(!outcome.reinit);
    assert!(rig.client.ops().is_empty());

    let saved = ParamStore::new(&rig.path).load().unwrap();
    assert_eq!(saved.pin(11).unwrap().notes, "front lawn (drip)");
}

#[test]
fn test_enable_change_reinits_lines() {
    let rig = configured_rig();
    let mut fields = two_zone_form();
    fields.push(("enable_13", "on"));

    let outcome = rig.controller.apply_settings(&form(&fields)).unwrap();
    assert!(outcome.reinit);
    assert_eq!(
        rig.client.ops(),
        vec![LineOp::Release(17), LineOp::Request(17), LineOp::Request(27)]
    );
    assert_eq!(rig.controller.status().held_lines, vec![17, 27]);
}

#[test]
fn test_unchanged_form_is_a_no_op() {
    let rig = configured_rig();
    let before = fs::read_to_string(&rig.path).unwrap();

    let outcome = rig.controller.apply_settings(&form(&two_zone_form())).unwrap();
    assert!(!outcome.changed);
    assert_eq!(fs::read_to_string(&rig.path).unwrap(), before);
}

#[test]
fn test_polarity_change_disables_all_pins() {
    let rig = configured_rig();
    let mut fields = two_zone_form();
    fields[0] = ("active", "high");

    let outcome = rig.controller.apply_settings(&form(&fields)).unwrap();
    assert!(outcome.changed && outcome.reinit);

    let params = rig.controller.params();
    assert_eq!(params.active, Polarity::High);
    assert_eq!(params.enabled_pins().count(), 0);
    assert!(rig.controller.status().held_lines.is_empty());

    let report = rig.controller.zone_change(vec![true, true]);
    assert!(report.writes.is_empty());
}

#[test]
fn test_reinit_failure_keeps_params_in_memory_only() {
    let rig = configured_rig();
    let before = fs::read_to_string(&rig.path).unwrap();
    rig.client.fail_request(27);

    let mut fields = two_zone_form();
    fields.push(("enable_13", "on"));
    let err = rig.controller.apply_settings(&form(&fields)).unwrap_err();

    assert!(matches!(err, PinzoneError::LineRequest { line: 27, .. }));
    assert!(rig.controller.params().is_enabled(13));
    assert_eq!(fs::read_to_string(&rig.path).unwrap(), before);
}

#[test]
fn test_settings_view_reflects_saved_config() {
    let rig = configured_rig();
    let view = rig.controller.settings_view();

    let row = view.pins.iter().find(|r| r.pin == 13).unwrap();
    assert_eq!(row.label, "GPIO27");
    assert_eq!(row.order, Some(2));
    assert_eq!(row.notes, "back beds");
    assert!(!row.enabled);

    let ground = view.pins.iter().find(|r| r.pin == 6).unwrap();
    assert!(!ground.gpio_capable);
    assert_eq!(ground.order, None);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn test_shutdown_releases_everything() {
    let rig = configured_rig();

    match rig.controller.shutdown(Duration::from_secs(5)) {
        ShutdownOutcome::Released(report) => assert_eq!(report.released, vec![17]),
        other => panic!("unexpected shutdown outcome {:?}", other),
    }
    assert!(rig.client.held().is_empty());
}

#[test]
fn test_shutdown_gives_up_after_grace() {
    let rig = configured_rig();
    rig.client.set_release_delay(Duration::from_millis(500));

    let started = Instant::now();
    let outcome = rig.controller.shutdown(Duration::from_millis(50));
    assert_eq!(outcome, ShutdownOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_millis(450));

    // The helper thread still finishes the job
    std::thread::sleep(Duration::from_millis(700));
    assert!(rig.client.held().is_empty());
    assert!(rig.controller.status().held_lines.is_empty());
}
