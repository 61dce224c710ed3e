mod common;

use common::*;
use std::fs;
use tempfile::TempDir;
use warnview::WarnError;
use warnview::config::{Settings, SettingsHub};
use warnview::workspace::{HiddenReason, OpenOutcome, Workspace};

#[test]
fn test_open_reports_status_for_default_selection() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "mixed.log", MIXED_LOG);
    let mut ws = create_test_workspace();

    assert_eq!(ws.open_log(&log).unwrap(), OpenOutcome::Opened(0));
    // First available category is the untagged one
    assert_eq!(ws.status_message().unwrap(), "showing 1 warnings");
    assert_eq!(ws.visible_warning(0).unwrap().line_number, 99);
}

#[test]
fn test_directory_is_not_a_log() {
    let dir = TempDir::new().unwrap();
    let mut ws = create_test_workspace();

    match ws.open_log(dir.path()) {
        Err(WarnError::SourceUnreadable { reason, .. }) => {
            assert_eq!(reason, "not a regular file");
        }
        other => panic!("expected SourceUnreadable, got {:?}", other),
    }
}

#[test]
fn test_settings_file_pattern_applies_to_new_logs() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join(".warnview.toml");
    fs::write(&config, "category_filter_regexp = \"^clazy-\"\n").unwrap();
    let log = write_log(&dir, "mixed.log", MIXED_LOG);

    let mut ws = Workspace::new(SettingsHub::load(&config).unwrap());
    ws.open_log(&log).unwrap();
    ws.select_all_categories();

    let engine = ws.current().unwrap().engine();
    assert_eq!(engine.available_categories().len(), 2);
    assert_eq!(engine.visible_count(), 2);
}

#[test]
fn test_settings_reload_from_disk_rebuilds_sessions() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join(".warnview.toml");
    fs::write(&config, "category_filter_regexp = \"\"\n").unwrap();
    let mixed = write_log(&dir, "mixed.log", MIXED_LOG);
    let sample = write_log(&dir, "sample.log", SAMPLE_LOG);

    let mut ws = Workspace::new(SettingsHub::load(&config).unwrap());
    ws.open_log(&mixed).unwrap();
    ws.open_log(&sample).unwrap();
    assert_eq!(ws.sessions().len(), 2);

    fs::write(&config, "category_filter_regexp = \"clazy\"\n").unwrap();
    let events = ws.settings_mut().reload_from_disk().unwrap();
    assert_eq!(events.len(), 1);
    for event in &events {
        ws.apply_settings_event(event).unwrap();
    }

    // The sample log has no clazy warnings left and drops out
    assert_eq!(ws.sessions().len(), 1);
    assert_eq!(ws.current().unwrap().path(), mixed.as_path());

    // Widening the pattern brings it back
    assert!(ws.set_category_filter_regexp("").unwrap());
    assert_eq!(ws.sessions().len(), 2);
}

#[test]
fn test_invalid_pattern_leaves_workspace_untouched() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "sample.log", SAMPLE_LOG);
    let mut ws = create_test_workspace();
    ws.open_log(&log).unwrap();

    assert!(ws.set_category_filter_regexp("[").is_err());
    assert_eq!(ws.settings().settings().category_filter_regexp, "");
    assert_eq!(ws.current().unwrap().engine().available_categories().len(), 2);
}

#[test]
fn test_emptied_log_is_hidden_on_reload() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "sample.log", SAMPLE_LOG);
    let mut ws = create_test_workspace();
    ws.open_log(&log).unwrap();

    fs::write(&log, "Build succeeded\n").unwrap();
    assert_eq!(
        ws.reload_log(&log).unwrap(),
        OpenOutcome::Hidden(HiddenReason::NoWarnings)
    );
    assert!(ws.sessions().is_empty());

    // Still requested, so a later reload shows it again
    fs::write(&log, SAMPLE_LOG).unwrap();
    ws.reload_all();
    assert_eq!(ws.sessions().len(), 1);
}

#[test]
fn test_editor_command_uses_configured_template() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "sample.log", SAMPLE_LOG);
    let mut ws = create_test_workspace();
    ws.open_log(&log).unwrap();

    // Default selection shows the -Wreturn-type warning at line 20
    assert_eq!(ws.editor_command(0).unwrap(), "vim +20 /a/b.c");
}

#[test]
fn test_editor_command_requires_template() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "sample.log", SAMPLE_LOG);
    let mut ws = Workspace::new(SettingsHub::new(Settings::default()));
    ws.open_log(&log).unwrap();

    assert!(matches!(
        ws.editor_command(0),
        Err(WarnError::EditorNotConfigured)
    ));
}

#[test]
fn test_editor_command_refuses_relative_paths() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "rel.log", "src/a.c:3:1: warning: shadowed [-Wshadow]\n");
    let mut ws = create_test_workspace();
    ws.open_log(&log).unwrap();

    assert!(matches!(
        ws.editor_command(0),
        Err(WarnError::RelativePath(0))
    ));
}
