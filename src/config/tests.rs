//! Unit tests for configuration module
//!
//! Tests configuration parsing, validation, serialization/deserialization,
//! and edge cases in configuration handling.

use super::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_configuration_is_valid() -> Result<()> {
    let config = TesseraConfig::default();
    config.validate()?;

    assert_eq!(config.frames.decoration_thickness, 24);
    assert_eq!(config.frames.decoration_edge, DecorationEdge::Top);
    assert!(config.frames.focus_new_windows);
    assert_eq!(config.screen.rect(), Rect::new(0, 0, 1920, 1080));
    assert!(!config.general.debug);
    Ok(())
}

#[test]
fn test_configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("test_config.toml");

    let test_config = r#"
[frames]
decoration_thickness = 30
decoration_edge = "bottom"
focus_new_windows = false
follow_moved_window = true

[screen]
width = 2560
height = 1440

[general]
debug = true
"#;

    fs::write(&file_path, test_config)?;

    let config = TesseraConfig::load(&file_path)?;

    assert_eq!(config.frames.decoration_thickness, 30);
    assert_eq!(config.frames.decoration_edge, DecorationEdge::Bottom);
    assert!(!config.frames.focus_new_windows);
    assert_eq!(config.screen.rect(), Rect::new(0, 0, 2560, 1440));
    assert!(config.general.debug);

    let style = config.frames.decoration();
    assert_eq!(style.thickness, 30);
    assert_eq!(style.edge, DecorationEdge::Bottom);
    Ok(())
}

#[test]
fn test_partial_configuration_uses_defaults() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("partial_config.toml");

    fs::write(&file_path, "[frames]\ndecoration_thickness = 12\n")?;

    let config = TesseraConfig::load(&file_path)?;
    assert_eq!(config.frames.decoration_thickness, 12);
    assert!(config.frames.follow_moved_window);
    assert_eq!(config.screen, ScreenConfig::default());
    Ok(())
}

#[test]
fn test_malformed_toml_handling() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("malformed_config.toml");

    let malformed_config = r#"
[frames
decoration_thickness = "not a number"
"#;

    fs::write(&file_path, malformed_config).unwrap();

    let result = TesseraConfig::load(&file_path);
    assert!(result.is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let result = TesseraConfig::load(dir.path().join("nope.toml"));
    assert!(result.is_err());
}

#[test]
fn test_validation_rejects_oversized_decoration() {
    let mut config = TesseraConfig::default();
    config.frames.decoration_thickness = 1080;
    assert!(config.validate().is_err());

    let mut config = TesseraConfig::default();
    config.screen.width = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_save_and_reload() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("saved.toml");

    let mut config = TesseraConfig::default();
    config.frames.decoration_thickness = 18;
    config.general.debug = true;
    config.save(&file_path)?;

    let loaded = TesseraConfig::load(&file_path)?;
    assert_eq!(loaded, config);
    Ok(())
}

#[test]
fn test_merge_partial_overrides_changed_sections() {
    let base = TesseraConfig::default();
    let mut partial = TesseraConfig::default();
    partial.screen.width = 1280;
    partial.screen.height = 720;

    let merged = base.merge_partial(partial);
    assert_eq!(merged.screen.rect(), Rect::new(0, 0, 1280, 720));
    assert_eq!(merged.frames, FrameConfig::default());
}
