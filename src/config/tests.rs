use std::io::Write;

use super::*;

#[test]
fn defaults_match_the_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.editor, EditorSettings::default());
    assert_eq!(settings.editor.marker_attribute, "data-component-id");
    assert_eq!(settings.editor.id_prefix, "cmp");
    assert_eq!(settings.editor.default_image_width, "100%");
    assert_eq!(settings.editor.float_gap, "1em");
    assert!(settings.editor.trailing_paragraph);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.editor.marker_attribute = Some("data-block".to_string());

    let overrides = Overrides {
        log_level: Some("debug".to_string()),
        marker_attribute: Some("data-quire-id".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.editor.marker_attribute, "data-quire-id");
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = Overrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn marker_attribute_must_be_a_data_attribute() {
    let mut raw = RawSettings::default();
    raw.editor.marker_attribute = Some("id".to_string());

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "editor.marker_attribute",
            ..
        }
    ));
}

#[test]
fn marker_attribute_is_lowercased() {
    let mut raw = RawSettings::default();
    raw.editor.marker_attribute = Some(" Data-Block ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.editor.marker_attribute, "data-block");
}

#[test]
fn rejects_invalid_log_level() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn rejects_css_injection_in_widths() {
    let mut raw = RawSettings::default();
    raw.editor.default_image_width = Some("100%; position: fixed".to_string());

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "editor.default_image_width",
            ..
        }
    ));
}

#[test]
fn rejects_id_prefix_with_separators() {
    let mut raw = RawSettings::default();
    raw.editor.id_prefix = Some("cmp-x".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn explicit_config_file_is_loaded() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        "[editor]\nid_prefix = \"blk\"\ntrailing_paragraph = false\n\n[logging]\nlevel = \"warn\""
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "quire",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "export",
        "post.html",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(settings.editor.id_prefix, "blk");
    assert!(!settings.editor.trailing_paragraph);
    assert_eq!(settings.logging.level, LevelFilter::WARN);
}

#[test]
fn parse_inspect_arguments() {
    let args = CliArgs::parse_from([
        "quire",
        "inspect",
        "--pretty",
        "--marker-attribute",
        "data-block",
        "/tmp/post.html",
    ]);

    match args.command {
        Command::Inspect(inspect) => {
            assert!(inspect.pretty);
            assert_eq!(
                inspect.overrides.marker_attribute.as_deref(),
                Some("data-block")
            );
            assert_eq!(inspect.file, std::path::Path::new("/tmp/post.html"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_export_arguments() {
    let args = CliArgs::parse_from(["quire", "export", "--log-json", "true", "/tmp/post.html"]);

    match args.command {
        Command::Export(export) => {
            assert_eq!(export.overrides.log_json, Some(true));
            assert_eq!(export.file, std::path::Path::new("/tmp/post.html"));
        }
        _ => panic!("wrong command parsed"),
    }
}
