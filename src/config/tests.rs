//! Configuration tests

use super::*;
use std::collections::HashMap;

/// Environment lookup backed by a map instead of the process environment
fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

/// Verify that serialized config can be parsed back.
#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );

    let resolved = Config::resolve(parsed.unwrap(), &Overrides::default(), env_from(&[]))
        .expect("default config should resolve");
    assert_eq!(resolved.bind_addr, config.bind_addr);
    assert_eq!(resolved.canvas_width, config.canvas_width);
    assert_eq!(resolved.display, config.display);
    assert_eq!(resolved.logging.file_rotation, LogRotation::Daily);
}

/// Non-default values must survive serialization
#[test]
fn test_config_roundtrip_custom_values() {
    let mut config = Config::default();
    config.canvas_width = 40;
    config.canvas_height = 12;
    config.display = DisplayMode::Headless;
    config.logging.file_enabled = true;
    config.logging.file_rotation = LogRotation::Hourly;

    let file: FileConfig = toml::from_str(&config.to_toml()).unwrap();
    let resolved = Config::resolve(file, &Overrides::default(), env_from(&[])).unwrap();

    assert_eq!(resolved.canvas_width, 40);
    assert_eq!(resolved.canvas_height, 12);
    assert_eq!(resolved.display, DisplayMode::Headless);
    assert!(resolved.logging.file_enabled);
    assert_eq!(resolved.logging.file_rotation, LogRotation::Hourly);
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_precedence_flags_env_file() {
    let file: FileConfig = toml::from_str(
        r#"
        bind_addr = "127.0.0.1:9000"
        [canvas]
        width = 30
        height = 30
        "#,
    )
    .unwrap();

    let overrides = Overrides {
        width: Some(10),
        ..Default::default()
    };
    let env = env_from(&[("HATDRAW_WIDTH", "20"), ("HATDRAW_HEIGHT", "16")]);

    let config = Config::resolve(file, &overrides, env).unwrap();
    assert_eq!(config.canvas_width, 10, "flag beats env and file");
    assert_eq!(config.canvas_height, 16, "env beats file");
    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
}

#[test]
fn test_display_from_env() {
    let config = Config::resolve(
        FileConfig::default(),
        &Overrides::default(),
        env_from(&[("HATDRAW_DISPLAY", "Headless")]),
    )
    .unwrap();
    assert_eq!(config.display, DisplayMode::Headless);

    let err = Config::resolve(
        FileConfig::default(),
        &Overrides::default(),
        env_from(&[("HATDRAW_DISPLAY", "hologram")]),
    );
    assert!(err.is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Canvas size validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_small_canvas_is_raised_to_minimum() {
    let overrides = Overrides {
        width: Some(3),
        height: Some(0),
        ..Default::default()
    };
    let config = Config::resolve(FileConfig::default(), &overrides, env_from(&[])).unwrap();
    assert_eq!(config.canvas_width, 8);
    assert_eq!(config.canvas_height, 8);
}

#[test]
fn test_large_canvas_is_rejected() {
    let overrides = Overrides {
        height: Some(41),
        ..Default::default()
    };
    let err = Config::resolve(FileConfig::default(), &overrides, env_from(&[])).unwrap_err();
    assert!(err.to_string().contains("maximum height"));

    let config = Config::resolve(
        FileConfig::default(),
        &Overrides {
            width: Some(40),
            ..Default::default()
        },
        env_from(&[]),
    )
    .unwrap();
    assert_eq!(config.canvas_width, 40);
}

#[test]
fn test_bad_values_are_errors() {
    let err = Config::resolve(
        FileConfig::default(),
        &Overrides::default(),
        env_from(&[("HATDRAW_WIDTH", "wide")]),
    );
    assert!(err.is_err());

    let err = Config::resolve(
        FileConfig::default(),
        &Overrides {
            bind: Some("not-an-address".to_string()),
            ..Default::default()
        },
        env_from(&[]),
    );
    assert!(err.is_err());
}

#[test]
fn test_subscriber_buffer_has_floor() {
    let file: FileConfig = toml::from_str("subscriber_buffer = 0").unwrap();
    let config = Config::resolve(file, &Overrides::default(), env_from(&[])).unwrap();
    assert_eq!(config.subscriber_buffer, 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging section
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_partial_logging_section_uses_defaults() {
    let file: FileConfig = toml::from_str(
        r#"
        [logging]
        file_enabled = true
        file_rotation = "never"
        "#,
    )
    .unwrap();
    let config = Config::resolve(file, &Overrides::default(), env_from(&[])).unwrap();

    assert!(config.logging.file_enabled);
    assert_eq!(config.logging.file_rotation, LogRotation::Never);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_prefix, "hatdraw");
    assert_eq!(config.logging.file_dir, PathBuf::from("./logs/trace"));
}

#[test]
fn test_unknown_rotation_is_rejected() {
    for bad in ["weekly", "Daily", ""] {
        let toml_str = format!("[logging]\nfile_rotation = \"{}\"\n", bad);
        let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
        assert!(parsed.is_err(), "rotation {:?} should not parse", bad);
    }
}

#[test]
fn test_unknown_logging_key_is_rejected() {
    let parsed: Result<FileConfig, _> = toml::from_str("[logging]\nfile_rotaton = \"hourly\"\n");
    assert!(parsed.is_err());
}

#[test]
fn test_log_level_is_validated() {
    let file: FileConfig = toml::from_str("[logging]\nlevel = \"DEBUG\"\n").unwrap();
    let config = Config::resolve(file, &Overrides::default(), env_from(&[])).unwrap();
    assert_eq!(config.logging.level, "debug");

    let file: FileConfig = toml::from_str("[logging]\nlevel = \"loud\"\n").unwrap();
    let err = Config::resolve(file, &Overrides::default(), env_from(&[])).unwrap_err();
    assert!(err.to_string().contains("Unknown log level"));
}

#[test]
fn test_rotation_maps_to_appender() {
    use tracing_appender::rolling::Rotation;

    assert_eq!(Rotation::from(LogRotation::Hourly), Rotation::HOURLY);
    assert_eq!(Rotation::from(LogRotation::Daily), Rotation::DAILY);
    assert_eq!(Rotation::from(LogRotation::Never), Rotation::NEVER);
    assert_eq!(LogRotation::Hourly.to_string(), "hourly");
}
