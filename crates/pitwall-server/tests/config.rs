use std::io::Write;
use std::time::Duration;

use clap::Parser;
use pitwall_bridge::WritePolicy;
use pitwall_server::config::{Args, EngineKind, Settings};

fn config_file(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(yaml.as_bytes()).expect("write config");
    file
}

const YAML: &str = r#"
bind: 0.0.0.0:9000
prefix: /calc
log_level: debug
write_policy: strict
workbook: sheets/race.xlsx
engine:
  kind: memory
  command: /opt/engine/bin/engine
  args: ["--profile", "race"]
  address: 127.0.0.1:7900
  startup_timeout_ms: 2500
  call_timeout_ms: 800
"#;

#[test]
fn file_values_override_defaults() {
    let file = config_file(YAML);
    let args = Args::parse_from(["pitwall", "--config", file.path().to_str().expect("utf-8")]);
    let settings = Settings::from_args(&args).expect("settings");

    assert_eq!(settings.bind.port(), 9000);
    assert_eq!(settings.prefix, "/calc");
    assert_eq!(settings.log_level, "debug");
    assert_eq!(settings.write_policy, WritePolicy::Strict);
    assert_eq!(settings.workbook.to_str(), Some("sheets/race.xlsx"));
    assert_eq!(settings.engine.kind, EngineKind::Memory);
    assert_eq!(settings.engine.args, vec!["--profile", "race"]);
    assert_eq!(settings.engine.address.port(), 7900);
    assert_eq!(settings.engine.startup_timeout, Duration::from_millis(2500));
    assert_eq!(settings.engine.call_timeout, Some(Duration::from_millis(800)));
}

#[test]
fn flags_override_the_file() {
    let file = config_file(YAML);
    let args = Args::parse_from([
        "pitwall",
        "--config",
        file.path().to_str().expect("utf-8"),
        "--bind",
        "127.0.0.1:8100",
        "--engine",
        "process",
        "--engine-address",
        "127.0.0.1:7000",
        "--write-policy",
        "permissive",
        "--log-level",
        "warn",
        "--workbook",
        "other.xlsx",
    ]);
    let settings = Settings::from_args(&args).expect("settings");

    assert_eq!(settings.bind.port(), 8100);
    assert_eq!(settings.engine.kind, EngineKind::Process);
    assert_eq!(settings.engine.address.port(), 7000);
    assert_eq!(settings.write_policy, WritePolicy::Permissive);
    assert_eq!(settings.log_level, "warn");
    assert_eq!(settings.workbook.to_str(), Some("other.xlsx"));
    // Values without a flag still come from the file.
    assert_eq!(settings.prefix, "/calc");
    assert_eq!(
        settings.engine.command.as_deref().and_then(|p| p.to_str()),
        Some("/opt/engine/bin/engine")
    );
}

#[test]
fn missing_or_invalid_files_are_errors() {
    let args = Args::parse_from(["pitwall", "--config", "/nonexistent/pitwall.yaml"]);
    let err = Settings::from_args(&args).expect_err("missing file");
    assert!(err.to_string().contains("Failed to read config file"), "{err:#}");

    let file = config_file("engine:\n  kind: excel\n");
    let args = Args::parse_from(["pitwall", "--config", file.path().to_str().expect("utf-8")]);
    let err = Settings::from_args(&args).expect_err("unknown engine kind");
    assert!(err.to_string().contains("Failed to parse config file"), "{err:#}");
}

#[test]
fn bad_write_policy_flag_is_rejected() {
    assert!(Args::try_parse_from(["pitwall", "--write-policy", "lenient"]).is_err());
    let args = Args::try_parse_from(["pitwall", "--write-policy", "STRICT", "--check-schema"])
        .expect("parse");
    assert_eq!(args.write_policy, Some(WritePolicy::Strict));
    assert!(args.check_schema);
}

#[test]
fn memory_engine_settings_build_a_working_bridge() {
    let dir = tempfile::tempdir().expect("temp dir");
    let workbook = dir.path().join("calculadora.xlsx");
    let args = Args::parse_from([
        "pitwall",
        "--engine",
        "memory",
        "--workbook",
        workbook.to_str().expect("utf-8"),
    ]);
    let settings = Settings::from_args(&args).expect("settings");
    let bridge = settings.bridge(pitwall_schema::Layout::standard());

    assert_eq!(bridge.status(), "disconnected");
    let state = bridge.read_state().expect("memory engine state");
    assert_eq!(state.car.len(), 11);
    assert_eq!(bridge.status(), "connected");
}
