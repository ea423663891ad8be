// tests/config_loading.rs

use std::io::Write;

use assetflow::config::{load_and_validate, load_or_default};
use assetflow::errors::AssetflowError;
use assetflow::types::TriggerWhileRunningBehaviour;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn valid_config_builds_a_registry() {
    let file = config_file(
        r#"
[config]
triggered_while_running_behaviour = "cancel"
queue_length = 3

[task.styles]
kind = "styles"
src = ["app/scss/style.scss"]
dest = "app/css"
output = "style.min.css"

[task.clean]
kind = "clean"
dir = "dist"

[task.build]
kind = "series"
tasks = ["clean", "styles"]

[[watch]]
paths = ["app/scss/**/*.scss"]
tasks = ["styles"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(
        cfg.config.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Cancel
    );
    assert_eq!(cfg.config.queue_length, 3);
    assert!(cfg.registry.contains("build"));
    assert_eq!(cfg.registry.watch_rules().len(), 1);
}

#[test]
fn composition_cycle_is_rejected() {
    let file = config_file(
        r#"
[task.a]
kind = "series"
tasks = ["b"]

[task.b]
kind = "parallel"
tasks = ["a"]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, AssetflowError::CompositionCycle(_)), "{err}");
}

#[test]
fn unknown_member_is_rejected() {
    let file = config_file(
        r#"
[task.build]
kind = "series"
tasks = ["missing"]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)), "{err}");
    assert!(err.to_string().contains("missing"), "{err}");
}

#[test]
fn unknown_task_kind_is_a_parse_error() {
    let file = config_file(
        r#"
[task.x]
kind = "teleport"
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, AssetflowError::TomlError(_)), "{err}");
}

#[test]
fn zero_queue_length_is_rejected() {
    let file = config_file(
        r#"
[config]
queue_length = 0

[task.clean]
kind = "clean"
dir = "dist"
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)), "{err}");
}

#[test]
fn watch_rule_may_not_start_a_server() {
    let file = config_file(
        r#"
[task.serve]
kind = "serve"
root = "app"

[[watch]]
paths = ["app/*.html"]
tasks = ["serve"]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)), "{err}");
}

#[test]
fn explicit_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_or_default(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, AssetflowError::IoError(_)), "{err}");
}
