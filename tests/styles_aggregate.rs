// tests/styles_aggregate.rs

mod common;
use crate::common::{init_tracing, with_timeout, write_tree};

use std::fs;
use std::sync::Arc;

use assetflow::fs::RealFileSystem;
use assetflow::registry::{BuildContext, Runner};
use assetflow_test_utils::builders::{styles, ConfigFileBuilder};
use tempfile::TempDir;

fn runner(dir: &TempDir) -> Arc<Runner> {
    runner_for(dir, &["app/scss/*.scss"])
}

fn runner_for(dir: &TempDir, src: &[&str]) -> Arc<Runner> {
    let cfg = ConfigFileBuilder::new()
        .with_task("styles", styles(src, "app/css", "style.min.css"))
        .build();
    Runner::new(
        cfg.registry,
        BuildContext::new(dir.path(), Arc::new(RealFileSystem)),
    )
}

fn output(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join("app/css/style.min.css")).unwrap()
}

#[tokio::test]
async fn aggregate_reflects_every_current_source() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    write_tree(
        dir.path(),
        &[
            ("app/scss/_vars.scss", "$accent: #ff0000;\n"),
            ("app/scss/alpha.scss", "@use 'vars';\n.alpha { color: vars.$accent; }\n"),
            ("app/scss/beta.scss", ".beta { margin: 0 0 0 0; }\n"),
        ],
    );
    let runner = runner(&dir);

    with_timeout(runner.run("styles")).await.unwrap();
    let css = output(&dir);
    assert!(css.contains(".alpha"), "{css}");
    assert!(css.contains(".beta"), "{css}");
    assert!(!css.contains('\n'), "output is minified: {css}");

    // Editing one source, adding another and deleting a third.
    write_tree(
        dir.path(),
        &[
            ("app/scss/alpha.scss", ".alpha-renamed { color: blue; }\n"),
            ("app/scss/gamma.scss", ".gamma { display: flex; }\n"),
        ],
    );
    fs::remove_file(dir.path().join("app/scss/beta.scss")).unwrap();

    with_timeout(runner.run("styles")).await.unwrap();
    let css = output(&dir);
    assert!(css.contains(".alpha-renamed"), "{css}");
    assert!(css.contains(".gamma"), "{css}");
    assert!(!css.contains(".beta"), "{css}");
}

#[tokio::test]
async fn compile_error_names_the_stage_and_keeps_previous_output() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("app/scss/main.scss", ".ok { color: red; }\n")]);
    let runner = runner(&dir);
    with_timeout(runner.run("styles")).await.unwrap();
    let before = output(&dir);

    write_tree(dir.path(), &[("app/scss/main.scss", ".broken { color: \n")]);
    let err = with_timeout(runner.run("styles")).await.unwrap_err();

    assert!(err.to_string().contains("scss"), "{err}");
    assert_eq!(output(&dir), before);
}

#[tokio::test]
async fn missing_named_source_fails_instead_of_writing_nothing() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let runner = runner_for(&dir, &["app/scss/style.scss"]);

    let err = with_timeout(runner.run("styles")).await.unwrap_err();

    assert!(err.to_string().contains("source file not found"), "{err}");
    assert!(!dir.path().join("app/css/style.min.css").exists());
}

#[tokio::test]
async fn deleting_every_source_empties_the_aggregate() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("app/scss/main.scss", ".stale { color: red; }\n")]);
    let runner = runner(&dir);
    with_timeout(runner.run("styles")).await.unwrap();
    assert!(output(&dir).contains(".stale"));

    fs::remove_file(dir.path().join("app/scss/main.scss")).unwrap();
    with_timeout(runner.run("styles")).await.unwrap();

    assert_eq!(output(&dir).trim(), "");
}
