// tests/composition_order.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetflow::fs::mock::MockFileSystem;
use assetflow::registry::{BuildContext, Runner};
use assetflow_test_utils::builders::{clean, copy, parallel, series, ConfigFileBuilder};
use proptest::prelude::*;

/// One member of a generated series: copy `src/<n>.txt` into `out`, or wipe
/// `out`.
#[derive(Debug, Clone)]
enum Step {
    Copy(usize),
    Clean,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0..6usize).prop_map(Step::Copy),
        1 => Just(Step::Clean),
    ]
}

fn fs_with_sources() -> MockFileSystem {
    let fs = MockFileSystem::new();
    for n in 0..6 {
        fs.add_file(format!("src/{n}.txt"), format!("file {n}"));
    }
    fs
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Running the steps as a series leaves exactly what running them one
    /// after another would: the copies made after the last clean.
    #[test]
    fn series_matches_sequential_execution(steps in proptest::collection::vec(step_strategy(), 1..8)) {
        let mut builder = ConfigFileBuilder::new()
            .with_task("wipe", clean("out"));
        let mut members = Vec::new();
        for step in &steps {
            match step {
                Step::Copy(n) => {
                    let name = format!("copy{n}");
                    builder = builder.with_task(&name, copy("src", &[format!("src/{n}.txt").as_str()], "out"));
                    members.push(name);
                }
                Step::Clean => members.push("wipe".to_string()),
            }
        }
        let member_refs: Vec<&str> = members.iter().map(String::as_str).collect();
        let cfg = builder.with_task("all", series(&member_refs)).build();

        let mut expected = BTreeSet::new();
        for step in &steps {
            match step {
                Step::Copy(n) => { expected.insert(PathBuf::from(format!("out/{n}.txt"))); }
                Step::Clean => expected.clear(),
            }
        }

        let fs = fs_with_sources();
        let runner = Runner::new(cfg.registry, BuildContext::new(".", Arc::new(fs.clone())));
        runtime().block_on(runner.run("all")).unwrap();

        let actual: BTreeSet<PathBuf> = fs.files_under("out").into_iter().collect();
        prop_assert_eq!(actual, expected);
    }

    /// A parallel composite only completes once every member has finished.
    #[test]
    fn parallel_completes_after_all_members(picked in proptest::collection::btree_set(0..6usize, 1..6)) {
        let mut builder = ConfigFileBuilder::new();
        let mut members = Vec::new();
        for n in &picked {
            let name = format!("copy{n}");
            builder = builder.with_task(&name, copy("src", &[format!("src/{n}.txt").as_str()], "out"));
            members.push(name);
        }
        let member_refs: Vec<&str> = members.iter().map(String::as_str).collect();
        let cfg = builder.with_task("all", parallel(&member_refs)).build();

        let fs = fs_with_sources();
        let runner = Runner::new(cfg.registry, BuildContext::new(".", Arc::new(fs.clone())));
        runtime().block_on(runner.run("all")).unwrap();

        for n in &picked {
            let path = format!("out/{n}.txt");
            prop_assert!(fs.files_under("out").contains(&PathBuf::from(&path)));
            prop_assert_eq!(
                assetflow::fs::FileSystem::read(&fs, Path::new(&path)).unwrap(),
                format!("file {n}").into_bytes()
            );
        }
    }
}

#[tokio::test]
async fn series_does_not_start_the_next_member_after_a_failure() {
    let fs = fs_with_sources();
    fs.add_file("scss/broken.scss", "a { color: ");
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "styles",
            assetflow_test_utils::builders::styles(&["scss/broken.scss"], "css", "x.css"),
        )
        .with_task("copy0", copy("src", &["src/0.txt"], "out"))
        .with_task("all", series(&["styles", "copy0"]))
        .build();
    let runner = Runner::new(cfg.registry, BuildContext::new(".", Arc::new(fs.clone())));

    assert!(runner.run("all").await.is_err());
    assert!(fs.files_under("out").is_empty());
}
