// tests/newer_filter.rs

use std::path::Path;

use assetflow::fileset::{GlobSpec, NewerThan};
use assetflow::fs::mock::MockFileSystem;

fn selected(fs: &MockFileSystem, newer: &NewerThan) -> Vec<String> {
    let set = GlobSpec::new(["app/images/src/*.*"])
        .unwrap()
        .collect(fs, Path::new("."))
        .unwrap();
    newer
        .filter(fs, Path::new("."), set)
        .unwrap()
        .iter()
        .map(|e| e.relative.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn unchanged_sources_are_skipped_and_new_ones_kept() {
    let fs = MockFileSystem::new();
    fs.add_file("app/images/src/cat.png", "cat");
    fs.add_file("app/images/src/dog.png", "dog");
    // Outputs written after the sources (the mock clock only moves forward).
    fs.add_file("app/images/cat.avif", "cat avif");

    let newer = NewerThan::new("app/images").with_extension("avif");
    assert_eq!(selected(&fs, &newer), vec!["dog.png"]);

    // A new source is picked up.
    fs.add_file("app/images/src/owl.jpg", "owl");
    assert_eq!(selected(&fs, &newer), vec!["dog.png", "owl.jpg"]);

    // Touching a source makes it newer than its output again.
    fs.add_file("app/images/src/cat.png", "cat v2");
    assert_eq!(selected(&fs, &newer), vec!["cat.png", "dog.png", "owl.jpg"]);
}

#[test]
fn same_extension_comparison_uses_the_mirrored_path() {
    let fs = MockFileSystem::new();
    fs.add_file("app/images/src/logo.png", "src");
    fs.add_file("app/images/logo.png", "optimised");

    let newer = NewerThan::new("app/images");
    assert!(selected(&fs, &newer).is_empty());
}
