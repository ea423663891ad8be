// src/pipeline/mod.rs

//! Ordered `source -> filter -> transform -> write` stages.
//!
//! The output set of stage *i* is the input set of stage *i+1*. A
//! [`Stage::Source`] abandons the current set and re-globs from disk, which
//! lets one pipeline run several independent conversions over the same
//! original sources (the image pipeline does this three times).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{AssetflowError, Result};
use crate::fileset::{join_root, FileSet, GlobSpec, NewerThan};
use crate::fs::FileSystem;
use crate::notifier::Notifier;
use crate::transform::{Transform, TransformContext};

/// One pipeline step.
#[derive(Clone)]
pub enum Stage {
    /// Replace the current set with a fresh glob over the source tree.
    Source(GlobSpec),
    /// Drop files whose destination counterpart is up to date.
    Newer(NewerThan),
    Transform(Arc<dyn Transform>),
    /// Write the current set below a root-relative directory. The set is
    /// passed on unchanged.
    Dest(PathBuf),
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Source(spec) => f.debug_tuple("Source").field(&spec.patterns()).finish(),
            Stage::Newer(newer) => f.debug_tuple("Newer").field(newer).finish(),
            Stage::Transform(t) => f.debug_tuple("Transform").field(&t.name()).finish(),
            Stage::Dest(dir) => f.debug_tuple("Dest").field(dir).finish(),
        }
    }
}

impl Stage {
    fn label(&self) -> String {
        match self {
            Stage::Source(_) => "source".to_string(),
            Stage::Newer(_) => "newer".to_string(),
            Stage::Transform(t) => t.name().to_string(),
            Stage::Dest(_) => "dest".to_string(),
        }
    }
}

/// What a pipeline needs from its surroundings.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub notifier: Arc<dyn Notifier>,
}

impl PipelineContext {
    fn transform_context(&self) -> TransformContext {
        TransformContext {
            fs: Arc::clone(&self.fs),
            root: self.root.clone(),
        }
    }
}

/// Paths written by one pipeline run, in write order.
pub type WrittenPaths = Vec<PathBuf>;

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, spec: GlobSpec) -> Self {
        self.stages.push(Stage::Source(spec));
        self
    }

    pub fn newer(mut self, newer: NewerThan) -> Self {
        self.stages.push(Stage::Newer(newer));
        self
    }

    pub fn transform(mut self, transform: impl Transform + 'static) -> Self {
        self.stages.push(Stage::Transform(Arc::new(transform)));
        self
    }

    pub fn dest(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stages.push(Stage::Dest(dir.into()));
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order. The first failure aborts the run.
    ///
    /// When anything was written, the notifier is told afterwards.
    pub async fn run(&self, ctx: &PipelineContext) -> Result<WrittenPaths> {
        let mut current = FileSet::empty();
        let mut written = Vec::new();

        for (idx, stage) in self.stages.iter().enumerate() {
            debug!(stage = idx, kind = %stage.label(), input = current.len(), "running stage");
            current = match stage {
                Stage::Source(spec) => {
                    let spec = spec.clone();
                    let (fs, root) = (Arc::clone(&ctx.fs), ctx.root.clone());
                    blocking(move || spec.collect(fs.as_ref(), &root)).await?
                }
                Stage::Newer(newer) => {
                    let newer = newer.clone();
                    let (fs, root) = (Arc::clone(&ctx.fs), ctx.root.clone());
                    blocking(move || newer.filter(fs.as_ref(), &root, current)).await?
                }
                Stage::Transform(transform) => {
                    let transform = Arc::clone(transform);
                    let tctx = ctx.transform_context();
                    blocking(move || transform.apply(&tctx, current).map_err(AssetflowError::from))
                        .await?
                }
                Stage::Dest(dir) => {
                    let target = join_root(&ctx.root, dir);
                    let fs = Arc::clone(&ctx.fs);
                    let (paths, set) = blocking(move || {
                        let paths = current.write_to(fs.as_ref(), &target)?;
                        Ok((paths, current))
                    })
                    .await?;
                    written.extend(paths);
                    set
                }
            };
        }

        if !written.is_empty() {
            info!(written = written.len(), "pipeline wrote files");
            ctx.notifier.reload(&written);
        }
        Ok(written)
    }
}

/// Run CPU- or IO-bound stage work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AssetflowError::Other(anyhow::anyhow!("pipeline stage panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::errors::TransformError;
    use crate::fileset::FileEntry;
    use crate::fs::mock::MockFileSystem;

    #[derive(Debug, Default)]
    struct Recording(Mutex<Vec<PathBuf>>);

    impl Notifier for Recording {
        fn reload(&self, changed: &[PathBuf]) {
            self.0.lock().unwrap().extend_from_slice(changed);
        }
    }

    #[derive(Debug)]
    struct Upper;

    impl Transform for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn apply(&self, _ctx: &TransformContext, input: FileSet) -> std::result::Result<FileSet, TransformError> {
            Ok(input
                .into_iter()
                .map(|e| FileEntry {
                    contents: e.contents.to_ascii_uppercase(),
                    ..e
                })
                .collect())
        }
    }

    #[derive(Debug)]
    struct Reject;

    impl Transform for Reject {
        fn name(&self) -> &str {
            "reject"
        }

        fn apply(&self, _ctx: &TransformContext, _input: FileSet) -> std::result::Result<FileSet, TransformError> {
            Err(TransformError::new("reject", anyhow::anyhow!("malformed input")))
        }
    }

    fn ctx(fs: &MockFileSystem, notifier: Arc<dyn Notifier>) -> PipelineContext {
        PipelineContext {
            root: PathBuf::from("."),
            fs: Arc::new(fs.clone()),
            notifier,
        }
    }

    #[tokio::test]
    async fn stages_run_in_order_and_notify_once() {
        let fs = MockFileSystem::new();
        fs.add_file("src/a.txt", "a");
        let notifier = Arc::new(Recording::default());

        let pipeline = Pipeline::new()
            .source(GlobSpec::new(["src/*.txt"]).unwrap())
            .transform(Upper)
            .dest("out");
        let written = pipeline.run(&ctx(&fs, notifier.clone())).await.unwrap();

        assert_eq!(written, vec![PathBuf::from("out/a.txt")]);
        assert_eq!(fs.read(Path::new("out/a.txt")).unwrap(), b"A".to_vec());
        assert_eq!(*notifier.0.lock().unwrap(), written);
    }

    #[tokio::test]
    async fn source_abandons_the_previous_set() {
        let fs = MockFileSystem::new();
        fs.add_file("src/a.txt", "a");
        fs.add_file("src/b.md", "b");

        let pipeline = Pipeline::new()
            .source(GlobSpec::new(["src/*.txt"]).unwrap())
            .transform(Upper)
            .dest("upper")
            .source(GlobSpec::new(["src/*.md"]).unwrap())
            .dest("plain");
        let written = pipeline
            .run(&ctx(&fs, Arc::new(crate::notifier::NoopNotifier)))
            .await
            .unwrap();

        assert_eq!(
            written,
            vec![PathBuf::from("upper/a.txt"), PathBuf::from("plain/b.md")]
        );
        assert_eq!(fs.read(Path::new("plain/b.md")).unwrap(), b"b".to_vec());
    }

    #[tokio::test]
    async fn failing_stage_aborts_before_writing_or_notifying() {
        let fs = MockFileSystem::new();
        fs.add_file("src/a.txt", "a");
        let notifier = Arc::new(Recording::default());

        let pipeline = Pipeline::new()
            .source(GlobSpec::new(["src/*.txt"]).unwrap())
            .transform(Reject)
            .dest("out");
        let err = pipeline.run(&ctx(&fs, notifier.clone())).await.unwrap_err();

        match err {
            AssetflowError::Transform(t) => assert_eq!(t.stage, "reject"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!fs.exists(Path::new("out")));
        assert!(notifier.0.lock().unwrap().is_empty());
    }
}
