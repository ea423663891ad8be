// src/transform/scripts.rs

use anyhow::anyhow;

use crate::errors::TransformError;
use crate::fileset::{FileEntry, FileSet};

use super::{Transform, TransformContext};

/// Minify JavaScript with `minifier`.
#[derive(Debug, Clone, Default)]
pub struct JsMinify;

impl Transform for JsMinify {
    fn name(&self) -> &str {
        "js-minify"
    }

    fn apply(&self, _ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        input
            .into_iter()
            .map(|entry| {
                let source = entry.text().map_err(|e| {
                    TransformError::new(self.name(), anyhow!("{:?}: {e}", entry.relative))
                })?;
                let minified = minifier::js::minify(source).to_string();
                Ok(FileEntry {
                    contents: minified.into_bytes(),
                    ..entry
                })
            })
            .collect()
    }
}
