// src/transform/concat.rs

use tracing::warn;

use crate::errors::TransformError;
use crate::fileset::{FileEntry, FileSet};

use super::{Transform, TransformContext};

/// Join every file of the set, in order, into a single file named `output`.
///
/// An empty input still produces `output` (empty), so an aggregate never
/// outlives the sources it was built from.
#[derive(Debug, Clone)]
pub struct Concat {
    output: String,
    separator: String,
}

impl Concat {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            separator: "\n".to_string(),
        }
    }
}

impl Transform for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn apply(&self, _ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        if input.is_empty() {
            warn!(output = %self.output, "no sources selected; writing an empty aggregate");
        }

        let mut joined = Vec::new();
        for (idx, entry) in input.iter().enumerate() {
            if idx > 0 {
                joined.extend_from_slice(self.separator.as_bytes());
            }
            joined.extend_from_slice(&entry.contents);
        }

        Ok(FileSet::new(vec![FileEntry::new(&self.output, joined)]))
    }
}
