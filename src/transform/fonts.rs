// src/transform/fonts.rs

//! Font conversion with an explicit two-step disk handoff.
//!
//! Step 1 turns every source font into `.woff` plus an SFNT copy (`.ttf` for
//! TrueType outlines, `.otf` for CFF) and writes both into the destination
//! directory. Step 2 runs only after those writes: it re-reads
//! `<dest>/*.{ttf,otf}` from disk (including files left there by earlier
//! runs) and produces `.woff2`.
//!
//! The adapter returns the step 2 output; the owning pipeline writes it.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use tracing::debug;

use crate::errors::TransformError;
use crate::fileset::{join_root, FileEntry, FileSet, GlobSpec};

use super::woff::{encode_woff, encode_woff2, Sfnt};
use super::{Transform, TransformContext};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

#[derive(Debug, Clone)]
pub struct FontConvert {
    /// Root-relative directory for both steps.
    dest: PathBuf,
}

impl FontConvert {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }

    /// Step 1: write WOFF and SFNT files next to each other in `dest`.
    fn write_intermediates(&self, ctx: &TransformContext, input: FileSet) -> anyhow::Result<Vec<PathBuf>> {
        let dest = join_root(&ctx.root, &self.dest);
        let mut written = Vec::new();

        for entry in input {
            let ext = entry.extension().unwrap_or_default();
            if !FONT_EXTENSIONS.contains(&ext.as_str()) {
                return Err(anyhow!(
                    "unsupported font {:?} (expected one of {:?})",
                    entry.relative,
                    FONT_EXTENSIONS
                ));
            }

            let font = Sfnt::parse(&entry.contents)
                .with_context(|| format!("parsing {:?}", entry.relative))?;

            let woff = encode_woff(&font).with_context(|| format!("encoding {:?} as WOFF", entry.relative))?;
            let target = dest.join(file_name(&entry, "woff"));
            ctx.fs.write(&target, &woff)?;
            written.push(target);

            let sfnt_ext = if font.is_truetype() { "ttf" } else { "otf" };
            let target = dest.join(file_name(&entry, sfnt_ext));
            if entry.origin.as_deref() != Some(target.as_path()) {
                ctx.fs.write(&target, &entry.contents)?;
                written.push(target);
            }
        }

        Ok(written)
    }

    /// Step 2: re-read `<dest>/*.{ttf,otf}` from disk and produce WOFF2.
    fn convert_sfnts(&self, ctx: &TransformContext) -> anyhow::Result<FileSet> {
        let pattern = format!("{}/*.{{ttf,otf}}", self.dest.to_string_lossy().trim_end_matches('/'));
        let sfnts = GlobSpec::new([pattern])?.collect(ctx.fs.as_ref(), &ctx.root)?;

        sfnts.into_iter()
            .map(|entry| {
                let font = Sfnt::parse(&entry.contents)
                    .with_context(|| format!("parsing {:?}", entry.relative))?;
                let woff2 = encode_woff2(&font)
                    .with_context(|| format!("encoding {:?} as WOFF2", entry.relative))?;
                Ok(FileEntry {
                    relative: entry.relative_with_extension("woff2"),
                    origin: entry.origin,
                    contents: woff2,
                })
            })
            .collect()
    }
}

fn file_name(entry: &FileEntry, ext: &str) -> PathBuf {
    Path::new(&entry.file_stem()).with_extension(ext)
}

impl Transform for FontConvert {
    fn name(&self) -> &str {
        "fonts"
    }

    fn apply(&self, ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        let written = self
            .write_intermediates(ctx, input)
            .map_err(|e| TransformError::new(self.name(), e))?;
        debug!(count = written.len(), dest = ?self.dest, "wrote intermediate fonts");

        self.convert_sfnts(ctx)
            .map_err(|e| TransformError::new(self.name(), e))
    }
}
