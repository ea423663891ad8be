// src/transform/mod.rs

//! Transform adapters.
//!
//! Every file transformation (SCSS compilation, minification, image and
//! font conversion, sprite packing, markup includes) sits behind the same
//! [`Transform`] contract: a file set in, a file set out, or a
//! [`TransformError`] naming the adapter. Adapters are synchronous; the
//! pipeline runs them on Tokio's blocking pool.
//!
//! - [`include`]: markup include directives for pages.
//! - [`concat`]: join a set into one named file.
//! - [`styles`]: SCSS compilation and CSS prefix/minify.
//! - [`scripts`]: JavaScript minification.
//! - [`images`]: AVIF/WebP conversion and lossless-ish optimisation.
//! - [`fonts`] + [`woff`]: WOFF/TTF then WOFF2 generation.
//! - [`sprite`]: SVG "stack" sprite packing.

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::TransformError;
use crate::fileset::FileSet;
use crate::fs::FileSystem;

pub mod concat;
pub mod fonts;
pub mod images;
pub mod include;
pub mod scripts;
pub mod sprite;
pub mod styles;
pub mod woff;

pub use concat::Concat;
pub use fonts::FontConvert;
pub use images::{AvifEncode, Optimize, WebpEncode};
pub use include::Include;
pub use scripts::JsMinify;
pub use sprite::SvgSprite;
pub use styles::{CssFinish, ScssCompile};

/// What an adapter may touch besides its input set.
///
/// Most adapters are pure. Adapters with a disk handoff (fonts) and
/// include resolution (pages) read and write through `fs`, with paths
/// resolved against `root`.
#[derive(Debug, Clone)]
pub struct TransformContext {
    pub fs: Arc<dyn FileSystem>,
    pub root: PathBuf,
}

/// One file transformation.
pub trait Transform: Send + Sync + Debug {
    /// Short stage name used in errors and logs.
    fn name(&self) -> &str;

    fn apply(&self, ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError>;
}
