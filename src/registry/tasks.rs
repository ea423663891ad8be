// src/registry/tasks.rs

//! Per-kind task settings and the pipelines they expand to.
//!
//! All paths are relative to the project root.

use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::Result;
use crate::fileset::{GlobSpec, NewerThan};
use crate::pipeline::Pipeline;
use crate::transform::{
    AvifEncode, Concat, CssFinish, FontConvert, Include, JsMinify, Optimize, ScssCompile,
    SvgSprite, WebpEncode,
};

/// Markup pages with include directives expanded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PagesTask {
    pub src: Vec<String>,
    /// Directories searched for included fragments.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    pub dest: PathBuf,
}

impl PagesTask {
    pub fn pipeline(&self) -> Result<Pipeline> {
        Ok(Pipeline::new()
            .source(GlobSpec::new(&self.src)?)
            .transform(Include::new(self.include_paths.clone()))
            .dest(&self.dest))
    }
}

/// SCSS sources compiled, joined into one stylesheet, prefixed and
/// minified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StylesTask {
    pub src: Vec<String>,
    pub dest: PathBuf,
    pub output: String,
    /// Browserslist queries for vendor prefixing.
    #[serde(default)]
    pub browsers: Vec<String>,
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
}

impl StylesTask {
    pub fn pipeline(&self) -> Result<Pipeline> {
        Ok(Pipeline::new()
            .source(GlobSpec::new(&self.src)?)
            .transform(ScssCompile::new(self.load_paths.clone()))
            .transform(Concat::new(&self.output))
            .transform(CssFinish::new(self.browsers.clone()))
            .dest(&self.dest))
    }
}

/// Scripts joined into one bundle and minified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptsTask {
    pub src: Vec<String>,
    pub dest: PathBuf,
    pub output: String,
}

impl ScriptsTask {
    pub fn pipeline(&self) -> Result<Pipeline> {
        Ok(Pipeline::new()
            .source(GlobSpec::new(&self.src)?)
            .transform(Concat::new(&self.output))
            .transform(JsMinify)
            .dest(&self.dest))
    }
}

fn default_avif_quality() -> u8 {
    50
}

/// Three independent conversions over the same sources: AVIF, WebP and an
/// optimised copy. Each skips sources whose output is already newer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImagesTask {
    pub src: Vec<String>,
    pub dest: PathBuf,
    #[serde(default = "default_avif_quality")]
    pub avif_quality: u8,
}

impl ImagesTask {
    pub fn pipeline(&self) -> Result<Pipeline> {
        // Vector icons only go through the optimiser (as a pass-through).
        let mut rasters = self.src.clone();
        rasters.push("!**/*.svg".to_string());

        Ok(Pipeline::new()
            .source(GlobSpec::new(&rasters)?)
            .newer(NewerThan::new(&self.dest).with_extension("avif"))
            .transform(AvifEncode::new(self.avif_quality))
            .dest(&self.dest)
            .source(GlobSpec::new(&rasters)?)
            .newer(NewerThan::new(&self.dest).with_extension("webp"))
            .transform(WebpEncode)
            .dest(&self.dest)
            .source(GlobSpec::new(&self.src)?)
            .newer(NewerThan::new(&self.dest))
            .transform(Optimize::default())
            .dest(&self.dest))
    }
}

/// WOFF + TTF, then WOFF2 from the TTFs on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FontsTask {
    pub src: Vec<String>,
    pub dest: PathBuf,
}

impl FontsTask {
    pub fn pipeline(&self) -> Result<Pipeline> {
        Ok(Pipeline::new()
            .source(GlobSpec::new(&self.src)?)
            .transform(FontConvert::new(&self.dest))
            .dest(&self.dest))
    }
}

fn default_sprite_name() -> PathBuf {
    PathBuf::from("sprite.svg")
}

fn default_true() -> bool {
    true
}

/// SVG icons packed into one stack sprite.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpriteTask {
    pub src: Vec<String>,
    pub dest: PathBuf,
    /// Sprite file name inside `dest`.
    #[serde(default = "default_sprite_name")]
    pub sprite: PathBuf,
    /// Also write `stack/sprite.stack.html`.
    #[serde(default = "default_true")]
    pub example: bool,
}

impl SpriteTask {
    pub fn pipeline(&self) -> Result<Pipeline> {
        Ok(Pipeline::new()
            .source(GlobSpec::new(&self.src)?)
            .transform(SvgSprite::new(&self.sprite, self.example))
            .dest(&self.dest))
    }
}

/// Delete a directory tree if it exists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CleanTask {
    pub dir: PathBuf,
}

/// Copy the distributable artifacts into `dest`, keeping paths relative to
/// `base`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CopyTask {
    pub base: PathBuf,
    pub artifacts: Vec<String>,
    pub dest: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Static dev server with live reload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServeTask {
    pub root: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}
