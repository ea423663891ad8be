// src/transform/images.rs

//! Raster image adapters built on the `image` crate.

use std::io::Cursor;

use anyhow::{anyhow, Context};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::errors::TransformError;
use crate::fileset::{FileEntry, FileSet};

use super::{Transform, TransformContext};

/// Extensions the decoders are built for.
pub const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

fn decode(entry: &FileEntry) -> anyhow::Result<DynamicImage> {
    let ext = entry.extension().unwrap_or_default();
    if !RASTER_EXTENSIONS.contains(&ext.as_str()) {
        return Err(anyhow!(
            "unsupported image format {:?} (expected one of {:?})",
            entry.relative,
            RASTER_EXTENSIONS
        ));
    }
    let format = ImageFormat::from_extension(&ext)
        .ok_or_else(|| anyhow!("unknown image extension {ext}"))?;
    image::load_from_memory_with_format(&entry.contents, format)
        .with_context(|| format!("decoding {:?}", entry.relative))
}

/// Convert each raster to AVIF.
#[derive(Debug, Clone)]
pub struct AvifEncode {
    quality: u8,
    speed: u8,
}

impl AvifEncode {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            speed: 8,
        }
    }

    fn encode(&self, entry: &FileEntry) -> anyhow::Result<Vec<u8>> {
        let img = DynamicImage::ImageRgba8(decode(entry)?.to_rgba8());
        let mut out = Vec::new();
        let encoder = AvifEncoder::new_with_speed_quality(&mut out, self.speed, self.quality);
        img.write_with_encoder(encoder)
            .with_context(|| format!("encoding {:?} as AVIF", entry.relative))?;
        Ok(out)
    }
}

impl Transform for AvifEncode {
    fn name(&self) -> &str {
        "avif"
    }

    fn apply(&self, _ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        input
            .into_iter()
            .map(|entry| {
                let bytes = self
                    .encode(&entry)
                    .map_err(|e| TransformError::new(self.name(), e))?;
                Ok(FileEntry {
                    relative: entry.relative_with_extension("avif"),
                    origin: entry.origin,
                    contents: bytes,
                })
            })
            .collect()
    }
}

/// Convert each raster to lossless WebP.
#[derive(Debug, Clone, Default)]
pub struct WebpEncode;

impl WebpEncode {
    fn encode(&self, entry: &FileEntry) -> anyhow::Result<Vec<u8>> {
        let img = DynamicImage::ImageRgba8(decode(entry)?.to_rgba8());
        let mut out = Vec::new();
        img.write_with_encoder(WebPEncoder::new_lossless(&mut out))
            .with_context(|| format!("encoding {:?} as WebP", entry.relative))?;
        Ok(out)
    }
}

impl Transform for WebpEncode {
    fn name(&self) -> &str {
        "webp"
    }

    fn apply(&self, _ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        input
            .into_iter()
            .map(|entry| {
                let bytes = self
                    .encode(&entry)
                    .map_err(|e| TransformError::new(self.name(), e))?;
                Ok(FileEntry {
                    relative: entry.relative_with_extension("webp"),
                    origin: entry.origin,
                    contents: bytes,
                })
            })
            .collect()
    }
}

/// Re-encode PNG and JPEG sources and keep whichever is smaller.
///
/// Everything else (SVG icons, GIFs, ...) passes through unchanged so it
/// still lands next to the converted images.
#[derive(Debug, Clone)]
pub struct Optimize {
    jpeg_quality: u8,
}

impl Default for Optimize {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

impl Optimize {
    fn reencode(&self, entry: &FileEntry) -> anyhow::Result<Option<Vec<u8>>> {
        let ext = entry.extension().unwrap_or_default();
        let mut out = Vec::new();
        match ext.as_str() {
            "png" => {
                let img = decode(entry)?;
                let encoder = PngEncoder::new_with_quality(
                    Cursor::new(&mut out),
                    CompressionType::Best,
                    FilterType::Adaptive,
                );
                img.write_with_encoder(encoder)
                    .with_context(|| format!("re-encoding {:?}", entry.relative))?;
            }
            "jpg" | "jpeg" => {
                let img = DynamicImage::ImageRgb8(decode(entry)?.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut out, self.jpeg_quality);
                img.write_with_encoder(encoder)
                    .with_context(|| format!("re-encoding {:?}", entry.relative))?;
            }
            _ => return Ok(None),
        }
        Ok(Some(out))
    }
}

impl Transform for Optimize {
    fn name(&self) -> &str {
        "optimize"
    }

    fn apply(&self, _ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        input
            .into_iter()
            .map(|entry| {
                let reencoded = self
                    .reencode(&entry)
                    .map_err(|e| TransformError::new(self.name(), e))?;
                match reencoded {
                    Some(bytes) if bytes.len() < entry.contents.len() => {
                        debug!(
                            file = ?entry.relative,
                            before = entry.contents.len(),
                            after = bytes.len(),
                            "optimized image"
                        );
                        Ok(FileEntry {
                            contents: bytes,
                            ..entry
                        })
                    }
                    _ => Ok(entry),
                }
            })
            .collect()
    }
}
