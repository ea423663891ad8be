// src/transform/styles.rs

//! Stylesheet adapters: SCSS -> CSS via `grass`, then vendor prefixing and
//! minification via `lightningcss`.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use tracing::debug;

use crate::errors::TransformError;
use crate::fileset::{join_root, FileEntry, FileSet};
use crate::fs::FileSystem;

use super::{Transform, TransformContext};

/// Compile each SCSS file to CSS.
///
/// Partials (`_name.scss`) are only compiled through `@use`/`@import` from
/// other files and are dropped from the set. Plain `.css` passes through.
#[derive(Debug, Clone, Default)]
pub struct ScssCompile {
    /// Extra root-relative `@use`/`@import` search paths.
    load_paths: Vec<PathBuf>,
}

impl ScssCompile {
    pub fn new(load_paths: Vec<PathBuf>) -> Self {
        Self { load_paths }
    }
}

/// Lets `grass` resolve `@use`/`@import` through the pipeline's filesystem.
#[derive(Debug)]
struct ImportFs<'a>(&'a dyn FileSystem);

impl grass::Fs for ImportFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.0
            .read(path)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, format!("{e:#}")))
    }
}

impl Transform for ScssCompile {
    fn name(&self) -> &str {
        "scss"
    }

    fn apply(&self, ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        let mut out = Vec::with_capacity(input.len());

        for entry in input {
            let is_partial = entry.file_stem().starts_with('_');
            match entry.extension().as_deref() {
                Some("scss") if is_partial => {
                    debug!(file = ?entry.relative, "skipping SCSS partial");
                }
                Some("scss") => out.push(self.compile(ctx, entry)?),
                Some("css") => out.push(entry),
                _ => {
                    return Err(TransformError::new(
                        self.name(),
                        anyhow!("unsupported stylesheet {:?} (expected .scss or .css)", entry.relative),
                    ));
                }
            }
        }

        Ok(FileSet::new(out))
    }
}

impl ScssCompile {
    fn compile(&self, ctx: &TransformContext, entry: FileEntry) -> Result<FileEntry, TransformError> {
        let source = entry
            .text()
            .map_err(|e| TransformError::new(self.name(), anyhow!("{:?}: {e}", entry.relative)))?
            .to_string();

        let import_fs = ImportFs(ctx.fs.as_ref());
        let mut options = grass::Options::default()
            .fs(&import_fs)
            .style(grass::OutputStyle::Expanded);
        if let Some(dir) = entry.origin.as_deref().and_then(Path::parent) {
            options = options.load_path(dir);
        }
        for path in &self.load_paths {
            options = options.load_path(join_root(&ctx.root, path));
        }

        let css = grass::from_string(source, &options).map_err(|e| {
            TransformError::new(self.name(), anyhow!("{:?}: {e}", entry.relative))
        })?;

        Ok(FileEntry {
            relative: entry.relative_with_extension("css"),
            origin: entry.origin,
            contents: css.into_bytes(),
        })
    }
}

/// Add vendor prefixes for a browserslist query and minify.
#[derive(Debug, Clone)]
pub struct CssFinish {
    browsers: Vec<String>,
}

impl CssFinish {
    pub fn new(browsers: Vec<String>) -> Self {
        Self { browsers }
    }

    fn targets(&self) -> anyhow::Result<Targets> {
        if self.browsers.is_empty() {
            return Ok(Targets::default());
        }
        let browsers = Browsers::from_browserslist(self.browsers.iter().map(String::as_str))
            .map_err(|e| anyhow!("invalid browserslist query {:?}: {e}", self.browsers))?;
        Ok(browsers.map(Targets::from).unwrap_or_default())
    }
}

/// Prefix and minify one stylesheet.
pub fn finish_css(css: &str, filename: &str, targets: Targets) -> anyhow::Result<String> {
    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| anyhow!("{filename}: {e}"))?;

    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| anyhow!("{filename}: {e}"))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("{filename}: {e}"))?;

    Ok(printed.code)
}

impl Transform for CssFinish {
    fn name(&self) -> &str {
        "css"
    }

    fn apply(&self, _ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        let targets = self
            .targets()
            .map_err(|e| TransformError::new(self.name(), e))?;

        input
            .into_iter()
            .map(|entry| {
                let filename = entry.relative.to_string_lossy().to_string();
                let css = entry
                    .text()
                    .map_err(|e| TransformError::new(self.name(), anyhow!("{filename}: {e}")))?;
                let finished = finish_css(css, &filename, targets.clone())
                    .map_err(|e| TransformError::new(self.name(), e))?;
                Ok(FileEntry {
                    contents: finished.into_bytes(),
                    ..entry
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn ctx() -> TransformContext {
        TransformContext {
            fs: Arc::new(MockFileSystem::new()),
            root: PathBuf::from("."),
        }
    }

    #[test]
    fn compiles_nested_rules_and_drops_partials() {
        let input = FileSet::new(vec![
            FileEntry::new("style.scss", "$c: #123456;\n.card { .title { color: $c; } }\n"),
            FileEntry::new("_vars.scss", "$unused: 1px;"),
        ]);

        let out = ScssCompile::default().apply(&ctx(), input).unwrap();
        assert_eq!(out.len(), 1);

        let css = out.get("style.css").unwrap().text().unwrap();
        assert!(css.contains(".card .title"));
        assert!(css.contains("#123456"));
    }

    #[test]
    fn partials_resolve_through_the_pipeline_filesystem() {
        let fs = MockFileSystem::new();
        fs.add_file("app/scss/_vars.scss", "$accent: #abcdef;\n");
        fs.add_file("app/scss/blocks/_card.scss", ".card { color: red; }\n");
        let ctx = TransformContext {
            fs: Arc::new(fs.clone()),
            root: PathBuf::from("."),
        };
        let input = FileSet::new(vec![
            FileEntry::new(
                "style.scss",
                "@use 'vars';\n@use 'blocks/card';\n.a { color: vars.$accent; }\n",
            )
            .with_origin("app/scss/style.scss"),
        ]);

        let out = ScssCompile::default().apply(&ctx, input).unwrap();
        let css = out.get("style.css").unwrap().text().unwrap();

        assert!(css.contains("#abcdef"), "{css}");
        assert!(css.contains(".card"), "{css}");
    }

    #[test]
    fn syntax_errors_name_the_stage() {
        let input = FileSet::new(vec![FileEntry::new("bad.scss", ".a { color: ")]);
        let err = ScssCompile::default().apply(&ctx(), input).unwrap_err();
        assert_eq!(err.stage, "scss");
    }

    #[test]
    fn finish_minifies() {
        let input = FileSet::new(vec![FileEntry::new(
            "style.min.css",
            ".a {\n  color: #123456;\n}\n\n.b {\n  margin: 0px;\n}\n",
        )]);

        let out = CssFinish::new(vec!["last 10 versions".into()])
            .apply(&ctx(), input)
            .unwrap();
        let css = out.get("style.min.css").unwrap().text().unwrap();

        assert!(!css.contains('\n'));
        assert!(css.contains(".a{color:#123456}"));
    }
}
