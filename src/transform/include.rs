// src/transform/include.rs

//! Markup include directives.
//!
//! Recognised forms (one per line, leading indentation is preserved for
//! every included line):
//!
//! ```text
//! <!--=include components/header.html -->
//! //=include "partials/nav.html"
//! /*=require shared.html */
//! ```
//!
//! `include` always inlines; `require` inlines a file only the first time
//! it is seen within one page. Paths resolve against the including file's
//! directory first, then each configured include path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::anyhow;
use regex::Regex;
use tracing::debug;

use crate::errors::TransformError;
use crate::fileset::{join_root, FileEntry, FileSet};

use super::{Transform, TransformContext};

const MAX_INCLUDE_DEPTH: usize = 16;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^([ \t]*)(?://|/\*|#|<!--)[ \t]*=[ \t]*(include|require)[ \t]+["']?([^"'\s]+?)["']?[ \t]*(?:\*/|-->)?[ \t]*\r?$"#,
    )
    .expect("include directive regex is valid")
});

#[derive(Debug, Clone, Default)]
pub struct Include {
    /// Root-relative directories searched after the including file's own.
    include_paths: Vec<PathBuf>,
}

impl Include {
    pub fn new(include_paths: Vec<PathBuf>) -> Self {
        Self { include_paths }
    }
}

/// Per-page expansion state.
struct Expansion<'a> {
    ctx: &'a TransformContext,
    include_paths: Vec<PathBuf>,
    stack: Vec<PathBuf>,
    required: HashSet<PathBuf>,
}

impl Transform for Include {
    fn name(&self) -> &str {
        "include"
    }

    fn apply(&self, ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        let include_paths: Vec<PathBuf> = self
            .include_paths
            .iter()
            .map(|p| join_root(&ctx.root, p))
            .collect();

        input
            .into_iter()
            .map(|entry| {
                let text = entry.text().map_err(|e| {
                    TransformError::new(
                        self.name(),
                        anyhow!("{:?} is not valid UTF-8: {e}", entry.relative),
                    )
                })?;

                let mut expansion = Expansion {
                    ctx,
                    include_paths: include_paths.clone(),
                    stack: entry.origin.iter().cloned().collect(),
                    required: HashSet::new(),
                };
                let current_dir = entry.origin.as_deref().and_then(Path::parent);
                let expanded = expansion
                    .expand(text, current_dir)
                    .map_err(|e| TransformError::new(self.name(), e))?;

                Ok(FileEntry {
                    contents: expanded.into_bytes(),
                    ..entry
                })
            })
            .collect()
    }
}

impl Expansion<'_> {
    fn expand(&mut self, text: &str, current_dir: Option<&Path>) -> anyhow::Result<String> {
        if self.stack.len() > MAX_INCLUDE_DEPTH {
            return Err(anyhow!(
                "include depth exceeds {MAX_INCLUDE_DEPTH} (last: {:?})",
                self.stack.last()
            ));
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in DIRECTIVE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            let indent = &caps[1];
            let once = &caps[2] == "require";
            let target = self.resolve(&caps[3], current_dir)?;

            if once && self.required.contains(&target) {
                debug!(file = ?target, "already required; skipping");
                if text[last..].starts_with('\n') {
                    last += 1;
                }
                continue;
            }
            if self.stack.contains(&target) {
                return Err(anyhow!("include cycle through {:?}", target));
            }

            let body = self.ctx.fs.read_to_string(&target)?;
            self.stack.push(target.clone());
            let nested = self.expand(&body, target.parent())?;
            self.stack.pop();
            self.required.insert(target);

            let nested = nested.strip_suffix('\n').unwrap_or(&nested);
            for (idx, line) in nested.split('\n').enumerate() {
                if idx > 0 {
                    out.push('\n');
                }
                if !line.is_empty() {
                    out.push_str(indent);
                }
                out.push_str(line);
            }
        }

        out.push_str(&text[last..]);
        Ok(out)
    }

    fn resolve(&self, name: &str, current_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
        let candidates = current_dir
            .into_iter()
            .map(Path::to_path_buf)
            .chain(self.include_paths.iter().cloned());

        let mut searched = Vec::new();
        for dir in candidates {
            let candidate = dir.join(name);
            if self.ctx.fs.is_file(&candidate) {
                return Ok(candidate);
            }
            searched.push(dir);
        }
        Err(anyhow!("include '{name}' not found (searched {searched:?})"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;

    fn ctx(fs: &MockFileSystem) -> TransformContext {
        TransformContext {
            fs: Arc::new(fs.clone()),
            root: PathBuf::from("."),
        }
    }

    fn page(fs: &MockFileSystem, path: &str) -> FileSet {
        let contents = fs.read(Path::new(path)).unwrap();
        let name = Path::new(path).file_name().unwrap().to_owned();
        FileSet::new(vec![FileEntry::new(name, contents).with_origin(path)])
    }

    #[test]
    fn expands_nested_includes_with_indentation() {
        let fs = MockFileSystem::new();
        fs.add_file("app/components/header.html", "<header>\n<!--=include nav.html -->\n</header>\n");
        fs.add_file("app/components/nav.html", "<nav></nav>\n");
        fs.add_file(
            "app/pages/index.html",
            "<body>\n  <!--=include header.html -->\n</body>\n",
        );

        let include = Include::new(vec![PathBuf::from("app/components")]);
        let out = include.apply(&ctx(&fs), page(&fs, "app/pages/index.html")).unwrap();
        let html = out.get("index.html").unwrap().text().unwrap().to_string();

        assert_eq!(
            html,
            "<body>\n  <header>\n  <nav></nav>\n  </header>\n</body>\n"
        );
    }

    #[test]
    fn require_inlines_only_once() {
        let fs = MockFileSystem::new();
        fs.add_file("app/components/meta.html", "<meta>");
        fs.add_file(
            "app/pages/a.html",
            "//=require meta.html\n//=require meta.html\n",
        );

        let include = Include::new(vec![PathBuf::from("app/components")]);
        let out = include.apply(&ctx(&fs), page(&fs, "app/pages/a.html")).unwrap();
        assert_eq!(out.get("a.html").unwrap().text().unwrap(), "<meta>\n");
    }

    #[test]
    fn missing_include_is_a_transform_error() {
        let fs = MockFileSystem::new();
        fs.add_file("app/pages/a.html", "<!--=include nope.html -->\n");

        let err = Include::default()
            .apply(&ctx(&fs), page(&fs, "app/pages/a.html"))
            .unwrap_err();
        assert_eq!(err.stage, "include");
        assert!(err.to_string().contains("nope.html"));
    }

    #[test]
    fn cycles_are_rejected() {
        let fs = MockFileSystem::new();
        fs.add_file("app/pages/a.html", "<!--=include b.html -->\n");
        fs.add_file("app/pages/b.html", "<!--=include a.html -->\n");

        let err = Include::default()
            .apply(&ctx(&fs), page(&fs, "app/pages/a.html"))
            .unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
