// src/transform/sprite.rs

//! SVG "stack" sprites.
//!
//! Every icon becomes a nested `<svg id="<stem>">` inside one sprite file.
//! Only the icon named by the URL fragment is displayed, so
//! `sprite.svg#arrow` renders the `arrow` icon on its own.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::anyhow;
use regex::Regex;
use tracing::debug;

use crate::errors::TransformError;
use crate::fileset::{FileEntry, FileSet};

use super::{Transform, TransformContext};

const STACK_STYLE: &str = ":root>svg{display:none}:root>svg:target{display:block}";
const EXAMPLE_PATH: &str = "stack/sprite.stack.html";

static PROLOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE.*?>|<!--.*?-->").expect("prolog regex is valid")
});
static ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<svg\b([^>]*)>(.*)</svg\s*>").expect("root regex is valid")
});
static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute regex is valid")
});

#[derive(Debug, Clone)]
pub struct SvgSprite {
    /// Sprite file name, relative to the destination.
    sprite: PathBuf,
    /// Also emit an HTML page listing every icon.
    example: bool,
}

impl Default for SvgSprite {
    fn default() -> Self {
        Self {
            sprite: PathBuf::from("sprite.svg"),
            example: true,
        }
    }
}

impl SvgSprite {
    pub fn new(sprite: impl Into<PathBuf>, example: bool) -> Self {
        Self {
            sprite: sprite.into(),
            example,
        }
    }
}

/// One icon ready for packing.
#[derive(Debug)]
struct Icon {
    view_box: String,
    body: String,
}

fn parse_icon(source: &str) -> anyhow::Result<Icon> {
    let cleaned = PROLOG.replace_all(source, "");
    let caps = ROOT
        .captures(&cleaned)
        .ok_or_else(|| anyhow!("no <svg> root element"))?;

    let mut attrs = BTreeMap::new();
    for attr in ATTR.captures_iter(&caps[1]) {
        let value = attr.get(2).or_else(|| attr.get(3)).map_or("", |m| m.as_str());
        attrs.insert(attr[1].to_string(), value.to_string());
    }

    let view_box = match attrs.get("viewBox") {
        Some(vb) => vb.clone(),
        None => {
            let dim = |name: &str| -> anyhow::Result<f64> {
                let raw = attrs
                    .get(name)
                    .ok_or_else(|| anyhow!("icon has neither viewBox nor {name}"))?;
                raw.trim_end_matches("px")
                    .parse()
                    .map_err(|_| anyhow!("cannot read {name}={raw:?}"))
            };
            format!("0 0 {} {}", dim("width")?, dim("height")?)
        }
    };

    Ok(Icon {
        view_box,
        body: caps[2].trim().to_string(),
    })
}

/// Icon ids are file stems with anything outside `[A-Za-z0-9_-]` replaced.
fn icon_id(entry: &FileEntry) -> String {
    entry
        .file_stem()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

fn render_sprite(icons: &BTreeMap<String, Icon>) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?><svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
    );
    out.push_str("<style>");
    out.push_str(STACK_STYLE);
    out.push_str("</style>");
    for (id, icon) in icons {
        out.push_str(&format!(
            r#"<svg id="{id}" viewBox="{}" xmlns="http://www.w3.org/2000/svg">{}</svg>"#,
            icon.view_box, icon.body
        ));
    }
    out.push_str("</svg>");
    out
}

fn render_example(icons: &BTreeMap<String, Icon>, sprite_href: &str) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>stack sprite</title>\n\
         <style>body{font-family:sans-serif}figure{display:inline-block;margin:1em;text-align:center}img{width:48px;height:48px}</style>\n\
         </head>\n<body>\n",
    );
    for id in icons.keys() {
        out.push_str(&format!(
            "<figure><img src=\"{sprite_href}#{id}\" alt=\"{id}\"><figcaption>{id}</figcaption></figure>\n"
        ));
    }
    out.push_str("</body>\n</html>\n");
    out
}

impl Transform for SvgSprite {
    fn name(&self) -> &str {
        "sprite"
    }

    fn apply(&self, _ctx: &TransformContext, input: FileSet) -> Result<FileSet, TransformError> {
        let mut icons = BTreeMap::new();

        for entry in input {
            // A previous run's sprite sits among the icons it was built from.
            if entry.relative == self.sprite || entry.extension().as_deref() != Some("svg") {
                debug!(file = ?entry.relative, "not an icon; skipping");
                continue;
            }
            let source = entry.text().map_err(|e| {
                TransformError::new(self.name(), anyhow!("{:?}: {e}", entry.relative))
            })?;
            let icon = parse_icon(source).map_err(|e| {
                TransformError::new(self.name(), anyhow!("{:?}: {e}", entry.relative))
            })?;

            let id = icon_id(&entry);
            if icons.insert(id.clone(), icon).is_some() {
                return Err(TransformError::new(
                    self.name(),
                    anyhow!("two icons map to the id '{id}'"),
                ));
            }
        }

        if icons.is_empty() {
            return Ok(FileSet::empty());
        }

        let mut out = vec![FileEntry::new(&self.sprite, render_sprite(&icons))];
        if self.example {
            let href = format!("../{}", self.sprite.to_string_lossy());
            out.push(FileEntry::new(EXAMPLE_PATH, render_example(&icons, &href)));
        }
        debug!(icons = icons.len(), sprite = ?self.sprite, "packed sprite");
        Ok(FileSet::new(out))
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
    fn packs_icons_into_a_stack() {
        let input = FileSet::new(vec![
            FileEntry::new(
                "arrow.svg",
                r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M0 0h24"/></svg>"#,
            ),
            FileEntry::new("dot.svg", r#"<svg width="16px" height='16'><circle r="8"/></svg>"#),
            FileEntry::new("sprite.svg", "<svg>stale</svg>"),
        ]);

        let out = SvgSprite::default().apply(&ctx(), input).unwrap();
        assert_eq!(
            out.relative_paths(),
            vec![PathBuf::from("sprite.svg"), PathBuf::from(EXAMPLE_PATH)]
        );

        let sprite = out.get("sprite.svg").unwrap().text().unwrap();
        assert!(sprite.contains(STACK_STYLE));
        assert!(sprite.contains(r#"<svg id="arrow" viewBox="0 0 24 24""#));
        assert!(sprite.contains(r#"<svg id="dot" viewBox="0 0 16 16""#));
        assert!(sprite.contains(r#"<path d="M0 0h24"/>"#));
        assert!(!sprite.contains("stale"));

        let example = out.get(EXAMPLE_PATH).unwrap().text().unwrap();
        assert!(example.contains(r#"src="../sprite.svg#arrow""#));
    }

    #[test]
    fn icon_without_dimensions_is_rejected() {
        let input = FileSet::new(vec![FileEntry::new("bad.svg", "<svg><g/></svg>")]);
        let err = SvgSprite::default().apply(&ctx(), input).unwrap_err();
        assert_eq!(err.stage, "sprite");
        assert!(err.to_string().contains("viewBox"));
    }
}
