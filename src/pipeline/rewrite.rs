//! HTML rewriting: replace `<img>` tags with numbered placeholder blocks.
//!
//! The primary PDF carries no images. Each image tag whose `src` resolves to
//! a known image becomes a styled `<div>` reading `[Bild N - Siehe
//! Bildanhang]`, pointing the reader at page N of the gallery. Everything
//! else in the document, unresolved tags included, is copied through
//! byte for byte.

use crate::pipeline::mapping::ImageRefMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Inline style of the placeholder block.
pub const PLACEHOLDER_STYLE: &str = "text-align: center; margin: 20px 0; font-weight: bold; \
font-size: 14px; color: #333; padding: 10px; border: 1px solid #ccc; background-color: #f9f9f9;";

static RE_IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\s+[^>]+>").unwrap());

// `src` must start the attribute list or follow whitespace / a slash, which
// keeps `data-src` and `srcset` from matching.
static RE_SRC_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|[\s/])src\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub html: String,
    /// Tags replaced by a placeholder.
    pub replaced: usize,
    /// Tags left as they were.
    pub unresolved: usize,
}

/// Replace every resolvable `<img>` tag in `html`.
pub fn rewrite_image_tags(html: &str, map: &ImageRefMap, label: &str, note: &str) -> RewriteOutcome {
    let mut replaced = 0;
    let mut unresolved = 0;

    let html = RE_IMG_TAG
        .replace_all(html, |caps: &Captures<'_>| {
            let tag = &caps[0];
            match image_src(tag).and_then(|src| map.get(&src_file_name(&src))) {
                Some(number) => {
                    replaced += 1;
                    placeholder(number, label, note)
                }
                None => {
                    unresolved += 1;
                    tag.to_string()
                }
            }
        })
        .into_owned();

    RewriteOutcome {
        html,
        replaced,
        unresolved,
    }
}

/// The placeholder block for image `number`.
pub fn placeholder(number: usize, label: &str, note: &str) -> String {
    format!(
        "<div style=\"{PLACEHOLDER_STYLE}\">[{} {} - {}]</div>",
        escape_html(label),
        number,
        escape_html(note)
    )
}

/// Value of the `src` attribute of a single tag.
fn image_src(tag: &str) -> Option<String> {
    // Skip the tag name so "<img" itself can't be read as an attribute boundary.
    let attrs = tag.get(4..)?;
    let caps = RE_SRC_ATTR.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Base filename of a `src` value: query and fragment removed,
/// percent-escapes decoded.
fn src_file_name(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or("");
    let decoded = percent_encoding::percent_decode_str(path).decode_utf8_lossy();
    decoded
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .to_string()
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
