//! EPUB reading: ZIP container → OPF manifest → typed items with bytes.
//!
//! Only what the converter needs is parsed: the rootfile path from
//! `META-INF/container.xml`, the manifest (in document order), and the
//! `dc:title` / `dc:creator` metadata for [`crate::inspect`]. Spine order,
//! navigation and encryption are ignored; items are yielded in manifest
//! order, which is the order the conversion concatenates documents in.

use crate::error::{Epub2PdfError, ItemError};
use crate::output::BookSummary;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

const CONTAINER_PATH: &str = "META-INF/container.xml";
const MAX_SIZE_HINT: usize = 64 << 20;

/// Broad classification of a manifest item, derived from its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Document,
    Image,
    Style,
    Script,
    Navigation,
    /// The `cover-image` picture. Not part of the numbered image list.
    Cover,
    Font,
    Other,
}

impl ItemKind {
    /// Classify a manifest entry. `properties` is the raw `properties`
    /// attribute (EPUB 3), used to pick out the cover image.
    ///
    /// The EPUB 3 navigation document is XHTML and is treated as an ordinary
    /// document, so the table of contents appears in the primary PDF.
    pub fn classify(media_type: &str, properties: Option<&str>) -> ItemKind {
        let mt = media_type.trim().to_ascii_lowercase();
        let is_cover = properties
            .map(|p| p.split_ascii_whitespace().any(|v| v == "cover-image"))
            .unwrap_or(false);

        match mt.as_str() {
            "application/xhtml+xml" | "text/html" => ItemKind::Document,
            "text/css" => ItemKind::Style,
            "application/x-dtbncx+xml" => ItemKind::Navigation,
            "application/vnd.ms-opentype" => ItemKind::Font,
            _ if mt.starts_with("image/") && is_cover => ItemKind::Cover,
            _ if mt.starts_with("image/") => ItemKind::Image,
            _ if mt.contains("javascript") || mt.contains("ecmascript") => ItemKind::Script,
            _ if mt.starts_with("font/")
                || mt.starts_with("application/font-")
                || mt.starts_with("application/x-font-") =>
            {
                ItemKind::Font
            }
            _ => ItemKind::Other,
        }
    }

    /// Kinds the converter writes to the scratch space.
    pub fn is_extracted(self) -> bool {
        matches!(self, ItemKind::Image | ItemKind::Style | ItemKind::Script)
    }
}

/// One manifest item with its content.
#[derive(Debug, Clone)]
pub struct EpubItem {
    pub id: String,
    /// Manifest href, percent-decoded, relative to the OPF directory.
    pub name: String,
    pub media_type: String,
    pub kind: ItemKind,
    pub content: Vec<u8>,
}

/// A parsed book.
#[derive(Debug, Clone, Default)]
pub struct EpubBook {
    pub title: Option<String>,
    pub creators: Vec<String>,
    /// Items in manifest order.
    pub items: Vec<EpubItem>,
    /// Manifest entries whose bytes were not in the archive.
    pub missing: Vec<ItemError>,
}

impl EpubBook {
    /// Open and parse the EPUB at `path`.
    pub fn open(path: &Path) -> Result<Self, Epub2PdfError> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Epub2PdfError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Epub2PdfError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;
        Self::from_reader(std::io::BufReader::new(file), path)
    }

    /// Parse an EPUB from any seekable reader. `path` is only used in errors.
    pub fn from_reader<R: Read + Seek>(reader: R, path: &Path) -> Result<Self, Epub2PdfError> {
        let corrupt = |detail: String| Epub2PdfError::CorruptEpub {
            path: path.to_path_buf(),
            detail,
        };

        let mut archive = ZipArchive::new(reader).map_err(|e| corrupt(format!("zip: {e}")))?;

        let container = read_entry(&mut archive, CONTAINER_PATH)
            .map_err(|e| corrupt(format!("{CONTAINER_PATH}: {e}")))?
            .ok_or_else(|| corrupt(format!("{CONTAINER_PATH} is missing")))?;
        let opf_path = parse_container_xml(&container).map_err(corrupt)?;
        debug!("OPF package: {}", opf_path);

        let opf_bytes = read_entry(&mut archive, &opf_path)
            .map_err(|e| corrupt(format!("{opf_path}: {e}")))?
            .ok_or_else(|| corrupt(format!("package document '{opf_path}' is missing")))?;
        let opf = parse_opf(&String::from_utf8_lossy(strip_bom(&opf_bytes))).map_err(corrupt)?;

        let base = opf_path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();

        let mut book = EpubBook {
            title: opf.title,
            creators: opf.creators,
            ..Default::default()
        };

        for entry in opf.manifest {
            let name = percent_decode(&entry.href);
            let kind = ItemKind::classify(&entry.media_type, entry.properties.as_deref());
            let archive_path = resolve_path(&base, &entry.href);

            let content = match read_entry(&mut archive, &archive_path) {
                Ok(Some(bytes)) => Some(bytes),
                Ok(None) => read_entry(&mut archive, &percent_decode(&archive_path)).ok().flatten(),
                Err(e) => {
                    warn!("Failed to read '{}' from archive: {}", archive_path, e);
                    None
                }
            };

            match content {
                Some(content) => book.items.push(EpubItem {
                    id: entry.id,
                    name,
                    media_type: entry.media_type,
                    kind,
                    content,
                }),
                None => {
                    warn!("Manifest item '{}' not found in archive", name);
                    book.missing.push(ItemError::MissingArchiveEntry { name });
                }
            }
        }

        debug!(
            "Book parsed: {} items ({} missing)",
            book.items.len(),
            book.missing.len()
        );
        Ok(book)
    }

    /// Items of one kind, in manifest order.
    pub fn items_of(&self, kind: ItemKind) -> impl Iterator<Item = &EpubItem> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    /// Per-kind counts plus title/creators.
    pub fn summary(&self) -> BookSummary {
        let count = |k| self.items_of(k).count();
        BookSummary {
            title: self.title.clone(),
            creators: self.creators.clone(),
            documents: count(ItemKind::Document),
            images: count(ItemKind::Image),
            styles: count(ItemKind::Style),
            scripts: count(ItemKind::Script),
            other: self
                .items
                .iter()
                .filter(|i| {
                    !matches!(
                        i.kind,
                        ItemKind::Document | ItemKind::Image | ItemKind::Style | ItemKind::Script
                    )
                })
                .count(),
        }
    }
}

// ── Container / OPF parsing ──────────────────────────────────────────────

struct ManifestEntry {
    id: String,
    href: String,
    media_type: String,
    properties: Option<String>,
}

struct OpfData {
    title: Option<String>,
    creators: Vec<String>,
    manifest: Vec<ManifestEntry>,
}

/// Find the `full-path` of the first `<rootfile>` in container.xml.
fn parse_container_xml(bytes: &[u8]) -> Result<String, String> {
    let content = String::from_utf8_lossy(strip_bom(bytes));
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if local_name(e.name().as_ref()) == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(unescape(&String::from_utf8_lossy(&attr.value)));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("{CONTAINER_PATH}: {e}")),
            _ => {}
        }
    }

    Err(format!("no rootfile found in {CONTAINER_PATH}"))
}

fn parse_opf(content: &str) -> Result<OpfData, String> {
    let mut reader = Reader::from_str(content);
    // Keep whitespace so "A &amp; B" is not collapsed to "A&B"; trimmed on close.
    reader.config_mut().trim_text(false);

    let mut data = OpfData {
        title: None,
        creators: Vec::new(),
        manifest: Vec::new(),
    };
    let mut in_metadata = false;
    let mut current: Option<&'static str> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"metadata" => in_metadata = true,
                b"title" if in_metadata => {
                    current = Some("title");
                    text.clear();
                }
                b"creator" if in_metadata => {
                    current = Some("creator");
                    text.clear();
                }
                b"item" => push_item(&mut data.manifest, &e),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"item" {
                    push_item(&mut data.manifest, &e);
                }
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current.is_some() {
                    if let Some(c) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                        text.push_str(&c);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = false;
                }
                match (current, local) {
                    (Some("title"), b"title") => {
                        let t = text.trim();
                        if data.title.is_none() && !t.is_empty() {
                            data.title = Some(t.to_string());
                        }
                        current = None;
                    }
                    (Some("creator"), b"creator") => {
                        let t = text.trim();
                        if !t.is_empty() {
                            data.creators.push(t.to_string());
                        }
                        current = None;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("package document: {e}")),
            _ => {}
        }
    }

    if data.manifest.is_empty() {
        return Err("package document has an empty manifest".into());
    }
    Ok(data)
}

fn push_item(manifest: &mut Vec<ManifestEntry>, e: &quick_xml::events::BytesStart<'_>) {
    let mut entry = ManifestEntry {
        id: String::new(),
        href: String::new(),
        media_type: String::new(),
        properties: None,
    };
    for attr in e.attributes().flatten() {
        let value = unescape(&String::from_utf8_lossy(&attr.value));
        match attr.key.as_ref() {
            b"id" => entry.id = value,
            b"href" => entry.href = value,
            b"media-type" => entry.media_type = value,
            b"properties" => entry.properties = Some(value),
            _ => {}
        }
    }
    if entry.href.is_empty() {
        warn!("Skipping manifest item '{}' without href", entry.id);
        return;
    }
    manifest.push(entry);
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Read one archive entry. `Ok(None)` when the entry does not exist.
fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, zip::result::ZipError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            // The declared size is untrusted; only use it as a bounded hint.
            let mut buf = Vec::with_capacity((file.size() as usize).min(MAX_SIZE_HINT));
            file.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Join an href onto the OPF directory, resolving `.` and `..` segments.
/// Fragments (`#...`) are dropped.
pub(crate) fn resolve_path(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or("");
    let mut parts: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|s| !s.is_empty()).collect()
    };
    for seg in href.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

pub(crate) fn percent_decode(s: &str) -> String {
    percent_encoding::percent_decode_str(s)
        .decode_utf8_lossy()
        .into_owned()
}

fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".into()),
        "quot" => return Some("\"".into()),
        "lt" => return Some("<".into()),
        "gt" => return Some(">".into()),
        "amp" => return Some("&".into()),
        _ => {}
    }
    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };
    code.and_then(char::from_u32).map(|c| c.to_string())
}

/// Unescape the five predefined entities and numeric references in an
/// attribute value.
fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(';').and_then(|end| resolve_entity(&after[..end]).map(|r| (end, r))) {
            Some((end, resolved)) => {
                out.push_str(&resolved);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
