//! Conversion entry points and the stage orchestrator.
//!
//! A run moves through the stages of [`Stage`] in order:
//!
//! ```text
//! Init → ExtractResources → MapImages → BuildHtml → WriteTempHtml
//!      → RenderPrimaryPdf → RenderGalleryPdf → Cleanup → Done
//! ```
//!
//! The scratch directory is created once the book has been parsed and is
//! removed in `Cleanup` whatever happened before it. A failing stage skips
//! straight to `Cleanup` and its error is returned afterwards, so callers
//! never see an `Err` while temporary files still exist.

use crate::config::ConversionConfig;
use crate::error::Epub2PdfError;
use crate::output::{BookSummary, ConversionReport, ConversionStats, ImageRecord, Stage};
use crate::pipeline::epub::{EpubBook, ItemKind};
use crate::pipeline::extract::extract_resources;
use crate::pipeline::gallery::{build_gallery, write_gallery};
use crate::pipeline::mapping::{file_name, ImageRefMap};
use crate::pipeline::render::{HtmlToPdf, WkHtmlToPdf};
use crate::pipeline::rewrite::rewrite_image_tags;
use crate::pipeline::scratch::ScratchSpace;
use crate::pipeline::input;
use crate::progress::{ConversionProgressCallback, NoopProgressCallback};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert an EPUB file into a primary PDF and an image gallery PDF.
///
/// The gallery is written next to `output` as `<stem>_images.pdf` (see
/// [`gallery_path_for`]). The renderer is `config.renderer_path`, or
/// `wkhtmltopdf` found via `WKHTMLTOPDF_PATH`, `PATH` and the usual install
/// locations.
///
/// # Errors
/// Returns `Err(Epub2PdfError)` only for fatal errors: unreadable or invalid
/// input, no renderer, render failure, or an output file that cannot be
/// written. Images that fail to decode are skipped and listed in
/// [`ConversionReport::skipped`].
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Epub2PdfError> {
    let input = input.as_ref();
    input::resolve_local(input)?;
    let renderer = WkHtmlToPdf::from_config(config.renderer_path.as_deref())?;
    debug!("Renderer: {}", renderer.program().display());
    convert_with_renderer(input, output, config, &renderer)
}

/// [`convert`] with a caller-supplied HTML→PDF renderer.
pub fn convert_with_renderer(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ConversionConfig,
    renderer: &dyn HtmlToPdf,
) -> Result<ConversionReport, Epub2PdfError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    let output = output.as_ref();
    let progress: &dyn ConversionProgressCallback = config
        .progress_callback
        .as_deref()
        .unwrap_or(&NoopProgressCallback);

    enter(Stage::Init, progress);
    info!("Starting conversion: {} -> {}", input.display(), output.display());
    let path = input::resolve_local(input)?;
    let book = EpubBook::open(&path)?;
    let scratch = ScratchSpace::new(config.scratch_parent.as_deref())?;

    let result = run_stages(&book, &scratch, &path, output, config, renderer, progress);

    enter(Stage::Cleanup, progress);
    if let Err(e) = scratch.close() {
        warn!("Failed to remove scratch directory: {}", e);
    }

    let mut report = result?;
    report.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    enter(Stage::Done, progress);
    info!(
        "Conversion complete: {} placeholder(s), {}/{} image(s) in gallery, {}ms total",
        report.stats.placeholders,
        report.stats.images_placed,
        report.stats.images_found,
        report.stats.total_duration_ms
    );
    Ok(report)
}

/// Convert EPUB bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed when the
/// call returns; [`ConversionReport::input`] names that temporary file.
pub fn convert_bytes(
    bytes: &[u8],
    output: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Epub2PdfError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("epub2pdf-input-")
        .suffix(".epub")
        .tempfile()
        .map_err(|e| Epub2PdfError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| Epub2PdfError::Internal(format!("tempfile write: {e}")))?;
    // `tmp` is dropped (and the file deleted) when `convert` returns
    convert(tmp.path(), output, config)
}

/// Read an EPUB's metadata and item counts without converting it.
///
/// Needs no renderer.
pub fn inspect(input: impl AsRef<Path>) -> Result<BookSummary, Epub2PdfError> {
    let path = input::resolve_local(input.as_ref())?;
    Ok(EpubBook::open(&path)?.summary())
}

/// Path of the gallery PDF for a given primary output path: the output's
/// extension is dropped and `<suffix>.pdf` appended, in the same directory.
///
/// ```rust
/// use epub2pdf::gallery_path_for;
/// use std::path::Path;
///
/// assert_eq!(
///     gallery_path_for(Path::new("out/book.pdf"), "_images"),
///     Path::new("out/book_images.pdf")
/// );
/// ```
pub fn gallery_path_for(output: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = match output.file_stem() {
        Some(stem) => stem.to_os_string(),
        None => return PathBuf::from(format!("{}{suffix}.pdf", output.display())),
    };
    name.push(suffix);
    name.push(".pdf");
    output.with_file_name(name)
}

// ── Stages ───────────────────────────────────────────────────────────────

fn enter(stage: Stage, progress: &dyn ConversionProgressCallback) {
    debug!("Stage: {}", stage);
    progress.on_stage(stage);
}

fn run_stages(
    book: &EpubBook,
    scratch: &ScratchSpace,
    input: &Path,
    output: &Path,
    config: &ConversionConfig,
    renderer: &dyn HtmlToPdf,
    progress: &dyn ConversionProgressCallback,
) -> Result<ConversionReport, Epub2PdfError> {
    let mut stats = ConversionStats::default();
    let mut skipped = book.missing.clone();

    // ── Extract ──────────────────────────────────────────────────────────
    enter(Stage::ExtractResources, progress);
    let extracted = extract_resources(&book.items, scratch);
    stats.resources_written = extracted.written;
    stats.resources_failed = extracted.skipped.len();
    stats.images_found = extracted.images.len();
    skipped.extend(extracted.skipped.iter().cloned());
    info!(
        "Extracted {} resource(s), {} image(s)",
        extracted.written,
        extracted.images.len()
    );

    // ── Map ──────────────────────────────────────────────────────────────
    enter(Stage::MapImages, progress);
    let paths: Vec<&Path> = extracted.images.iter().map(|i| i.path.as_path()).collect();
    let map = ImageRefMap::build(&paths);
    let images: Vec<ImageRecord> = extracted
        .images
        .iter()
        .enumerate()
        .map(|(i, img)| ImageRecord {
            number: i + 1,
            file_name: file_name(&img.path),
            item_name: img.item_name.clone(),
        })
        .collect();

    // ── Build HTML ───────────────────────────────────────────────────────
    enter(Stage::BuildHtml, progress);
    let mut html = String::new();
    for item in book.items_of(ItemKind::Document) {
        match std::str::from_utf8(&item.content) {
            Ok(text) => html.push_str(text),
            Err(e) => {
                warn!("Document '{}' is not valid UTF-8 ({}); decoding lossily", item.name, e);
                html.push_str(&String::from_utf8_lossy(&item.content));
            }
        }
        stats.documents += 1;
    }
    let rewritten = rewrite_image_tags(&html, &map, &config.label_prefix, &config.placeholder_note);
    stats.placeholders = rewritten.replaced;
    stats.unresolved_tags = rewritten.unresolved;
    debug!(
        "{} document(s), {} placeholder(s), {} unresolved <img> tag(s)",
        stats.documents, rewritten.replaced, rewritten.unresolved
    );

    // ── Write intermediate HTML ──────────────────────────────────────────
    enter(Stage::WriteTempHtml, progress);
    let first_doc = book.items_of(ItemKind::Document).next().map(|d| d.name.as_str());
    let html_path = scratch.html_path(first_doc);
    html_path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|_| std::fs::write(&html_path, rewritten.html.as_bytes()))
        .map_err(|source| Epub2PdfError::IntermediateWriteFailed {
            path: html_path.clone(),
            source,
        })?;
    debug!("Intermediate HTML: {}", html_path.display());

    // ── Primary PDF ──────────────────────────────────────────────────────
    enter(Stage::RenderPrimaryPdf, progress);
    let render_start = Instant::now();
    renderer.render(&html_path, output, &config.render)?;
    stats.render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Gallery PDF ──────────────────────────────────────────────────────
    enter(Stage::RenderGalleryPdf, progress);
    let gallery_start = Instant::now();
    let gallery_pdf = gallery_path_for(output, &config.gallery_suffix);
    let gallery = build_gallery(&extracted.images, &config.gallery, &config.label_prefix, progress);
    write_gallery(&gallery_pdf, &gallery.pdf)?;
    stats.gallery_duration_ms = gallery_start.elapsed().as_millis() as u64;
    stats.images_placed = gallery.pages.len();
    stats.images_skipped = gallery.skipped.len();
    skipped.extend(gallery.skipped);

    Ok(ConversionReport {
        input: input.to_path_buf(),
        primary_pdf: output.to_path_buf(),
        gallery_pdf,
        images,
        gallery: gallery.pages,
        collisions: map.collisions().to_vec(),
        skipped,
        stats,
    })
}
