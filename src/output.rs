//! Result types returned by the conversion entry points.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Orchestrator stages, in the order they run.
///
/// `Cleanup` is entered on every exit path, including after a render failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Init,
    ExtractResources,
    MapImages,
    BuildHtml,
    WriteTempHtml,
    RenderPrimaryPdf,
    RenderGalleryPdf,
    Cleanup,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::ExtractResources => "extract resources",
            Stage::MapImages => "map images",
            Stage::BuildHtml => "build html",
            Stage::WriteTempHtml => "write temp html",
            Stage::RenderPrimaryPdf => "render primary pdf",
            Stage::RenderGalleryPdf => "render gallery pdf",
            Stage::Cleanup => "cleanup",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// An image extracted from the book, numbered in extraction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 1-based sequence number ("Bild N").
    pub number: usize,
    /// Base filename, the key used to resolve `<img src>`.
    pub file_name: String,
    /// Name of the item inside the EPUB (manifest href).
    pub item_name: String,
}

/// A page of the gallery PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryPage {
    /// Sequence number of the image on this page.
    pub number: usize,
    pub file_name: String,
    /// Source dimensions in pixels.
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Rendered dimensions in millimetres.
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Counters and timings for a finished run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Document items concatenated into the primary HTML.
    pub documents: usize,
    /// Image, style and script items written to the scratch space.
    pub resources_written: usize,
    /// Resources that could not be written.
    pub resources_failed: usize,
    /// Images extracted and numbered.
    pub images_found: usize,
    /// Images that produced a gallery page.
    pub images_placed: usize,
    /// Images skipped by the gallery builder.
    pub images_skipped: usize,
    /// `<img>` tags replaced by a placeholder.
    pub placeholders: usize,
    /// `<img>` tags left untouched (no src or unknown filename).
    pub unresolved_tags: usize,
    pub render_duration_ms: u64,
    pub gallery_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a successful conversion produced.
///
/// Per-item problems do not fail the run; they are listed in `skipped`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub primary_pdf: PathBuf,
    pub gallery_pdf: PathBuf,
    pub images: Vec<ImageRecord>,
    pub gallery: Vec<GalleryPage>,
    /// Base filenames claimed by more than one image (last one wins).
    pub collisions: Vec<String>,
    pub skipped: Vec<ItemError>,
    pub stats: ConversionStats,
}

impl ConversionReport {
    /// `true` when nothing was skipped and no filename collided.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.collisions.is_empty()
    }
}

/// Book-level information available without converting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookSummary {
    pub title: Option<String>,
    pub creators: Vec<String>,
    pub documents: usize,
    pub images: usize,
    pub styles: usize,
    pub scripts: usize,
    pub other: usize,
}
