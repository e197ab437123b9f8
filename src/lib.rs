//! # epub2pdf
//!
//! Convert EPUB e-books into two PDFs: the text, and the pictures.
//!
//! The primary PDF is the book's XHTML documents concatenated and rendered
//! by `wkhtmltopdf`. Every image in it is replaced by a framed placeholder
//! such as `[Bild 3 - Siehe Bildanhang]`. The second PDF,
//! `<output>_images.pdf`, holds the images themselves, one per A4 page,
//! labelled with the same numbers and scaled to fit the page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! EPUB
//!  │
//!  ├─ 1. Input     check the file is a ZIP container
//!  ├─ 2. Read      container.xml → OPF manifest → items
//!  ├─ 3. Extract   images, styles, scripts → scratch directory
//!  ├─ 4. Map       image filename → number
//!  ├─ 5. Rewrite   <img> → placeholder block
//!  ├─ 6. Render    wkhtmltopdf → primary PDF
//!  ├─ 7. Gallery   one page per image → <stem>_images.pdf
//!  └─ 8. Cleanup   scratch directory removed on every path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use epub2pdf::{convert, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = convert("book.epub", "book.pdf", &ConversionConfig::default())?;
//!     println!("gallery: {}", report.gallery_pdf.display());
//!     for skip in &report.skipped {
//!         eprintln!("skipped: {skip}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `epub2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! epub2pdf = { version = "0.3", default-features = false }
//! ```
//!
//! ## Renderer
//!
//! `wkhtmltopdf` must be installed. It is looked up through
//! `WKHTMLTOPDF_PATH`, then `PATH`, then the platform's default install
//! directories; set [`ConversionConfig::renderer_path`] to skip the search,
//! or pass your own [`HtmlToPdf`] to [`convert_with_renderer`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, GalleryLayout, RenderOptions};
pub use convert::{convert, convert_bytes, convert_with_renderer, gallery_path_for, inspect};
pub use error::{Epub2PdfError, ItemError};
pub use output::{BookSummary, ConversionReport, ConversionStats, GalleryPage, ImageRecord, Stage};
pub use pipeline::layout::{fit_image, LayoutBox};
pub use pipeline::render::{HtmlToPdf, WkHtmlToPdf};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
