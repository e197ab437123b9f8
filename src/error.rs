//! Error types for the epub2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Epub2PdfError`] — **Fatal**: the conversion cannot proceed or its
//!   primary output could not be produced (missing input, not an EPUB,
//!   renderer missing or failing, output not writable). Returned as
//!   `Err(Epub2PdfError)` from the top-level `convert*` functions, always
//!   after the scratch space has been cleaned up.
//!
//! * [`ItemError`] — **Non-fatal**: a single resource or image could not be
//!   used (write failure, corrupt image). The item is skipped, the error is
//!   logged and stored in [`crate::output::ConversionReport::skipped`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the epub2pdf library.
#[derive(Debug, Error)]
pub enum Epub2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("EPUB file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a ZIP container.
    #[error("File is not a valid EPUB: '{path}'\nFirst bytes: {magic:?}")]
    NotAnEpub { path: PathBuf, magic: [u8; 4] },

    /// The ZIP opened but the container/OPF structure is unusable.
    #[error("EPUB '{path}' is corrupt: {detail}")]
    CorruptEpub { path: PathBuf, detail: String },

    // ── Scratch space ─────────────────────────────────────────────────────
    /// The temporary working directory could not be created.
    #[error("Failed to create scratch directory: {source}")]
    ScratchSetup {
        #[source]
        source: std::io::Error,
    },

    /// The concatenated HTML could not be written into the scratch space.
    #[error("Failed to write intermediate HTML '{path}': {source}")]
    IntermediateWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// No wkhtmltopdf executable could be found.
    #[error("HTML renderer not available: {0}")]
    RendererNotFound(String),

    /// The renderer executable exists but could not be started.
    #[error("Failed to start renderer '{program}': {source}")]
    RendererSpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The renderer ran and reported failure.
    #[error("PDF rendering failed ({status}): {stderr}")]
    RenderFailed { status: String, stderr: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single resource or image.
///
/// The conversion continues; the affected item is simply absent from the
/// output (an unresolved `<img>` stays as-is, a missing gallery page leaves
/// a numbering gap).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ItemError {
    /// Writing an extracted resource into the scratch space failed.
    #[error("Resource '{name}': write failed: {detail}")]
    ResourceWriteFailed { name: String, detail: String },

    /// The manifest lists an item the ZIP archive does not contain.
    #[error("Resource '{name}': listed in manifest but missing from archive")]
    MissingArchiveEntry { name: String },

    /// The manifest name would escape the scratch directory.
    #[error("Resource '{name}': refusing unsafe path")]
    UnsafeResourcePath { name: String },

    /// The image could not be opened or decoded.
    #[error("Image {number} ('{file_name}'): decode failed: {detail}")]
    ImageDecodeFailed {
        number: usize,
        file_name: String,
        detail: String,
    },

    /// The image decoded but has a zero dimension, so no aspect ratio exists.
    #[error("Image {number} ('{file_name}'): degenerate size {width}x{height}")]
    DegenerateImage {
        number: usize,
        file_name: String,
        width: u32,
        height: u32,
    },
}

impl ItemError {
    /// Gallery number of the affected image, if this is an image error.
    pub fn image_number(&self) -> Option<usize> {
        match self {
            ItemError::ImageDecodeFailed { number, .. } | ItemError::DegenerateImage { number, .. } => {
                Some(*number)
            }
            _ => None,
        }
    }
}
