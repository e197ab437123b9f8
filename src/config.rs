//! Configuration types for EPUB-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The defaults reproduce the classic
//! output: A4 pages, 15/10 mm renderer margins, and a gallery whose images
//! fit a 190 × 267 mm box labelled "Bild N".

use crate::error::Epub2PdfError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for an EPUB-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use epub2pdf::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .label_prefix("Figure")
///     .placeholder_note("see image appendix")
///     .build()
///     .unwrap();
/// assert_eq!(config.label_prefix, "Figure");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Options handed to the HTML→PDF renderer for the primary document.
    pub render: RenderOptions,

    /// Page geometry of the gallery PDF.
    pub gallery: GalleryLayout,

    /// Word in front of every image number, both in the placeholders and on
    /// the gallery pages. Default: `"Bild"`.
    pub label_prefix: String,

    /// Text after the number inside a placeholder. Default: `"Siehe Bildanhang"`.
    pub placeholder_note: String,

    /// Appended to the output file stem to name the gallery. Default: `"_images"`.
    pub gallery_suffix: String,

    /// Explicit wkhtmltopdf executable. If None, it is located on first use.
    pub renderer_path: Option<PathBuf>,

    /// Directory in which the per-run scratch directory is created.
    /// If None, the system temp directory is used.
    pub scratch_parent: Option<PathBuf>,

    /// Receives stage and per-image events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            gallery: GalleryLayout::default(),
            label_prefix: "Bild".to_string(),
            placeholder_note: "Siehe Bildanhang".to_string(),
            gallery_suffix: "_images".to_string(),
            renderer_path: None,
            scratch_parent: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("render", &self.render)
            .field("gallery", &self.gallery)
            .field("label_prefix", &self.label_prefix)
            .field("placeholder_note", &self.placeholder_note)
            .field("gallery_suffix", &self.gallery_suffix)
            .field("renderer_path", &self.renderer_path)
            .field("scratch_parent", &self.scratch_parent)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn render_options(mut self, options: RenderOptions) -> Self {
        self.config.render = options;
        self
    }

    pub fn page_size(mut self, size: impl Into<String>) -> Self {
        self.config.render.page_size = size.into();
        self
    }

    /// Renderer margins in millimetres: top, bottom, left, right.
    pub fn margins_mm(mut self, top: f32, bottom: f32, left: f32, right: f32) -> Self {
        self.config.render.margin_top_mm = top;
        self.config.render.margin_bottom_mm = bottom;
        self.config.render.margin_left_mm = left;
        self.config.render.margin_right_mm = right;
        self
    }

    pub fn gallery_layout(mut self, layout: GalleryLayout) -> Self {
        self.config.gallery = layout;
        self
    }

    pub fn label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.label_prefix = prefix.into();
        self
    }

    pub fn placeholder_note(mut self, note: impl Into<String>) -> Self {
        self.config.placeholder_note = note.into();
        self
    }

    pub fn gallery_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.gallery_suffix = suffix.into();
        self
    }

    pub fn renderer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.renderer_path = Some(path.into());
        self
    }

    pub fn scratch_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_parent = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Epub2PdfError> {
        let c = &self.config;
        let r = &c.render;
        for (name, v) in [
            ("margin-top", r.margin_top_mm),
            ("margin-bottom", r.margin_bottom_mm),
            ("margin-left", r.margin_left_mm),
            ("margin-right", r.margin_right_mm),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Epub2PdfError::InvalidConfig(format!(
                    "{name} must be a non-negative number of millimetres, got {v}"
                )));
            }
        }
        if r.page_size.trim().is_empty() {
            return Err(Epub2PdfError::InvalidConfig("Page size must not be empty".into()));
        }
        c.gallery.validate()?;
        if c.label_prefix.trim().is_empty() {
            return Err(Epub2PdfError::InvalidConfig("Label prefix must not be empty".into()));
        }
        if c.gallery_suffix.is_empty() || c.gallery_suffix.contains(['/', '\\']) {
            return Err(Epub2PdfError::InvalidConfig(format!(
                "Gallery suffix must be a non-empty file-name fragment, got {:?}",
                c.gallery_suffix
            )));
        }
        Ok(self.config)
    }
}

// ── Renderer options ─────────────────────────────────────────────────────

/// Settings for the external HTML→PDF renderer.
///
/// The defaults keep a book readable even when some of its resources are
/// missing: local file access on, media load errors ignored, and no smart
/// shrinking so fonts keep their CSS size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Paper size name understood by the renderer. Default: `"A4"`.
    pub page_size: String,
    pub margin_top_mm: f32,
    pub margin_bottom_mm: f32,
    pub margin_left_mm: f32,
    pub margin_right_mm: f32,
    /// Input encoding. Default: `"UTF-8"`.
    pub encoding: String,
    pub enable_local_file_access: bool,
    pub ignore_media_errors: bool,
    pub disable_smart_shrinking: bool,
    /// Suppress the renderer's own progress output.
    pub quiet: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_size: "A4".to_string(),
            margin_top_mm: 15.0,
            margin_bottom_mm: 15.0,
            margin_left_mm: 10.0,
            margin_right_mm: 10.0,
            encoding: "UTF-8".to_string(),
            enable_local_file_access: true,
            ignore_media_errors: true,
            disable_smart_shrinking: true,
            quiet: true,
        }
    }
}

// ── Gallery geometry ─────────────────────────────────────────────────────

/// Page geometry of the image gallery, in millimetres (font size in points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GalleryLayout {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    /// Left and right margin.
    pub margin_x_mm: f32,
    /// Top and bottom margin.
    pub margin_y_mm: f32,
    /// Top edge of the label cell.
    pub label_top_mm: f32,
    pub label_height_mm: f32,
    pub label_font_size_pt: f32,
    /// Top edge of the image.
    pub image_top_mm: f32,
}

impl Default for GalleryLayout {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_x_mm: 10.0,
            margin_y_mm: 15.0,
            label_top_mm: 10.0,
            label_height_mm: 10.0,
            label_font_size_pt: 12.0,
            image_top_mm: 30.0,
        }
    }
}

impl GalleryLayout {
    /// Widest an image may be rendered: page width minus both side margins.
    pub fn max_width(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_x_mm
    }

    /// Tallest an image may be rendered: page height minus top and bottom margins.
    pub fn max_height(&self) -> f32 {
        self.page_height_mm - 2.0 * self.margin_y_mm
    }

    fn validate(&self) -> Result<(), Epub2PdfError> {
        let all = [
            self.page_width_mm,
            self.page_height_mm,
            self.margin_x_mm,
            self.margin_y_mm,
            self.label_top_mm,
            self.label_height_mm,
            self.label_font_size_pt,
            self.image_top_mm,
        ];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Epub2PdfError::InvalidConfig(
                "Gallery geometry must be finite and non-negative".into(),
            ));
        }
        if self.max_width() <= 0.0 || self.max_height() <= 0.0 {
            return Err(Epub2PdfError::InvalidConfig(format!(
                "Gallery margins leave no room for images ({}x{} mm)",
                self.max_width(),
                self.max_height()
            )));
        }
        Ok(())
    }
}
