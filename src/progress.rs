//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! stage transitions and per-image gallery events as they happen.
//!
//! # Example
//!
//! ```rust
//! use epub2pdf::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     placed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_image_placed(&self, number: usize, total: usize) {
//!         self.placed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Bild {}/{} placed", number, total);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { placed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::Stage;
use std::sync::Arc;

/// Called by the conversion pipeline as it advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, but the trait is
/// `Send + Sync` so one callback can be shared across runs on several
/// threads.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called when the orchestrator enters a new stage.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once before the first gallery page is built.
    ///
    /// # Arguments
    /// * `total_images` — number of extracted images that will be attempted
    fn on_conversion_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called when an image was placed on its own gallery page.
    ///
    /// # Arguments
    /// * `number` — 1-indexed position in the image list (the "Bild" number)
    /// * `total`  — total images attempted
    fn on_image_placed(&self, number: usize, total: usize) {
        let _ = (number, total);
    }

    /// Called when an image is skipped because it could not be decoded.
    fn on_image_skipped(&self, number: usize, total: usize, error: &str) {
        let _ = (number, total, error);
    }

    /// Called once after every image has been attempted.
    ///
    /// # Arguments
    /// * `total_images` — images attempted
    /// * `placed`       — images that produced a gallery page
    fn on_conversion_complete(&self, total_images: usize, placed: usize) {
        let _ = (total_images, placed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
