//! Pipeline stages for EPUB-to-PDF conversion.
//!
//! Each submodule implements one step; [`crate::convert`] runs them in order
//! and owns the [`scratch::ScratchSpace`] they share.
//!
//! ## Data Flow
//!
//! ```text
//!                    ┌─▶ extract ─▶ mapping ─┐
//! input ─▶ epub ─────┤                       ├─▶ rewrite ─▶ render   (primary PDF)
//!                    └─▶ documents ──────────┘
//!                              extract ─▶ layout ─▶ gallery          (image PDF)
//! ```
//!
//! 1. [`input`]   — check the path exists and starts with the ZIP magic
//! 2. [`epub`]    — container.xml → OPF → manifest items with their bytes
//! 3. [`extract`] — write images, styles and scripts into the [`scratch`] dir
//! 4. [`mapping`] — base filename → 1-based image number
//! 5. [`rewrite`] — swap `<img>` tags for numbered placeholder blocks
//! 6. [`render`]  — HTML → PDF through an external `wkhtmltopdf` process
//! 7. [`layout`]  — fit each image into the printable box
//! 8. [`gallery`] — one labelled page per image, written with `pdf-writer`

pub mod epub;
pub mod extract;
pub mod gallery;
pub mod input;
pub mod layout;
pub mod mapping;
pub mod render;
pub mod rewrite;
pub mod scratch;
