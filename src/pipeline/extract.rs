//! Resource extraction: write images, stylesheets and scripts into the
//! scratch space so the renderer can load them by relative path.

use crate::error::ItemError;
use crate::pipeline::epub::{EpubItem, ItemKind};
use crate::pipeline::scratch::ScratchSpace;
use std::path::PathBuf;
use tracing::{debug, error};

/// An image written to disk, in extraction order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedImage {
    pub path: PathBuf,
    /// Manifest name inside the EPUB.
    pub item_name: String,
}

#[derive(Debug, Default)]
pub struct ExtractedResources {
    pub images: Vec<ExtractedImage>,
    /// Resources of any extracted kind successfully written.
    pub written: usize,
    pub skipped: Vec<ItemError>,
}

/// Write every image, style and script item to `scratch`.
///
/// A failing item is logged and recorded; extraction continues.
pub fn extract_resources<'a>(
    items: impl IntoIterator<Item = &'a EpubItem>,
    scratch: &ScratchSpace,
) -> ExtractedResources {
    let mut out = ExtractedResources::default();

    for item in items.into_iter().filter(|i| i.kind.is_extracted()) {
        match write_item(item, scratch) {
            Ok(path) => {
                debug!("Extracted {} ({} bytes)", item.name, item.content.len());
                out.written += 1;
                if item.kind == ItemKind::Image {
                    out.images.push(ExtractedImage {
                        path,
                        item_name: item.name.clone(),
                    });
                }
            }
            Err(e) => {
                error!("{}", e);
                out.skipped.push(e);
            }
        }
    }

    out
}

fn write_item(item: &EpubItem, scratch: &ScratchSpace) -> Result<PathBuf, ItemError> {
    let path = scratch.resource_path(&item.name)?;
    let failed = |e: std::io::Error| ItemError::ResourceWriteFailed {
        name: item.name.clone(),
        detail: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(failed)?;
    }
    std::fs::write(&path, &item.content).map_err(failed)?;
    Ok(path)
}
