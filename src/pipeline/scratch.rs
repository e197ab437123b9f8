//! Per-run scratch directory.
//!
//! Every extracted resource and the intermediate HTML live under one
//! uniquely named temporary directory. Dropping the [`ScratchSpace`] removes
//! it, so cleanup also happens when a stage returns early or panics;
//! [`ScratchSpace::close`] does the same but reports the outcome.

use crate::error::{Epub2PdfError, ItemError};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const PREFIX: &str = "epub2pdf-";
const HTML_FILE: &str = "book.html";

#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Create a fresh directory under `parent`, or the system temp dir.
    pub fn new(parent: Option<&Path>) -> Result<Self, Epub2PdfError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match parent {
            Some(p) => builder.tempdir_in(p),
            None => builder.tempdir(),
        }
        .map_err(|source| Epub2PdfError::ScratchSetup { source })?;

        debug!("Scratch directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Where the concatenated, rewritten HTML is written.
    ///
    /// The file goes into the directory of `document` (normally the first
    /// content document), mirrored inside the scratch space, so the book's
    /// relative links such as `../Styles/book.css` reach the extracted
    /// resources. Falls back to the root for top-level or unsafe names.
    pub fn html_path(&self, document: Option<&str>) -> PathBuf {
        let dir = document
            .and_then(|name| Path::new(name).parent())
            .filter(|parent| !parent.as_os_str().is_empty())
            .and_then(|parent| self.resource_path(&parent.to_string_lossy()).ok())
            .unwrap_or_else(|| self.root().to_path_buf());
        dir.join(HTML_FILE)
    }

    /// Map an item name onto a path inside the scratch directory.
    ///
    /// Absolute names, `..` components and names that would collide with
    /// the intermediate HTML are rejected.
    pub fn resource_path(&self, name: &str) -> Result<PathBuf, ItemError> {
        let unsafe_path = || ItemError::UnsafeResourcePath {
            name: name.to_string(),
        };

        let rel = Path::new(name);
        if name.is_empty() || rel == Path::new(HTML_FILE) {
            return Err(unsafe_path());
        }

        let mut out = self.root().to_path_buf();
        let mut pushed = false;
        for component in rel.components() {
            match component {
                Component::Normal(part) => {
                    out.push(part);
                    pushed = true;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(unsafe_path());
                }
            }
        }
        if !pushed {
            return Err(unsafe_path());
        }
        Ok(out)
    }

    /// Remove the directory and everything in it.
    pub fn close(self) -> std::io::Result<()> {
        let path = self.root().to_path_buf();
        self.dir.close()?;
        debug!("Removed scratch directory {}", path.display());
        Ok(())
    }
}
