//! Input validation: make sure the user-supplied path is a readable ZIP file.
//!
//! Checking the `PK\x03\x04` local-file-header magic up front turns "I passed
//! the PDF by mistake" into a clear [`Epub2PdfError::NotAnEpub`] instead of a
//! ZIP parser error from deep inside the reader.

use crate::error::Epub2PdfError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// ZIP local file header signature.
pub const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Validate that `path` exists, is readable, and starts with the ZIP magic.
pub fn resolve_local(path: &Path) -> Result<PathBuf, Epub2PdfError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(Epub2PdfError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || magic != ZIP_MAGIC {
                return Err(Epub2PdfError::NotAnEpub { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Epub2PdfError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Epub2PdfError::FileNotFound { path });
        }
    }

    debug!("Resolved local EPUB: {}", path.display());
    Ok(path)
}
