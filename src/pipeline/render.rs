//! Primary PDF rendering: hand the rewritten HTML to an HTML→PDF engine.
//!
//! The engine sits behind the [`HtmlToPdf`] trait. The production
//! implementation, [`WkHtmlToPdf`], runs the `wkhtmltopdf` executable as a
//! child process and waits for it; tests substitute their own.

use crate::config::RenderOptions;
use crate::error::Epub2PdfError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Renders an HTML file on disk into a PDF file.
pub trait HtmlToPdf: Send + Sync {
    fn render(&self, html: &Path, output: &Path, options: &RenderOptions) -> Result<(), Epub2PdfError>;
}

/// `wkhtmltopdf` child-process renderer.
#[derive(Debug, Clone)]
pub struct WkHtmlToPdf {
    program: PathBuf,
}

impl WkHtmlToPdf {
    /// Use an explicit executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find the executable via `WKHTMLTOPDF_PATH`, `PATH`, then the
    /// platform's usual install directories.
    pub fn locate() -> Result<Self, Epub2PdfError> {
        let program = wkhtmltopdf_locate::locate_wkhtmltopdf()
            .map_err(|e| Epub2PdfError::RendererNotFound(e.to_string()))?;
        Ok(Self::new(program))
    }

    /// `new` when a path is given, `locate` otherwise.
    pub fn from_config(path: Option<&Path>) -> Result<Self, Epub2PdfError> {
        match path {
            Some(p) => Ok(Self::new(p)),
            None => Self::locate(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl HtmlToPdf for WkHtmlToPdf {
    fn render(&self, html: &Path, output: &Path, options: &RenderOptions) -> Result<(), Epub2PdfError> {
        let args = wkhtmltopdf_args(options, html, output);
        debug!("Running {} {:?}", self.program.display(), args);

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| Epub2PdfError::RendererSpawnFailed {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(Epub2PdfError::RenderFailed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        info!("Primary PDF written: {}", output.display());
        Ok(())
    }
}

/// Command line for one render, options first, then input and output.
pub fn wkhtmltopdf_args(options: &RenderOptions, html: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |s: &str| args.push(s.into());

    if options.quiet {
        push("--quiet");
    }
    if options.enable_local_file_access {
        push("--enable-local-file-access");
    }
    if options.ignore_media_errors {
        push("--load-media-error-handling");
        push("ignore");
    }
    if options.disable_smart_shrinking {
        push("--disable-smart-shrinking");
    }
    for (flag, mm) in [
        ("--margin-top", options.margin_top_mm),
        ("--margin-bottom", options.margin_bottom_mm),
        ("--margin-left", options.margin_left_mm),
        ("--margin-right", options.margin_right_mm),
    ] {
        push(flag);
        push(&format!("{mm}mm"));
    }
    push("--encoding");
    push(&options.encoding);
    push("--page-size");
    push(&options.page_size);

    args.push(html.as_os_str().to_owned());
    args.push(output.as_os_str().to_owned());
    args
}
