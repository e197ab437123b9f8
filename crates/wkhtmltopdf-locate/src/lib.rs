//! # wkhtmltopdf-locate
//!
//! Find the [wkhtmltopdf](https://wkhtmltopdf.org/) executable so callers can
//! spawn it without asking users to fiddle with `PATH`.
//!
//! ## How it works
//!
//! On the first call to [`locate_wkhtmltopdf`]:
//!
//! 1. `WKHTMLTOPDF_PATH` — if set and pointing at an executable file, use it.
//! 2. Every directory on `PATH`, in order.
//! 3. The platform's usual install locations (Homebrew, `/usr/local/bin`,
//!    `C:\Program Files\wkhtmltopdf\bin`, …).
//!
//! The first hit is cached for the lifetime of the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wkhtmltopdf_locate::{locate_wkhtmltopdf, probe_version};
//!
//! let exe = locate_wkhtmltopdf().expect("wkhtmltopdf not installed");
//! println!("{} ({})", exe.display(), probe_version(&exe).unwrap_or_default());
//! ```
//!
//! ## Platform support
//!
//! | OS      | Executable          | Default locations searched                       |
//! |---------|---------------------|--------------------------------------------------|
//! | macOS   | `wkhtmltopdf`       | `/usr/local/bin`, `/opt/homebrew/bin`            |
//! | Linux   | `wkhtmltopdf`       | `/usr/local/bin`, `/usr/bin`                     |
//! | Windows | `wkhtmltopdf.exe`   | `C:\Program Files\wkhtmltopdf\bin` (+ x86)       |
//!
//! ## Environment variable overrides
//!
//! - `WKHTMLTOPDF_PATH` — path to an existing wkhtmltopdf executable.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable that short-circuits the search.
pub const ENV_OVERRIDE: &str = "WKHTMLTOPDF_PATH";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by wkhtmltopdf-locate operations.
#[derive(Error, Debug)]
pub enum LocateError {
    /// `WKHTMLTOPDF_PATH` is set but does not point at an executable file.
    #[error("{ENV_OVERRIDE} is set to '{path}', which is not an executable file")]
    BadOverride { path: PathBuf },

    /// Nothing was found on `PATH` or in the platform install locations.
    #[error(
        "wkhtmltopdf not found (searched {searched} locations).\n\
Install it from https://wkhtmltopdf.org/downloads.html or set {ENV_OVERRIDE}."
    )]
    NotFound { searched: usize },

    /// The executable exists but could not be started.
    #[error("Failed to run '{path}': {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

struct PlatformInfo {
    /// File name of the executable, e.g. `wkhtmltopdf.exe`.
    exe_name: &'static str,
    /// Directories the official installers and package managers use.
    install_dirs: &'static [&'static str],
}

fn detect_platform() -> PlatformInfo {
    match std::env::consts::OS {
        "macos" => PlatformInfo {
            exe_name: "wkhtmltopdf",
            install_dirs: &["/usr/local/bin", "/opt/homebrew/bin"],
        },
        "windows" => PlatformInfo {
            exe_name: "wkhtmltopdf.exe",
            install_dirs: &[
                r"C:\Program Files\wkhtmltopdf\bin",
                r"C:\Program Files (x86)\wkhtmltopdf\bin",
            ],
        },
        _ => PlatformInfo {
            exe_name: "wkhtmltopdf",
            install_dirs: &["/usr/local/bin", "/usr/bin"],
        },
    }
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns the wkhtmltopdf executable, searching on first use and caching
/// the result for the rest of the process.
///
/// Safe to call from multiple threads; concurrent first calls may both
/// search, but they resolve to the same path.
pub fn locate_wkhtmltopdf() -> Result<PathBuf, LocateError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = search(
        std::env::var_os(ENV_OVERRIDE).as_deref(),
        std::env::var_os("PATH").as_deref(),
    )?;

    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Uncached search with explicit inputs.
///
/// `override_path` plays the role of `WKHTMLTOPDF_PATH`, `path_var` the role
/// of `PATH`. An override that is set but invalid is an error rather than a
/// silent fall-through, so a typo does not pick up some other installation.
pub fn search(
    override_path: Option<&OsStr>,
    path_var: Option<&OsStr>,
) -> Result<PathBuf, LocateError> {
    if let Some(raw) = override_path.filter(|p| !p.is_empty()) {
        let p = PathBuf::from(raw);
        if is_executable(&p) {
            return Ok(p);
        }
        return Err(LocateError::BadOverride { path: p });
    }

    let candidates = candidate_paths(path_var);
    let searched = candidates.len();
    candidates
        .into_iter()
        .find(|p| is_executable(p))
        .ok_or(LocateError::NotFound { searched })
}

/// Returns the first line of `wkhtmltopdf --version`, e.g.
/// `wkhtmltopdf 0.12.6 (with patched qt)`.
pub fn probe_version(exe: &Path) -> Result<String, LocateError> {
    let output = Command::new(exe)
        .arg("--version")
        .output()
        .map_err(|e| LocateError::Spawn {
            path: exe.to_path_buf(),
            source: e,
        })?;

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_string())
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn candidate_paths(path_var: Option<&OsStr>) -> Vec<PathBuf> {
    let info = detect_platform();
    let mut out: Vec<PathBuf> = path_var
        .map(|v| std::env::split_paths(v).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(info.exe_name))
        .collect();

    for dir in info.install_dirs {
        let p = Path::new(dir).join(info.exe_name);
        if !out.contains(&p) {
            out.push(p);
        }
    }
    out
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
