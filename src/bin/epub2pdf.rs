//! CLI binary for epub2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, sets up logging and prints the result.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use epub2pdf::{
    convert, inspect, ConversionConfig, ConversionProgressCallback, ConversionReport, ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the book is prepared and rendered, then a bar counting
/// gallery pages.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening EPUB…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        match stage {
            Stage::Cleanup | Stage::Done => self.bar.finish_and_clear(),
            Stage::RenderPrimaryPdf => {
                self.bar.set_prefix("Rendering");
                self.bar.set_message("wkhtmltopdf…");
            }
            other => self.bar.set_message(other.to_string()),
        }
    }

    fn on_conversion_start(&self, total_images: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} images  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_images as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Gallery");
    }

    fn on_image_placed(&self, _number: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn on_image_skipped(&self, number: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Bild {:>3}/{:<3}  {}",
            red("✗"),
            number,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert, writing book.pdf and book_images.pdf
  epub2pdf book.epub book.pdf

  # Use a specific wkhtmltopdf binary
  epub2pdf --wkhtmltopdf /opt/wkhtmltox/bin/wkhtmltopdf book.epub book.pdf

  # Inspect EPUB metadata (no renderer needed)
  epub2pdf --inspect-only book.epub

  # Machine-readable report
  epub2pdf --json book.epub book.pdf > report.json

OUTPUT:
  <OUTPUT>              The book's text; every image is replaced by
                        "[Bild N - Siehe Bildanhang]".
  <OUTPUT stem>_images.pdf
                        One A4 page per image, labelled "Bild N".

ENVIRONMENT VARIABLES:
  WKHTMLTOPDF_PATH      Path to the wkhtmltopdf executable
  RUST_LOG              Log filter for stderr (e.g. epub2pdf=debug)
"#;

/// Convert EPUB books to PDF, with images collected in a separate gallery PDF.
#[derive(Parser, Debug)]
#[command(
    name = "epub2pdf",
    version,
    about = "Convert an EPUB to a text PDF plus an image gallery PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// EPUB file to convert.
    input: PathBuf,

    /// PDF to write. The gallery goes next to it as <stem>_images.pdf.
    #[arg(required_unless_present = "inspect_only")]
    output: Option<PathBuf>,

    /// Append log lines to this file.
    #[arg(long, env = "EPUB2PDF_LOG_FILE", default_value = "conversion.log")]
    log_file: PathBuf,

    /// wkhtmltopdf executable. Searched on PATH when not set.
    #[arg(long, env = "WKHTMLTOPDF_PATH")]
    wkhtmltopdf: Option<PathBuf>,

    /// Create the temporary working directory here instead of the system temp dir.
    #[arg(long, env = "EPUB2PDF_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Print the conversion report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Print EPUB metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "EPUB2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EPUB2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EPUB2PDF_QUIET")]
    quiet: bool,
}

/// Missing or surplus positionals. These print the bare usage line on
/// stdout; every other parse error goes through clap's own reporting.
fn is_arity_error(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            | ErrorKind::MissingRequiredArgument
            | ErrorKind::UnknownArgument
    )
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if is_arity_error(e.kind()) => {
            println!("{}", Cli::command().render_usage());
            std::process::exit(2);
        }
        Err(e) => e.exit(),
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // The log file is opened only once the arguments are known to be valid.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let stderr_level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    let file_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cli.log_file)
        .with_context(|| format!("Failed to open log file {}", cli.log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(stderr_level))),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_filter(file_level),
        )
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let summary = inspect(&cli.input).context("Failed to inspect EPUB")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = summary.title {
                println!("Title:        {}", t);
            }
            if !summary.creators.is_empty() {
                println!("Creators:     {}", summary.creators.join(", "));
            }
            println!("Documents:    {}", summary.documents);
            println!("Images:       {}", summary.images);
            println!("Stylesheets:  {}", summary.styles);
            println!("Scripts:      {}", summary.scripts);
            println!("Other items:  {}", summary.other);
        }
        return Ok(());
    }

    let output = cli
        .output
        .clone()
        .context("An output PDF path is required")?;

    if let (true, Some(exe)) = (cli.verbose, cli.wkhtmltopdf.as_ref()) {
        match wkhtmltopdf_locate::probe_version(exe) {
            Ok(v) => debug!("Renderer version: {}", v),
            Err(e) => debug!("Could not query renderer version: {}", e),
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let report = convert(&cli.input, &output, &config).context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder();
    if let Some(ref exe) = cli.wkhtmltopdf {
        builder = builder.renderer_path(exe);
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_parent(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

fn print_summary(report: &ConversionReport) {
    let s = &report.stats;
    let tick = if report.is_clean() { green("✔") } else { red("⚠") };
    eprintln!(
        "{}  {}  {}",
        tick,
        bold(&report.primary_pdf.display().to_string()),
        dim(&format!("{} placeholder(s), {}ms", s.placeholders, s.total_duration_ms)),
    );
    eprintln!(
        "   {}  {}",
        bold(&report.gallery_pdf.display().to_string()),
        dim(&format!("{}/{} image(s)", s.images_placed, s.images_found)),
    );
    for name in &report.collisions {
        eprintln!("   {} filename '{}' used by several images", red("⚠"), name);
    }
    for skip in &report.skipped {
        eprintln!("   {} {}", red("✗"), skip);
    }
}
