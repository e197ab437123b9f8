//! End-to-end integration tests for epub2pdf.
//!
//! Most tests drive the whole pipeline with a fake renderer that records
//! the intermediate HTML and writes a stub PDF, so they need nothing
//! installed. The tests at the bottom run the real `wkhtmltopdf` and are
//! gated behind the `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

mod common;

use common::{corrupt_png, count, dir_entries, jpeg, png, write_epub, Entry};
use epub2pdf::{
    convert, convert_bytes, convert_with_renderer, inspect, ConversionConfig, ConversionProgressCallback,
    Epub2PdfError, HtmlToPdf, ItemError, RenderOptions, Stage,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Renderer stand-in: captures the HTML it was given and its location.
#[derive(Default)]
struct FakeRenderer {
    fail: bool,
    html: Mutex<Option<String>>,
    html_path: Mutex<Option<PathBuf>>,
}

impl HtmlToPdf for FakeRenderer {
    fn render(&self, html: &Path, output: &Path, _options: &RenderOptions) -> Result<(), Epub2PdfError> {
        *self.html.lock().unwrap() = Some(std::fs::read_to_string(html).unwrap());
        *self.html_path.lock().unwrap() = Some(html.to_path_buf());
        if self.fail {
            return Err(Epub2PdfError::RenderFailed {
                status: "exit status: 1".into(),
                stderr: "simulated failure".into(),
            });
        }
        std::fs::write(output, b"%PDF-1.4\n% fake\n").unwrap();
        Ok(())
    }
}

#[derive(Default)]
struct StageRecorder(Mutex<Vec<Stage>>);

impl ConversionProgressCallback for StageRecorder {
    fn on_stage(&self, stage: Stage) {
        self.0.lock().unwrap().push(stage);
    }
}

fn sample_book(dir: &Path) -> PathBuf {
    write_epub(
        dir,
        "book.epub",
        "Sample",
        &[
            Entry::doc(
                "Text/ch1.xhtml",
                r#"<h1>Eins</h1><img src="../Images/landscape.png" alt="L"/><p>Text</p>"#,
            ),
            Entry::doc(
                "Text/ch2.xhtml",
                r#"<p>Zwei</p><img class="x" src='../Images/photo.jpg'><img src="../Images/broken.png"><img src="missing.png">"#,
            ),
            Entry::image("Images/landscape.png", "image/png", png(400, 200)),
            Entry::image("Images/photo.jpg", "image/jpeg", jpeg(200, 400)),
            Entry::image("Images/broken.png", "image/png", corrupt_png()),
            Entry::css("Styles/book.css", "body { font-family: serif }"),
        ],
    )
}

fn config_in(scratch: &Path) -> ConversionConfig {
    ConversionConfig::builder().scratch_parent(scratch).build().unwrap()
}

// ── Fake-renderer pipeline tests ─────────────────────────────────────────────

#[test]
fn full_conversion_with_fake_renderer() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let input = sample_book(dir.path());
    let output = dir.path().join("book.pdf");
    let renderer = FakeRenderer::default();

    let report = convert_with_renderer(&input, &output, &config_in(scratch.path()), &renderer).unwrap();

    // Primary HTML: both documents in manifest order, three placeholders,
    // the unknown image left as it was.
    let html = renderer.html.lock().unwrap().clone().unwrap();
    let eins = html.find("<h1>Eins</h1>").unwrap();
    let zwei = html.find("<p>Zwei</p>").unwrap();
    assert!(eins < zwei);
    assert!(html.contains("[Bild 1 - Siehe Bildanhang]"));
    assert!(html.contains("[Bild 2 - Siehe Bildanhang]"));
    assert!(html.contains("[Bild 3 - Siehe Bildanhang]"));
    assert!(html.contains(r#"<img src="missing.png">"#));
    assert_eq!(report.stats.placeholders, 3);
    assert_eq!(report.stats.unresolved_tags, 1);
    assert_eq!(report.stats.documents, 2);
    assert_eq!(report.stats.resources_written, 4);

    // Gallery: image 3 is corrupt, so pages are 1 and 2.
    let gallery_path = dir.path().join("book_images.pdf");
    assert_eq!(report.gallery_pdf, gallery_path);
    let gallery = std::fs::read(&gallery_path).unwrap();
    assert!(gallery.starts_with(b"%PDF-"));
    assert_eq!(count(&gallery, b"/Count 2"), 1);
    let numbers: Vec<usize> = report.gallery.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(report.stats.images_found, 3);
    assert_eq!(report.stats.images_placed, 2);
    assert!(matches!(
        report.skipped.as_slice(),
        [ItemError::ImageDecodeFailed { number: 3, .. }]
    ));

    let names: Vec<&str> = report.images.iter().map(|i| i.file_name.as_str()).collect();
    assert_eq!(names, vec!["landscape.png", "photo.jpg", "broken.png"]);

    assert!(output.exists());
    assert!(dir_entries(scratch.path()).is_empty(), "scratch space left behind");
}

/// Renderer that resolves a relative link against the HTML it receives.
struct LinkResolver {
    href: &'static str,
    resolved: Mutex<Option<bool>>,
}

impl HtmlToPdf for LinkResolver {
    fn render(&self, html: &Path, output: &Path, _options: &RenderOptions) -> Result<(), Epub2PdfError> {
        let target = html.parent().unwrap().join(self.href);
        *self.resolved.lock().unwrap() = Some(target.is_file());
        std::fs::write(output, b"%PDF-1.4\n").unwrap();
        Ok(())
    }
}

#[test]
fn relative_stylesheet_links_resolve_from_the_intermediate_html() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let input = write_epub(
        dir.path(),
        "styled.epub",
        "Styled",
        &[
            Entry::doc(
                "Text/ch1.xhtml",
                r#"<link rel="stylesheet" href="../Styles/book.css"/><p>Eins</p>"#,
            ),
            Entry::css("Styles/book.css", "p { color: navy }"),
        ],
    );
    let renderer = LinkResolver {
        href: "../Styles/book.css",
        resolved: Mutex::new(None),
    };

    convert_with_renderer(&input, dir.path().join("styled.pdf"), &config_in(scratch.path()), &renderer).unwrap();

    assert_eq!(*renderer.resolved.lock().unwrap(), Some(true));
    assert!(dir_entries(scratch.path()).is_empty());
}

#[test]
fn render_failure_cleans_up_and_writes_no_gallery() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let input = sample_book(dir.path());
    let output = dir.path().join("book.pdf");
    let renderer = FakeRenderer {
        fail: true,
        ..Default::default()
    };

    let err = convert_with_renderer(&input, &output, &config_in(scratch.path()), &renderer).unwrap_err();
    assert!(matches!(err, Epub2PdfError::RenderFailed { .. }));

    let html_path = renderer.html_path.lock().unwrap().clone().unwrap();
    assert!(html_path.starts_with(scratch.path()));
    assert!(!html_path.exists(), "intermediate HTML left behind");
    assert!(dir_entries(scratch.path()).is_empty());
    assert!(!dir.path().join("book_images.pdf").exists());
}

#[test]
fn stages_are_reported_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_book(dir.path());
    let recorder = Arc::new(StageRecorder::default());
    let config = ConversionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    convert_with_renderer(&input, dir.path().join("o.pdf"), &config, &FakeRenderer::default()).unwrap();

    assert_eq!(
        *recorder.0.lock().unwrap(),
        vec![
            Stage::Init,
            Stage::ExtractResources,
            Stage::MapImages,
            Stage::BuildHtml,
            Stage::WriteTempHtml,
            Stage::RenderPrimaryPdf,
            Stage::RenderGalleryPdf,
            Stage::Cleanup,
            Stage::Done,
        ]
    );
}

#[test]
fn failed_run_still_enters_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_book(dir.path());
    let recorder = Arc::new(StageRecorder::default());
    let config = ConversionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let renderer = FakeRenderer {
        fail: true,
        ..Default::default()
    };

    assert!(convert_with_renderer(&input, dir.path().join("o.pdf"), &config, &renderer).is_err());
    let stages = recorder.0.lock().unwrap().clone();
    assert_eq!(stages.last(), Some(&Stage::Cleanup));
    assert!(!stages.contains(&Stage::RenderGalleryPdf));
}

#[test]
fn filename_collision_last_wins() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_epub(
        dir.path(),
        "dup.epub",
        "Dup",
        &[
            Entry::doc("a.xhtml", r#"<img src="one/fig.png"><img src="two/fig.png">"#),
            Entry::image("one/fig.png", "image/png", png(10, 10)),
            Entry::image("two/fig.png", "image/png", png(20, 10)),
        ],
    );
    let renderer = FakeRenderer::default();
    let report = convert_with_renderer(
        &input,
        dir.path().join("dup.pdf"),
        &ConversionConfig::default(),
        &renderer,
    )
    .unwrap();

    let html = renderer.html.lock().unwrap().clone().unwrap();
    assert_eq!(html.matches("[Bild 2 - Siehe Bildanhang]").count(), 2);
    assert!(!html.contains("[Bild 1 "));
    assert_eq!(report.collisions, vec!["fig.png".to_string()]);
    // Both images still get their own gallery page.
    assert_eq!(report.gallery.len(), 2);
    assert!(!report.is_clean());
}

#[test]
fn book_without_images_gets_empty_gallery() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_epub(dir.path(), "plain.epub", "Plain", &[Entry::doc("a.xhtml", "<p>Nur Text</p>")]);
    let output = dir.path().join("plain.pdf");
    let report =
        convert_with_renderer(&input, &output, &ConversionConfig::default(), &FakeRenderer::default()).unwrap();

    assert!(report.images.is_empty());
    let gallery = std::fs::read(dir.path().join("plain_images.pdf")).unwrap();
    assert_eq!(count(&gallery, b"/Count 0"), 1);
    assert!(report.is_clean());
}

#[test]
fn custom_labels_flow_into_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_epub(
        dir.path(),
        "en.epub",
        "English",
        &[
            Entry::doc("a.xhtml", r#"<img src="pic.png">"#),
            Entry::image("pic.png", "image/png", png(8, 8)),
        ],
    );
    let config = ConversionConfig::builder()
        .label_prefix("Figure")
        .placeholder_note("see image appendix")
        .gallery_suffix("-figures")
        .build()
        .unwrap();
    let renderer = FakeRenderer::default();
    let report = convert_with_renderer(&input, dir.path().join("en.pdf"), &config, &renderer).unwrap();

    let html = renderer.html.lock().unwrap().clone().unwrap();
    assert!(html.contains("[Figure 1 - see image appendix]"));
    assert_eq!(report.gallery_pdf, dir.path().join("en-figures.pdf"));
    assert!(report.gallery_pdf.exists());
}

#[test]
fn not_an_epub_is_rejected_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fake.epub");
    std::fs::write(&input, b"%PDF-1.7 definitely not a zip").unwrap();
    let output = dir.path().join("fake.pdf");

    let err = convert_with_renderer(&input, &output, &ConversionConfig::default(), &FakeRenderer::default())
        .unwrap_err();
    assert!(matches!(err, Epub2PdfError::NotAnEpub { .. }));
    assert!(!output.exists());
    assert!(!dir.path().join("fake_images.pdf").exists());
}

#[test]
fn inspect_reports_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_book(dir.path());
    let summary = inspect(&input).unwrap();
    assert_eq!(summary.title.as_deref(), Some("Sample"));
    assert_eq!(summary.creators, vec!["Test Author"]);
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.images, 3);
    assert_eq!(summary.styles, 1);
}

#[cfg(unix)]
#[test]
fn convert_bytes_with_noop_renderer() {
    // `true` accepts any arguments and succeeds without writing anything.
    let noop = Path::new("/bin/true");
    if !noop.exists() {
        println!("SKIP — /bin/true not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let bytes = std::fs::read(sample_book(dir.path())).unwrap();
    let output = dir.path().join("mem.pdf");
    let config = ConversionConfig::builder().renderer_path(noop).build().unwrap();

    let report = convert_bytes(&bytes, &output, &config).unwrap();
    assert_eq!(report.gallery.len(), 2);
    assert!(dir.path().join("mem_images.pdf").exists());
    assert!(!report.input.exists(), "temporary input not removed");
}

// ── Real renderer (E2E_ENABLED) ──────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

#[test]
fn e2e_real_wkhtmltopdf() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let input = sample_book(dir.path());
    let output = dir.path().join("book.pdf");

    let report = convert(&input, &output, &ConversionConfig::default()).unwrap();

    let pdf = std::fs::read(&output).unwrap();
    assert!(pdf.starts_with(b"%PDF-"), "primary output is not a PDF");
    assert!(report.stats.render_duration_ms > 0 || pdf.len() > 100);
    assert_eq!(report.gallery.len(), 2);
}
