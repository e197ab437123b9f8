//! Builders for synthetic EPUBs and images shared by the integration tests.

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// One manifest entry of a synthetic book.
pub struct Entry {
    pub href: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl Entry {
    pub fn doc(href: &str, body: &str) -> Self {
        Self {
            href: href.into(),
            media_type: "application/xhtml+xml".into(),
            content: format!("<html><body>{body}</body></html>").into_bytes(),
        }
    }

    pub fn image(href: &str, media_type: &str, content: Vec<u8>) -> Self {
        Self {
            href: href.into(),
            media_type: media_type.into(),
            content,
        }
    }

    pub fn css(href: &str, css: &str) -> Self {
        Self {
            href: href.into(),
            media_type: "text/css".into(),
            content: css.as_bytes().to_vec(),
        }
    }
}

/// Build an EPUB whose OPF lives at `OEBPS/content.opf`.
pub fn epub_bytes(title: &str, entries: &[Entry]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default();

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(
        br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
    )
    .unwrap();

    let mut manifest = String::new();
    for (i, e) in entries.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"i{i}\" href=\"{}\" media-type=\"{}\"/>\n",
            e.href, e.media_type
        ));
    }
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>Test Author</dc:creator>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine/>
</package>"#
    );
    zip.start_file("OEBPS/content.opf", deflated).unwrap();
    zip.write_all(opf.as_bytes()).unwrap();

    for e in entries {
        zip.start_file(format!("OEBPS/{}", e.href), deflated).unwrap();
        zip.write_all(&e.content).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_epub(dir: &Path, name: &str, title: &str, entries: &[Entry]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, epub_bytes(title, entries)).unwrap();
    path
}

pub fn encoded_image(w: u32, h: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([40, 90, 160])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn png(w: u32, h: u32) -> Vec<u8> {
    encoded_image(w, h, ImageFormat::Png)
}

pub fn jpeg(w: u32, h: u32) -> Vec<u8> {
    encoded_image(w, h, ImageFormat::Jpeg)
}

/// PNG signature followed by garbage.
pub fn corrupt_png() -> Vec<u8> {
    b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDRbroken".to_vec()
}

pub fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Entries left in a directory.
pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}
