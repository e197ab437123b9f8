//! Image gallery PDF: one A4 page per extracted image.
//!
//! Every page carries a bold, centred "Bild N" label near the top edge and
//! the image below it, scaled by [`fit_image`] into the printable box and
//! centred horizontally. `N` is the image's position in extraction order, so
//! an image that cannot be decoded leaves a gap in the numbering rather
//! than shifting every later page; the placeholders in the primary PDF keep
//! pointing at the right picture.
//!
//! ## Embedding
//!
//! Baseline JPEGs in grey or RGB are copied into the PDF unchanged with
//! `DCTDecode`. Everything else is decoded, flattened to 8-bit RGB and
//! Flate-compressed; a non-opaque alpha channel becomes a separate soft mask.
//! Images are always fully decoded first, so a truncated JPEG is rejected
//! here instead of producing a broken page.

use crate::config::GalleryLayout;
use crate::error::{Epub2PdfError, ItemError};
use crate::output::GalleryPage;
use crate::pipeline::extract::ExtractedImage;
use crate::pipeline::layout::{fit_image, LayoutBox};
use crate::pipeline::mapping::file_name;
use crate::progress::ConversionProgressCallback;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat, ImageReader};
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, error, info};

const MM_TO_PT: f32 = 72.0 / 25.4;
const FONT_NAME: Name<'static> = Name(b"F1");
const IMAGE_NAME: Name<'static> = Name(b"Im1");
/// Helvetica-Bold cap height, in 1/1000 em.
const CAP_HEIGHT: f32 = 718.0;

/// Result of building the gallery document.
#[derive(Debug)]
pub struct Gallery {
    pub pdf: Vec<u8>,
    pub pages: Vec<GalleryPage>,
    pub skipped: Vec<ItemError>,
}

/// Pixels ready to be embedded.
#[derive(Debug)]
pub(crate) enum ImageData {
    Jpeg { bytes: Vec<u8>, gray: bool },
    Raw { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

#[derive(Debug)]
pub(crate) struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub data: ImageData,
}

/// Build the gallery for `images`, numbering pages by list position.
pub fn build_gallery(
    images: &[ExtractedImage],
    layout: &GalleryLayout,
    label_prefix: &str,
    progress: &dyn ConversionProgressCallback,
) -> Gallery {
    let total = images.len();
    progress.on_conversion_start(total);

    let mut pdf = Pdf::new();
    let mut next_id = 1;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };
    let catalog_id = alloc();
    let pages_id = alloc();
    let font_id = alloc();

    pdf.type1_font(font_id)
        .base_font(Name(b"Helvetica-Bold"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    let page_w = layout.page_width_mm * MM_TO_PT;
    let page_h = layout.page_height_mm * MM_TO_PT;

    let mut page_ids = Vec::new();
    let mut pages = Vec::new();
    let mut skipped = Vec::new();

    for (i, image) in images.iter().enumerate() {
        let number = i + 1;
        let name = file_name(&image.path);

        let placed =
            load_image(&image.path, number, &name).and_then(|loaded| place(loaded, layout, number, &name));

        let (loaded, fit) = match placed {
            Ok(v) => v,
            Err(e) => {
                error!("Skipping image {}: {}", number, e);
                progress.on_image_skipped(number, total, &e.to_string());
                skipped.push(e);
                continue;
            }
        };

        let page_id = alloc();
        let content_id = alloc();
        let image_id = alloc();
        let mask_id = match &loaded.data {
            ImageData::Raw { alpha: Some(_), .. } => Some(alloc()),
            _ => None,
        };

        embed_image(&mut pdf, image_id, mask_id, &loaded);

        let label = format!("{label_prefix} {number}");
        let content = page_content(layout, &label, fit);
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&content, 6);
        pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);

        {
            let mut page = pdf.page(page_id);
            page.media_box(Rect::new(0.0, 0.0, page_w, page_h))
                .parent(pages_id)
                .contents(content_id);
            let mut resources = page.resources();
            resources.fonts().pair(FONT_NAME, font_id);
            resources.x_objects().pair(IMAGE_NAME, image_id);
        }

        debug!(
            "Bild {}: {} {}x{} px -> {:.1}x{:.1} mm",
            number, name, loaded.width, loaded.height, fit.width, fit.height
        );
        page_ids.push(page_id);
        pages.push(GalleryPage {
            number,
            file_name: name,
            pixel_width: loaded.width,
            pixel_height: loaded.height,
            width_mm: fit.width,
            height_mm: fit.height,
        });
        progress.on_image_placed(number, total);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    progress.on_conversion_complete(total, pages.len());
    info!(
        "Gallery built: {} page(s), {} image(s) skipped",
        pages.len(),
        skipped.len()
    );

    Gallery {
        pdf: pdf.finish(),
        pages,
        skipped,
    }
}

/// Write the finished gallery document.
pub fn write_gallery(path: &Path, bytes: &[u8]) -> Result<(), Epub2PdfError> {
    std::fs::write(path, bytes).map_err(|source| Epub2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Gallery PDF written: {}", path.display());
    Ok(())
}

/// Fit a decoded image into the printable box.
fn place(
    loaded: LoadedImage,
    layout: &GalleryLayout,
    number: usize,
    name: &str,
) -> Result<(LoadedImage, LayoutBox), ItemError> {
    match fit_image(loaded.width, loaded.height, layout.max_width(), layout.max_height()) {
        Some(fit) => Ok((loaded, fit)),
        None => Err(ItemError::DegenerateImage {
            number,
            file_name: name.to_string(),
            width: loaded.width,
            height: loaded.height,
        }),
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────

pub(crate) fn load_image(path: &Path, number: usize, name: &str) -> Result<LoadedImage, ItemError> {
    let failed = |detail: String| ItemError::ImageDecodeFailed {
        number,
        file_name: name.to_string(),
        detail,
    };

    let bytes = std::fs::read(path).map_err(|e| failed(e.to_string()))?;

    let reader = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|e| failed(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| failed("unrecognised image format".to_string()))?;
    let decoder = reader.into_decoder().map_err(|e| failed(e.to_string()))?;

    let (width, height) = decoder.dimensions();
    if width == 0 || height == 0 {
        return Err(ItemError::DegenerateImage {
            number,
            file_name: name.to_string(),
            width,
            height,
        });
    }
    let original = decoder.original_color_type();
    let decoded = DynamicImage::from_decoder(decoder).map_err(|e| failed(e.to_string()))?;

    let data = match (format, original) {
        (ImageFormat::Jpeg, ExtendedColorType::L8 | ExtendedColorType::Rgb8) => ImageData::Jpeg {
            gray: original == ExtendedColorType::L8,
            bytes,
        },
        _ => {
            let rgba = decoded.to_rgba8();
            let alpha = decoded
                .color()
                .has_alpha()
                .then(|| rgba.pixels().map(|p| p.0[3]).collect::<Vec<u8>>())
                .filter(|a| a.iter().any(|&v| v < 255));
            let rgb = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            ImageData::Raw { rgb, alpha }
        }
    };

    Ok(LoadedImage {
        width,
        height,
        data,
    })
}

// ── PDF objects ──────────────────────────────────────────────────────────

fn embed_image(pdf: &mut Pdf, image_id: Ref, mask_id: Option<Ref>, image: &LoadedImage) {
    let (w, h) = (image.width as i32, image.height as i32);
    match &image.data {
        ImageData::Jpeg { bytes, gray } => {
            let mut xobj = pdf.image_xobject(image_id, bytes);
            xobj.filter(Filter::DctDecode);
            xobj.width(w);
            xobj.height(h);
            if *gray {
                xobj.color_space().device_gray();
            } else {
                xobj.color_space().device_rgb();
            }
            xobj.bits_per_component(8);
        }
        ImageData::Raw { rgb, alpha } => {
            if let (Some(alpha), Some(mask_id)) = (alpha, mask_id) {
                let compressed = miniz_oxide::deflate::compress_to_vec_zlib(alpha, 6);
                let mut mask = pdf.image_xobject(mask_id, &compressed);
                mask.filter(Filter::FlateDecode);
                mask.width(w);
                mask.height(h);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
            }

            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(rgb, 6);
            let mut xobj = pdf.image_xobject(image_id, &compressed);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_id) = mask_id {
                xobj.s_mask(mask_id);
            }
        }
    }
}

/// Uncompressed content stream of one gallery page: label, then image.
fn page_content(layout: &GalleryLayout, label: &str, fit: LayoutBox) -> Vec<u8> {
    let page_w = layout.page_width_mm * MM_TO_PT;
    let page_h = layout.page_height_mm * MM_TO_PT;
    let size = layout.label_font_size_pt;

    let text = to_winansi(label);
    let text_w = text_width(&text, size);
    let label_x = (page_w - text_w) / 2.0;
    // Vertically centre the capitals in the label cell.
    let cell_mid = (layout.label_top_mm + layout.label_height_mm / 2.0) * MM_TO_PT;
    let baseline_y = page_h - cell_mid - CAP_HEIGHT * size / 2000.0;

    let img_w = fit.width * MM_TO_PT;
    let img_h = fit.height * MM_TO_PT;
    let img_x = (page_w - img_w) / 2.0;
    let img_y = page_h - (layout.image_top_mm + fit.height) * MM_TO_PT;

    let mut content = Content::new();
    content
        .begin_text()
        .set_font(FONT_NAME, size)
        .next_line(label_x, baseline_y)
        .show(Str(&text))
        .end_text();
    content.save_state();
    content.transform([img_w, 0.0, 0.0, img_h, img_x, img_y]);
    content.x_object(IMAGE_NAME);
    content.restore_state();
    content.finish().as_slice().to_vec()
}

// ── Label text ───────────────────────────────────────────────────────────

/// Latin-1 subset of WinAnsi; anything else becomes `?`.
fn to_winansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u8,
            0x20AC => 0x80,
            _ => b'?',
        })
        .collect()
}

/// Width of WinAnsi `text` in points at `size`.
fn text_width(text: &[u8], size: f32) -> f32 {
    text.iter().map(|&b| helvetica_bold_width(b) as f32).sum::<f32>() * size / 1000.0
}

/// Helvetica-Bold advance widths (AFM, 1/1000 em) for printable ASCII.
/// Characters outside that range use the digit width.
fn helvetica_bold_width(b: u8) -> u16 {
    match b {
        b' ' => 278,
        b'!' => 333,
        b'"' => 474,
        b'#' | b'$' => 556,
        b'%' => 889,
        b'&' => 722,
        b'\'' => 238,
        b'(' | b')' => 333,
        b'*' => 389,
        b'+' => 584,
        b',' => 278,
        b'-' => 333,
        b'.' | b'/' => 278,
        b'0'..=b'9' => 556,
        b':' | b';' => 333,
        b'<' | b'=' | b'>' => 584,
        b'?' => 611,
        b'@' => 975,
        b'A' | b'B' | b'C' | b'D' => 722,
        b'E' => 667,
        b'F' => 611,
        b'G' => 778,
        b'H' => 722,
        b'I' => 278,
        b'J' => 556,
        b'K' => 722,
        b'L' => 611,
        b'M' => 833,
        b'N' => 722,
        b'O' => 778,
        b'P' => 667,
        b'Q' => 778,
        b'R' => 722,
        b'S' => 667,
        b'T' => 611,
        b'U' => 722,
        b'V' => 667,
        b'W' => 944,
        b'X' | b'Y' => 667,
        b'Z' => 611,
        b'[' => 333,
        b'\\' => 278,
        b']' => 333,
        b'^' => 584,
        b'_' => 556,
        b'`' => 333,
        b'a' => 556,
        b'b' => 611,
        b'c' => 556,
        b'd' => 611,
        b'e' => 556,
        b'f' => 333,
        b'g' | b'h' => 611,
        b'i' | b'j' => 278,
        b'k' => 556,
        b'l' => 278,
        b'm' => 889,
        b'n' | b'o' | b'p' | b'q' => 611,
        b'r' => 389,
        b's' => 556,
        b't' => 333,
        b'u' => 611,
        b'v' => 556,
        b'w' => 778,
        b'x' | b'y' => 556,
        b'z' => 500,
        b'{' => 389,
        b'|' => 280,
        b'}' => 389,
        b'~' => 584,
        _ => 556,
    }
}
