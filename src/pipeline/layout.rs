//! Aspect-preserving fit of an image into the gallery's printable box.

use serde::{Deserialize, Serialize};

/// Rendered image size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    pub width: f32,
    pub height: f32,
}

/// Scale a `px_width × px_height` image to fit inside `max_width × max_height`.
///
/// Landscape images (ratio > 1) are sized by width first, everything else by
/// height first; in both cases the other side is derived from the ratio, so
/// the result never exceeds either bound and the aspect ratio is kept.
/// Returns `None` when either pixel dimension is zero.
pub fn fit_image(px_width: u32, px_height: u32, max_width: f32, max_height: f32) -> Option<LayoutBox> {
    if px_width == 0 || px_height == 0 {
        return None;
    }
    let ratio = px_width as f32 / px_height as f32;

    let (width, height) = if ratio > 1.0 {
        let w = max_width.min(max_height * ratio);
        (w, w / ratio)
    } else {
        let h = max_height.min(max_width / ratio);
        (h * ratio, h)
    };

    Some(LayoutBox { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn landscape_fills_width() {
        let b = fit_image(400, 200, 190.0, 267.0).unwrap();
        assert!(approx(b.width, 190.0) && approx(b.height, 95.0), "{b:?}");
    }

    #[test]
    fn portrait_fills_height() {
        let b = fit_image(200, 400, 190.0, 267.0).unwrap();
        assert!(approx(b.width, 133.5) && approx(b.height, 267.0), "{b:?}");
    }

    #[test]
    fn square_limited_by_width() {
        let b = fit_image(500, 500, 190.0, 267.0).unwrap();
        assert!(approx(b.width, 190.0) && approx(b.height, 190.0), "{b:?}");
    }

    #[test]
    fn very_wide_limited_by_width_and_very_tall_by_height() {
        let wide = fit_image(3000, 100, 190.0, 267.0).unwrap();
        assert!(approx(wide.width, 190.0));
        assert!(approx(wide.height, 190.0 / 30.0));

        let tall = fit_image(10, 1000, 190.0, 267.0).unwrap();
        assert!(approx(tall.height, 267.0));
        assert!(approx(tall.width, 2.67));
    }

    #[test]
    fn never_exceeds_bounds_and_keeps_ratio() {
        for (w, h) in [(1, 1), (1, 5000), (5000, 1), (1920, 1080), (190, 267), (191, 267), (800, 1200)] {
            let b = fit_image(w, h, 190.0, 267.0).unwrap();
            assert!(b.width <= 190.0 + EPS && b.height <= 267.0 + EPS, "{w}x{h} -> {b:?}");
            let r = w as f32 / h as f32;
            assert!(((b.width / b.height) - r).abs() / r < 1e-3, "{w}x{h} -> {b:?}");
            assert!(approx(b.width, 190.0) || approx(b.height, 267.0), "{w}x{h} -> {b:?}");
        }
    }

    #[test]
    fn zero_dimension_has_no_layout() {
        assert_eq!(fit_image(0, 10, 190.0, 267.0), None);
        assert_eq!(fit_image(10, 0, 190.0, 267.0), None);
    }
}
