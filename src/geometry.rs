//! Page geometry and unit helpers. Layout works in millimetres from the
//! top-left page corner; PDF user space is points from the bottom-left.

use crate::config::{LayoutConfig, TextStyle};
use crate::model::ReportImage;

pub const MM_PER_PT: f32 = 25.4 / 72.0;

pub fn pt_to_mm(pt: f32) -> f32 {
    pt * MM_PER_PT
}

pub fn mm_to_pt(mm: f32) -> f32 {
    mm / MM_PER_PT
}

/// Line pitch of a text style, in millimetres.
pub fn line_height_mm(style: &TextStyle, factor: f32) -> f32 {
    pt_to_mm(style.size_pt * factor)
}

/// Intrinsic image size as floats, `None` for undecodable images.
pub fn intrinsic_size(image: &ReportImage) -> Option<(f32, f32)> {
    image
        .intrinsic_size()
        .map(|(w, h)| (w as f32, h as f32))
}

/// Axis-aligned rectangle in layout space (mm, top-left origin).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_h: f32,
    pub margin_v: f32,
}

impl PageGeometry {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            width: config.page.width_mm,
            height: config.page.height_mm,
            margin_h: config.page.margin_horizontal_mm,
            margin_v: config.page.margin_vertical_mm,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin_h
    }

    /// Lowest Y any block may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.height - self.margin_v
    }

    /// Page height minus both vertical margins and the block top padding.
    pub fn usable_height(&self, top_padding: f32) -> f32 {
        self.height - 2.0 * self.margin_v - top_padding
    }

    pub fn width_pt(&self) -> f32 {
        mm_to_pt(self.width)
    }

    pub fn height_pt(&self) -> f32 {
        mm_to_pt(self.height)
    }
}

/// Fit an image into a box: full width first, then constrained by height.
pub fn fit_image(intrinsic: (f32, f32), max_width: f32, max_height: f32) -> (f32, f32) {
    let (iw, ih) = intrinsic;
    let width = max_width;
    let height = width * ih / iw;
    if height > max_height {
        (max_height * iw / ih, max_height)
    } else {
        (width, height)
    }
}

/// Fit a signature: scale to the height bound, then to the width bound if it
/// is still too wide.
pub fn fit_signature(intrinsic: (f32, f32), max_width: f32, max_height: f32) -> (f32, f32) {
    let (iw, ih) = intrinsic;
    let height = max_height;
    let width = height * iw / ih;
    if width > max_width {
        (max_width, max_width * ih / iw)
    } else {
        (width, height)
    }
}

/// Size of a full-bleed background: fills exactly the axis whose page/image
/// ratio is larger; the other axis may overflow or fall short.
pub fn background_size(page: &PageGeometry, intrinsic: (f32, f32)) -> (f32, f32) {
    let (iw, ih) = intrinsic;
    let ratio_w = page.width / iw;
    let ratio_h = page.height / ih;
    if ratio_h > ratio_w {
        (iw * ratio_h, page.height)
    } else {
        (page.width, ih * ratio_w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a4() -> PageGeometry {
        PageGeometry::from_config(&LayoutConfig::default())
    }

    #[test]
    fn unit_round_trip() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-4);
        assert!((pt_to_mm(mm_to_pt(123.0)) - 123.0).abs() < 1e-3);
    }

    #[test]
    fn line_height_scales_with_font_size() {
        let style = TextStyle {
            size_pt: 10.0,
            ..TextStyle::default()
        };
        let lh = line_height_mm(&style, 1.15);
        assert!((lh - 11.5 * MM_PER_PT).abs() < 1e-4);
    }

    #[test]
    fn wide_image_fills_width() {
        let (w, h) = fit_image((1600.0, 900.0), 180.0, 200.0);
        assert_eq!(w, 180.0);
        assert!((h - 101.25).abs() < 1e-3);
    }

    #[test]
    fn tall_image_is_height_constrained() {
        let (w, h) = fit_image((1000.0, 2000.0), 180.0, 150.0);
        assert_eq!(h, 150.0);
        assert_eq!(w, 75.0);
    }

    #[test]
    fn signature_scales_by_height_then_width() {
        assert_eq!(fit_signature((300.0, 100.0), 60.0, 20.0), (60.0, 20.0));
        let (w, h) = fit_signature((800.0, 100.0), 60.0, 20.0);
        assert_eq!(w, 60.0);
        assert!((h - 7.5).abs() < 1e-4);
        assert_eq!(fit_signature((100.0, 200.0), 60.0, 20.0), (10.0, 20.0));
    }

    #[test]
    fn wide_background_fills_page_height_on_portrait_page() {
        let page = a4();
        let (w, h) = background_size(&page, (3000.0, 1000.0));
        assert_eq!(h, page.height);
        assert!((w - 891.0).abs() < 1e-2);
    }

    #[test]
    fn tall_background_fills_page_width() {
        let page = a4();
        let (w, h) = background_size(&page, (1000.0, 4000.0));
        assert_eq!(w, page.width);
        assert!((h - 840.0).abs() < 1e-2);
    }

    #[test]
    fn usable_height_and_limits() {
        let page = a4();
        assert_eq!(page.content_width(), 180.0);
        assert_eq!(page.bottom_limit(), 282.0);
        assert_eq!(page.usable_height(5.0), 262.0);
    }
}
