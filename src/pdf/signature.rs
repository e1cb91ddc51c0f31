use crate::config::LayoutConfig;
use crate::fonts::FontSet;
use crate::geometry::{Rect, fit_signature, line_height_mm};

use super::ImageXObject;
use super::cursor::LayoutCursor;
use super::layout::draw_run;
use super::surface::Surface;

/// Where the signature block ended up.
#[derive(Clone, Debug, PartialEq)]
pub struct SignaturePlacement {
    pub page_index: usize,
    /// Top of the label line, mm from the page top.
    pub label_top: f32,
    /// Placed at the fixed bottom anchor rather than below the last block.
    pub anchored: bool,
    /// Fitted signature image bounds, if one was drawn.
    pub image: Option<Rect>,
}

/// Label top for the signature block. A visually full page gets the fixed
/// anchor near the bottom unless the cursor is already past it.
pub(crate) fn signature_top(cursor: &LayoutCursor, config: &LayoutConfig) -> (f32, bool) {
    let anchor = config.page.height_mm - config.signature.anchor_from_bottom_mm;
    if cursor.page_is_full() && cursor.y <= anchor {
        (anchor, true)
    } else {
        (cursor.y + config.spacing.section_mm, false)
    }
}

/// Vertical offset of a fitted signature relative to its label line: wide
/// signatures sit centered on the line, tall ones rise three quarters above
/// the label bottom.
pub(crate) fn signature_image_top(
    label_top: f32,
    label_h: f32,
    size: (f32, f32),
    max_height: f32,
) -> f32 {
    let (w, h) = size;
    if w > 2.0 * max_height {
        label_top + (label_h - h) / 2.0
    } else {
        label_top + label_h - 0.75 * h
    }
}

pub(crate) fn render_signature(
    surface: &mut Surface,
    fonts: &FontSet,
    config: &LayoutConfig,
    image: Option<&ImageXObject>,
    cursor: LayoutCursor,
) -> SignaturePlacement {
    let geom = *surface.geometry();
    let style = &config.styles.signature_label;
    let font = fonts.get(style);
    let label_h = line_height_mm(style, config.line_height_factor);

    let (mut top, mut anchored) = signature_top(&cursor, config);
    if top + label_h > geom.bottom_limit() {
        surface.break_page();
        top = geom.margin_v;
        anchored = false;
    }

    let label_w = draw_run(surface, &config.signature.label, style, font, geom.margin_h, top);

    let rect = image.map(|sig| {
        let sc = &config.signature;
        let (w, h) = fit_signature(sig.intrinsic, sc.max_width_mm, sc.max_height_mm);
        let rect = Rect {
            x: geom.margin_h + label_w + config.spacing.signature_image_gap_mm,
            y: signature_image_top(top, label_h, (w, h), sc.max_height_mm),
            width: w,
            height: h,
        };
        surface.draw_image(&sig.xobject, rect);
        rect
    });

    log::debug!(
        "signature: page {}, top {top:.1}mm{}",
        surface.page_index() + 1,
        if anchored { " (anchored)" } else { "" }
    );

    SignaturePlacement {
        page_index: surface.page_index(),
        label_top: top,
        anchored,
        image: rect,
    }
}
