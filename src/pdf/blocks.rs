//! Photo block layout.
//!
//! Each active photo gets one block: a `Photo n: title` line, the image fitted
//! into what is left of the block, and the description wrapped at the image's
//! width below it. Block heights come from two reference heights (half the
//! usable page for landscape photos, the full usable page for portrait ones)
//! adjusted by a handful of rules that keep the signature on the last page.

use crate::cancel::CancelToken;
use crate::config::LayoutConfig;
use crate::error::Error;
use crate::fonts::FontSet;
use crate::geometry::{PageGeometry, Rect, fit_image, intrinsic_size, line_height_mm};
use crate::model::ActivePhoto;

use super::cursor::LayoutCursor;
use super::layout::{draw_lines, draw_run, truncate_lines, wrap_text, wrapped_height};
use super::surface::Surface;

const MAX_REFITS: usize = 4;
const EPSILON: f32 = 1e-3;

/// Where a photo block ended up. Lengths are millimetres from the page top.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockPlacement {
    /// Display number (1-based, active photos only).
    pub number: usize,
    /// Zero-based page index.
    pub page_index: usize,
    pub top: f32,
    pub height: f32,
    pub is_vertical: bool,
    /// Fitted image bounds. `None` when the image size could not be read.
    pub image: Option<Rect>,
    /// False when the image could not be embedded; its space is still kept.
    pub image_drawn: bool,
    pub description_lines: usize,
    /// The description did not fit in the block and was cut short.
    pub description_truncated: bool,
}

impl BlockPlacement {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// Per-photo facts the height rules depend on.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BlockInput {
    pub(crate) is_vertical: bool,
    pub(crate) is_first: bool,
    pub(crate) is_last: bool,
    pub(crate) is_only: bool,
    pub(crate) in_trailing_pair: bool,
    pub(crate) title_line_height: f32,
    /// Description height when wrapped at the full content width.
    pub(crate) estimated_description_height: f32,
}

/// Whether the last two photos are both landscape.
pub(crate) fn trailing_horizontal_pair(verticals: &[bool]) -> bool {
    match verticals {
        [.., a, b] => !a && !b,
        _ => false,
    }
}

pub(crate) fn block_height(
    cursor: &LayoutCursor,
    input: &BlockInput,
    geom: &PageGeometry,
    config: &LayoutConfig,
) -> f32 {
    let pad = config.spacing.block_top_padding_mm;
    let usable = geom.usable_height(pad);
    let horizontal_ref = (usable / 2.0).floor();
    let vertical_ref = usable.floor();

    let mut height = if input.is_vertical {
        vertical_ref
    } else {
        horizontal_ref
    };

    if input.is_first {
        let min_block = pad
            + input.title_line_height
            + config.offsets.min_image_height_mm
            + config.spacing.image_to_description_mm
            + input.estimated_description_height;
        let mut available = geom.bottom_limit() - cursor.y;
        if input.is_only {
            available -= config.offsets.signature_reservation_mm;
        }
        if available > min_block {
            height = min_block.max(available.min(vertical_ref));
        }
    }

    if input.is_last && input.is_vertical {
        height -= config.offsets.last_vertical_shrink_mm;
    }
    if input.in_trailing_pair {
        height -= config.offsets.trailing_pair_shrink_mm;
    }

    let floor = pad + config.offsets.min_image_height_mm;
    height.max(floor).min(geom.height - 2.0 * geom.margin_v)
}

pub(crate) fn needs_page_break(cursor: &LayoutCursor, height: f32, geom: &PageGeometry) -> bool {
    cursor.y + height > geom.bottom_limit()
}

/// Lay out every active photo starting at `cursor`. `xobjects[i]` names the
/// embedded image of `photos[i]`, if embedding succeeded.
pub(crate) fn layout_photos(
    surface: &mut Surface,
    fonts: &FontSet,
    config: &LayoutConfig,
    photos: &[ActivePhoto<'_>],
    xobjects: &[Option<String>],
    mut cursor: LayoutCursor,
    cancel: &CancelToken,
) -> Result<(LayoutCursor, Vec<BlockPlacement>), Error> {
    let geom = *surface.geometry();
    let verticals: Vec<bool> = photos.iter().map(|p| p.entry.image.is_vertical()).collect();
    let trailing_pair = trailing_horizontal_pair(&verticals);
    let count = photos.len();

    let desc_style = &config.styles.description;
    let desc_font = fonts.get(desc_style);
    let desc_lh = line_height_mm(desc_style, config.line_height_factor);
    let title_lh = title_line_height(config);

    let mut placements = Vec::with_capacity(count);
    for (i, photo) in photos.iter().enumerate() {
        cancel.check()?;

        let input = BlockInput {
            is_vertical: verticals[i],
            is_first: i == 0,
            is_last: i + 1 == count,
            is_only: count == 1,
            in_trailing_pair: trailing_pair && i + 2 >= count,
            title_line_height: title_lh,
            estimated_description_height: wrapped_height(
                &photo.entry.description,
                desc_style,
                desc_font,
                geom.content_width(),
                desc_lh,
            ),
        };
        let height = block_height(&cursor, &input, &geom, config);

        if needs_page_break(&cursor, height, &geom) {
            surface.break_page();
            cursor = LayoutCursor::on_new_page(geom.margin_v);
        }

        let xobject = xobjects.get(i).and_then(|x| x.as_deref());
        let placement = draw_block(surface, fonts, config, photo, xobject, cursor.y, height);
        log::debug!(
            "photo {}: page {}, top {:.1}mm, height {:.1}mm{}",
            placement.number,
            placement.page_index + 1,
            placement.top,
            placement.height,
            if input.is_vertical { ", vertical" } else { "" }
        );
        placements.push(placement);
        cursor = cursor.after_block(height, input.is_vertical);
    }
    Ok((cursor, placements))
}

fn title_line_height(config: &LayoutConfig) -> f32 {
    let factor = config.line_height_factor;
    line_height_mm(&config.styles.photo_title, factor)
        .max(line_height_mm(&config.styles.photo_label, factor))
}

fn draw_block(
    surface: &mut Surface,
    fonts: &FontSet,
    config: &LayoutConfig,
    photo: &ActivePhoto<'_>,
    xobject: Option<&str>,
    top: f32,
    height: f32,
) -> BlockPlacement {
    let geom = *surface.geometry();
    let content_w = geom.content_width();
    let block_bottom = top + height;
    let spacing = &config.spacing;

    // Title line
    let title_top = top + spacing.block_top_padding_mm;
    let label_style = &config.styles.photo_label;
    let title_style = &config.styles.photo_title;
    let label_font = fonts.get(label_style);
    let title_font = fonts.get(title_style);
    let label = config
        .photo
        .label_format
        .replace("{number}", &photo.number.to_string());
    // Label and title share a baseline set by the taller of the two ascents.
    let label_ascent = label_font.ascent(label_style.size_pt);
    let title_ascent = title_font.ascent(title_style.size_pt);
    let ascent = label_ascent.max(title_ascent);
    let label_w = draw_run(
        surface,
        &label,
        label_style,
        label_font,
        geom.margin_h,
        title_top + ascent - label_ascent,
    );
    let title_w = (content_w - label_w).max(0.0);
    let title_lh = line_height_mm(title_style, config.line_height_factor);
    let title_lines = wrap_text(&photo.entry.title, title_font, title_style.size_pt, title_w);
    draw_lines(
        surface,
        &title_lines,
        title_style,
        title_font,
        geom.margin_h + label_w,
        title_top + ascent - title_ascent,
        title_w,
        title_lh,
    );
    let title_h = (ascent - title_ascent + title_lines.len() as f32 * title_lh)
        .max(title_line_height(config));

    let desc_style = &config.styles.description;
    let desc_font = fonts.get(desc_style);
    let desc_lh = line_height_mm(desc_style, config.line_height_factor);
    let description = &photo.entry.description;
    let image_top = title_top + title_h + spacing.title_to_image_mm;

    let (image, mut desc_lines, desc_x, desc_w, desc_top) = match intrinsic_size(&photo.entry.image) {
        Some(intrinsic) => {
            let estimated = wrapped_height(description, desc_style, desc_font, content_w, desc_lh);
            let image_room = (block_bottom - image_top).max(0.0);
            let mut max_h = (height
                - spacing.block_top_padding_mm
                - title_h
                - spacing.title_to_image_mm
                - estimated
                - spacing.image_to_description_mm)
                .max(config.offsets.min_image_height_mm)
                .min(image_room);

            let mut refits = 0;
            loop {
                let (w, h) = fit_image(intrinsic, content_w, max_h);
                let lines = wrap_text(description, desc_font, desc_style.size_pt, w);
                let desc_top = image_top + h + spacing.image_to_description_mm;
                let overflow = desc_top + lines.len() as f32 * desc_lh - block_bottom;
                let floor = config.offsets.min_image_height_mm.min(image_room);
                if overflow <= EPSILON || refits == MAX_REFITS || h <= floor + EPSILON {
                    let rect = Rect {
                        x: geom.margin_h + (content_w - w) / 2.0,
                        y: image_top,
                        width: w,
                        height: h,
                    };
                    break (Some(rect), lines, rect.x, w, desc_top);
                }
                max_h = (h - overflow).max(floor);
                refits += 1;
            }
        }
        None => {
            let lines = wrap_text(description, desc_font, desc_style.size_pt, content_w);
            (None, lines, geom.margin_h, content_w, image_top)
        }
    };

    let image_drawn = match (image, xobject) {
        (Some(rect), Some(name)) => {
            surface.draw_image(name, rect);
            surface.stroke_rect(rect, config.photo.border_width_mm);
            true
        }
        _ => false,
    };

    let max_lines = ((block_bottom - desc_top) / desc_lh + EPSILON).floor().max(0.0) as usize;
    let description_truncated = truncate_lines(&mut desc_lines, max_lines);
    if description_truncated {
        log::warn!(
            "photo {}: description does not fit in its block, cut to {} line(s)",
            photo.number,
            desc_lines.len()
        );
    }
    draw_lines(
        surface,
        &desc_lines,
        desc_style,
        desc_font,
        desc_x,
        desc_top,
        desc_w,
        desc_lh,
    );

    BlockPlacement {
        number: photo.number,
        page_index: surface.page_index(),
        top,
        height,
        is_vertical: photo.entry.image.is_vertical(),
        image,
        image_drawn,
        description_lines: desc_lines.len(),
        description_truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    fn input(is_vertical: bool) -> BlockInput {
        BlockInput {
            is_vertical,
            is_first: false,
            is_last: false,
            is_only: false,
            in_trailing_pair: false,
            title_line_height: 4.0,
            estimated_description_height: 0.0,
        }
    }

    fn setup() -> (LayoutConfig, PageGeometry) {
        let config = LayoutConfig::default();
        let geom = PageGeometry::from_config(&config);
        (config, geom)
    }

    #[test]
    fn reference_heights_by_orientation() {
        let (config, geom) = setup();
        let cursor = LayoutCursor::at(15.0);
        // A4, 15mm margins, 5mm padding: usable = 262
        assert!(approx(block_height(&cursor, &input(false), &geom, &config), 131.0));
        assert!(approx(block_height(&cursor, &input(true), &geom, &config), 262.0));
    }

    #[test]
    fn first_photo_grows_into_free_space() {
        let (config, geom) = setup();
        let cursor = LayoutCursor::at(60.0);
        let first = BlockInput {
            is_first: true,
            ..input(false)
        };
        // available = 282 - 60
        assert!(approx(block_height(&cursor, &first, &geom, &config), 222.0));
    }

    #[test]
    fn only_photo_reserves_signature_room_and_last_vertical_shrinks() {
        let (config, geom) = setup();
        let cursor = LayoutCursor::at(60.0);
        let only = BlockInput {
            is_first: true,
            is_last: true,
            is_only: true,
            ..input(true)
        };
        // 282 - 60 - 20 reservation - 10 last-vertical shrink
        assert!(approx(block_height(&cursor, &only, &geom, &config), 192.0));
    }

    #[test]
    fn first_photo_keeps_base_when_space_is_short() {
        let (config, geom) = setup();
        let cursor = LayoutCursor::at(250.0);
        let first = BlockInput {
            is_first: true,
            estimated_description_height: 20.0,
            ..input(false)
        };
        let h = block_height(&cursor, &first, &geom, &config);
        assert!(approx(h, 131.0));
        assert!(needs_page_break(&cursor, h, &geom));
    }

    #[test]
    fn trailing_pair_shrinks_both() {
        let (config, geom) = setup();
        let cursor = LayoutCursor::at(15.0);
        let pair = BlockInput {
            in_trailing_pair: true,
            ..input(false)
        };
        assert!(approx(block_height(&cursor, &pair, &geom, &config), 126.0));
    }

    #[test]
    fn trailing_pair_detection() {
        assert!(trailing_horizontal_pair(&[true, false, false]));
        assert!(!trailing_horizontal_pair(&[false, true]));
        assert!(!trailing_horizontal_pair(&[false]));
        assert!(!trailing_horizontal_pair(&[]));
    }

    #[test]
    fn second_landscape_block_breaks_below_a_tall_header() {
        let (config, geom) = setup();
        let pair = BlockInput {
            in_trailing_pair: true,
            ..input(false)
        };
        let mut cursor = LayoutCursor::at(80.0);
        let h = block_height(&cursor, &pair, &geom, &config);
        assert!(!needs_page_break(&cursor, h, &geom));
        cursor = cursor.after_block(h, false);
        let h = block_height(&cursor, &pair, &geom, &config);
        // 80 + 126 + 126 > 282
        assert!(needs_page_break(&cursor, h, &geom));
    }

    #[test]
    fn unpadded_portrait_block_fills_the_page() {
        let (mut config, geom) = setup();
        config.spacing.block_top_padding_mm = 0.0;
        let cursor = LayoutCursor::at(15.0);
        let h = block_height(&cursor, &input(true), &geom, &config);
        assert!(approx(h, geom.height - 2.0 * geom.margin_v));
    }

    #[test]
    fn shrinks_stop_at_the_minimum_block() {
        let (mut config, geom) = setup();
        config.offsets.last_vertical_shrink_mm = 227.0;
        config.validate().unwrap();
        // Lone portrait photo low on the page: grows to 62mm, then the shrink
        // would take it negative.
        let cursor = LayoutCursor::at(200.0);
        let only = BlockInput {
            is_first: true,
            is_last: true,
            is_only: true,
            ..input(true)
        };
        let h = block_height(&cursor, &only, &geom, &config);
        assert!(approx(h, 35.0));
    }
}
