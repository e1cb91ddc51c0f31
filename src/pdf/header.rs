use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::fonts::FontSet;
use crate::geometry::{Rect, line_height_mm};
use crate::model::FieldName;

use super::ImageXObject;
use super::cursor::LayoutCursor;
use super::layout::{draw_lines, draw_run, wrap_text};
use super::surface::Surface;

/// Logo and centered title. Returns the cursor below the title.
pub(crate) fn render_header(
    surface: &mut Surface,
    fonts: &FontSet,
    config: &LayoutConfig,
    title: &str,
    logo: Option<&ImageXObject>,
) -> LayoutCursor {
    let geom = *surface.geometry();
    let mut y = geom.margin_v;

    match logo {
        Some(logo) => {
            let (iw, ih) = logo.intrinsic;
            let mut h = config.header.logo_height_mm;
            let mut w = h * iw / ih;
            if w > geom.content_width() {
                w = geom.content_width();
                h = w * ih / iw;
            }
            let x = geom.margin_h + (geom.content_width() - w) / 2.0;
            surface.draw_image(&logo.xobject, Rect { x, y, width: w, height: h });
            y += h + config.spacing.logo_to_title_mm;
        }
        None => log::debug!("header: no logo, title starts at the top margin"),
    }

    let style = &config.styles.title;
    let font = fonts.get(style);
    let line_h = line_height_mm(style, config.line_height_factor);
    let lines = wrap_text(title, font, style.size_pt, geom.content_width());
    draw_lines(surface, &lines, style, font, geom.margin_h, y, geom.content_width(), line_h);
    y += lines.len() as f32 * line_h;

    LayoutCursor::at(y + config.spacing.header_mm)
}

/// One row per field: bold label, then the value wrapped to the remaining width.
pub(crate) fn render_fields(
    surface: &mut Surface,
    fonts: &FontSet,
    config: &LayoutConfig,
    fields: &BTreeMap<FieldName, String>,
    mut cursor: LayoutCursor,
) -> LayoutCursor {
    let geom = *surface.geometry();
    let label_style = &config.styles.label;
    let value_style = &config.styles.value;
    let label_font = fonts.get(label_style);
    let value_font = fonts.get(value_style);
    let label_h = line_height_mm(label_style, config.line_height_factor);
    let value_h = line_height_mm(value_style, config.line_height_factor);
    let right_edge = geom.margin_h + geom.content_width();

    for (name, value) in fields {
        let label = name.label();
        let label_w = label_font.text_width(label, label_style.size_pt);
        let value_x = geom.margin_h + label_w + value_font.space_width(value_style.size_pt);
        let value_w = (right_edge - value_x).max(value_font.text_width("W", value_style.size_pt));
        let lines = wrap_text(value, value_font, value_style.size_pt, value_w);
        let row_h = (lines.len() as f32 * value_h).max(label_h);

        if cursor.y + row_h > geom.bottom_limit() {
            surface.break_page();
            cursor = LayoutCursor::on_new_page(geom.margin_v);
        }

        draw_run(surface, label, label_style, label_font, geom.margin_h, cursor.y);
        draw_lines(surface, &lines, value_style, value_font, value_x, cursor.y, value_w, value_h);
        cursor = cursor.advanced(row_h + config.spacing.field_mm);
    }
    cursor
}
