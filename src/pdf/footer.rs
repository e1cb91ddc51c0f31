use crate::config::LayoutConfig;
use crate::fonts::FontSet;

use super::LaidOutDocument;
use super::surface::write_runs;

pub(crate) fn footer_text(format: &str, page: usize, pages: usize) -> String {
    format
        .replace("{page}", &page.to_string())
        .replace("{pages}", &pages.to_string())
}

/// Second pass: stamp `Page i of N` on every page, right-aligned at the
/// right margin. Only valid once layout has produced the final page count.
pub(crate) fn stamp_footers(
    mut doc: LaidOutDocument,
    fonts: &FontSet,
    config: &LayoutConfig,
) -> LaidOutDocument {
    let style = &config.styles.footer;
    let font = fonts.get(style);
    let geom = doc.geometry;
    let baseline = config.footer.top_mm + font.ascent(style.size_pt);
    let pages = doc.pages.len();

    for (i, content) in doc.pages.iter_mut().enumerate() {
        let text = footer_text(&config.footer.format, i + 1, pages);
        let x = geom.width - geom.margin_h - font.text_width(&text, style.size_pt);
        write_runs(content, geom.height_pt(), font, style, baseline, &[(x, &text)]);
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format() {
        let config = LayoutConfig::default();
        assert_eq!(footer_text(&config.footer.format, 2, 5), "Page 2 of 5");
    }

    #[test]
    fn custom_format() {
        assert_eq!(footer_text("{page}/{pages}", 1, 1), "1/1");
    }
}
