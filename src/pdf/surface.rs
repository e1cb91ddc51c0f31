use pdf_writer::{Content, Name, Str};

use crate::config::TextStyle;
use crate::fonts::FontEntry;
use crate::geometry::{PageGeometry, Rect, mm_to_pt};

use super::background::{Background, paint_background};

/// Append-only sequence of page content streams. Callers work in layout
/// space (mm, top-left origin); conversion to PDF user space happens here.
pub(crate) struct Surface {
    geom: PageGeometry,
    background: Option<Background>,
    pages: Vec<Content>,
    current: Content,
}

impl Surface {
    pub(crate) fn new(geom: PageGeometry, background: Option<Background>) -> Self {
        let mut surface = Self {
            geom,
            background,
            pages: Vec::new(),
            current: Content::new(),
        };
        surface.paint_background();
        surface
    }

    pub(crate) fn geometry(&self) -> &PageGeometry {
        &self.geom
    }

    /// Zero-based index of the page being drawn.
    pub(crate) fn page_index(&self) -> usize {
        self.pages.len()
    }

    /// Close the current page and start a fresh one with the background painted.
    pub(crate) fn break_page(&mut self) {
        self.pages
            .push(std::mem::replace(&mut self.current, Content::new()));
        log::debug!("page break → page {}", self.pages.len() + 1);
        self.paint_background();
    }

    fn paint_background(&mut self) {
        if let Some(bg) = &self.background {
            paint_background(&mut self.current, bg, &self.geom);
        }
    }

    pub(crate) fn finish(mut self) -> Vec<Content> {
        self.pages.push(self.current);
        self.pages
    }

    fn pdf_x(&self, x: f32) -> f32 {
        mm_to_pt(x)
    }

    fn pdf_y(&self, y: f32) -> f32 {
        self.geom.height_pt() - mm_to_pt(y)
    }

    pub(crate) fn draw_image(&mut self, xobject: &str, rect: Rect) {
        let (x, y) = (self.pdf_x(rect.x), self.pdf_y(rect.bottom()));
        self.current.save_state();
        self.current.transform([
            mm_to_pt(rect.width),
            0.0,
            0.0,
            mm_to_pt(rect.height),
            x,
            y,
        ]);
        self.current.x_object(Name(xobject.as_bytes()));
        self.current.restore_state();
    }

    pub(crate) fn stroke_rect(&mut self, rect: Rect, line_width: f32) {
        let (x, y) = (self.pdf_x(rect.x), self.pdf_y(rect.bottom()));
        self.current.save_state();
        self.current.set_line_width(mm_to_pt(line_width));
        self.current.set_stroke_gray(0.0);
        self.current
            .rect(x, y, mm_to_pt(rect.width), mm_to_pt(rect.height))
            .stroke();
        self.current.restore_state();
    }

    pub(crate) fn show_text(
        &mut self,
        font: &FontEntry,
        style: &TextStyle,
        x: f32,
        baseline: f32,
        text: &str,
    ) {
        self.show_words(font, style, baseline, &[(x, text)]);
    }

    /// Show several runs on one baseline inside a single text object.
    pub(crate) fn show_words(
        &mut self,
        font: &FontEntry,
        style: &TextStyle,
        baseline: f32,
        words: &[(f32, &str)],
    ) {
        let page_height = self.geom.height_pt();
        write_runs(&mut self.current, page_height, font, style, baseline, words);
    }
}

/// Write text runs straight into a finished page stream. `baseline` and the
/// run offsets are in layout space.
pub(crate) fn write_runs(
    content: &mut Content,
    page_height_pt: f32,
    font: &FontEntry,
    style: &TextStyle,
    baseline: f32,
    words: &[(f32, &str)],
) {
    if words.iter().all(|(_, t)| t.is_empty()) {
        return;
    }
    let y = page_height_pt - mm_to_pt(baseline);
    content.save_state();
    if let Some([r, g, b]) = style.color {
        content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    } else {
        content.set_fill_gray(0.0);
    }
    content.begin_text();
    content.set_font(Name(font.pdf_name.as_bytes()), style.size_pt);
    let mut td_x = 0.0f32;
    let mut td_y = 0.0f32;
    for &(wx, text) in words {
        let x = mm_to_pt(wx);
        content.next_line(x - td_x, y - td_y);
        td_x = x;
        td_y = y;
        content.show(Str(&font.encode(text)));
    }
    content.end_text();
    content.restore_state();
}
