use crate::config::TextStyle;
use crate::fonts::FontEntry;
use crate::model::Alignment;

use super::surface::Surface;

pub(crate) struct Word {
    pub(crate) text: String,
    pub(crate) x_offset: f32, // x relative to line start
    pub(crate) width: f32,
}

pub(crate) struct TextLine {
    pub(crate) words: Vec<Word>,
    pub(crate) width: f32,
    /// Last line of a paragraph; never stretched when justifying.
    pub(crate) ends_paragraph: bool,
}

impl TextLine {
    fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn finish_line(words: &mut Vec<Word>, ends_paragraph: bool) -> TextLine {
    let width = words.last().map(|w| w.x_offset + w.width).unwrap_or(0.0);
    TextLine {
        words: std::mem::take(words),
        width,
        ends_paragraph,
    }
}

/// Greedy word wrap. Explicit newlines start new paragraphs; a word wider
/// than `max_width` gets a line of its own. Blank text yields no lines.
pub(crate) fn wrap_text(
    text: &str,
    font: &FontEntry,
    size_pt: f32,
    max_width: f32,
) -> Vec<TextLine> {
    let text = text.trim_end();
    if text.trim().is_empty() {
        return Vec::new();
    }
    let space_w = font.space_width(size_pt);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut words: Vec<Word> = Vec::new();
        let mut current_x = 0.0f32;

        for word in paragraph.split_whitespace() {
            let ww = font.text_width(word, size_pt);
            let proposed_x = if words.is_empty() {
                0.0
            } else {
                current_x + space_w
            };
            if !words.is_empty() && proposed_x + ww > max_width {
                lines.push(finish_line(&mut words, false));
                current_x = 0.0;
            } else {
                current_x = proposed_x;
            }
            words.push(Word {
                text: word.to_string(),
                x_offset: current_x,
                width: ww,
            });
            current_x += ww;
        }
        lines.push(finish_line(&mut words, true));
    }
    lines
}

/// Height of `text` wrapped at `max_width`; zero for blank text.
pub(crate) fn wrapped_height(
    text: &str,
    style: &TextStyle,
    font: &FontEntry,
    max_width: f32,
    line_h: f32,
) -> f32 {
    wrap_text(text, font, style.size_pt, max_width).len() as f32 * line_h
}

/// Cut `lines` down to `max_lines`, marking the cut with an ellipsis.
/// Returns true when anything was dropped.
pub(crate) fn truncate_lines(lines: &mut Vec<TextLine>, max_lines: usize) -> bool {
    if lines.len() <= max_lines {
        return false;
    }
    lines.truncate(max_lines);
    if let Some(last) = lines.last_mut() {
        if let Some(word) = last.words.last_mut() {
            word.text.push('\u{2026}');
        }
        last.ends_paragraph = true;
    }
    true
}

/// Draw wrapped lines top-down starting at `top`, aligned inside `[x, x + width]`.
pub(crate) fn draw_lines(
    surface: &mut Surface,
    lines: &[TextLine],
    style: &TextStyle,
    font: &FontEntry,
    x: f32,
    top: f32,
    width: f32,
    line_h: f32,
) {
    let ascent = font.ascent(style.size_pt);
    for (i, line) in lines.iter().enumerate() {
        if line.words.is_empty() {
            continue;
        }
        let baseline = top + i as f32 * line_h + ascent;

        let justify =
            style.alignment == Alignment::Justify && !line.ends_paragraph && line.words.len() > 1;
        if justify {
            let extra_per_gap = (width - line.width) / (line.words.len() - 1) as f32;
            let words: Vec<(f32, &str)> = line
                .words
                .iter()
                .enumerate()
                .map(|(wi, w)| (x + w.x_offset + wi as f32 * extra_per_gap, w.text.as_str()))
                .collect();
            surface.show_words(font, style, baseline, &words);
            continue;
        }

        let line_x = match style.alignment {
            Alignment::Center => x + (width - line.width) / 2.0,
            Alignment::Right => x + width - line.width,
            Alignment::Left | Alignment::Justify => x,
        };
        surface.show_text(font, style, line_x, baseline, &line.text());
    }
}

/// Draw a single unwrapped run with its top at `top`; returns its width.
pub(crate) fn draw_run(
    surface: &mut Surface,
    text: &str,
    style: &TextStyle,
    font: &FontEntry,
    x: f32,
    top: f32,
) -> f32 {
    let baseline = top + font.ascent(style.size_pt);
    surface.show_text(font, style, x, baseline, text);
    font.text_width(text, style.size_pt)
}
