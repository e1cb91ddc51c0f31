use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::config::{StyleTable, TextStyle};
use crate::error::Error;
use crate::geometry::pt_to_mm;

pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    widths_1000: Vec<f32>,
    ascender_ratio: Option<f32>,
    char_to_gid: Option<HashMap<char, u16>>,
    char_widths_1000: Option<HashMap<char, f32>>,
}

impl FontEntry {
    /// Width of a single character in 1000-units. Uses the per-char cache of
    /// embedded fonts, falls back to the WinAnsi table.
    fn char_width_1000(&self, ch: char) -> f32 {
        if let Some(&w) = self.char_widths_1000.as_ref().and_then(|m| m.get(&ch)) {
            return w;
        }
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            self.widths_1000[(byte - 32) as usize]
        } else {
            0.0
        }
    }

    /// Text width in millimetres at the given point size.
    pub(crate) fn text_width(&self, text: &str, size_pt: f32) -> f32 {
        let pts: f32 = text
            .chars()
            .map(|ch| self.char_width_1000(ch) * size_pt / 1000.0)
            .sum();
        pt_to_mm(pts)
    }

    pub(crate) fn space_width(&self, size_pt: f32) -> f32 {
        pt_to_mm(self.char_width_1000(' ') * size_pt / 1000.0)
    }

    /// Distance from the top of a line to its baseline, in millimetres.
    pub(crate) fn ascent(&self, size_pt: f32) -> f32 {
        pt_to_mm(size_pt * self.ascender_ratio.unwrap_or(0.75))
    }

    /// Bytes for a `Tj` operand: glyph IDs for embedded fonts, WinAnsi otherwise.
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

/// All fonts used by one document, keyed by `font_key`.
pub(crate) struct FontSet {
    entries: HashMap<String, FontEntry>,
    order: Vec<String>,
}

impl FontSet {
    /// Register one font per distinct style key. `used_chars` drives subsetting.
    pub(crate) fn register(
        pdf: &mut Pdf,
        styles: &StyleTable,
        alloc: &mut impl FnMut() -> Ref,
        used_chars: &HashMap<String, HashSet<char>>,
    ) -> Result<Self, Error> {
        let mut set = FontSet {
            entries: HashMap::new(),
            order: Vec::new(),
        };
        for style in styles.iter() {
            let key = font_key(style);
            if set.entries.contains_key(&key) {
                continue;
            }
            let pdf_name = format!("F{}", set.order.len() + 1);
            let empty = HashSet::new();
            let used = used_chars.get(&key).unwrap_or(&empty);
            let entry = register_font(pdf, style, pdf_name, alloc, used)?;
            set.entries.insert(key.clone(), entry);
            set.order.push(key);
        }
        Ok(set)
    }

    pub(crate) fn get(&self, style: &TextStyle) -> &FontEntry {
        self.entries
            .get(&font_key(style))
            .expect("font registered for every style")
    }

    /// (resource name, font object) pairs in registration order.
    pub(crate) fn resources(&self) -> Vec<(String, Ref)> {
        self.order
            .iter()
            .map(|key| (self.entries[key].pdf_name.clone(), self.entries[key].font_ref))
            .collect()
    }
}

pub(crate) fn font_key(style: &TextStyle) -> String {
    if let Some(path) = &style.font_file {
        return format!("file:{}", path.display());
    }
    let base = style.font_family.trim().to_lowercase();
    if style.bold {
        format!("{base}/B")
    } else {
        base
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum StandardFamily {
    Helvetica,
    Times,
    Courier,
}

impl StandardFamily {
    fn from_family(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "helvetica" | "sans-serif" => Some(Self::Helvetica),
            "times" | "times-roman" | "serif" => Some(Self::Times),
            "courier" | "monospace" => Some(Self::Courier),
            _ => None,
        }
    }

    fn base_font(self, bold: bool) -> &'static [u8] {
        match (self, bold) {
            (Self::Helvetica, false) => b"Helvetica",
            (Self::Helvetica, true) => b"Helvetica-Bold",
            (Self::Times, false) => b"Times-Roman",
            (Self::Times, true) => b"Times-Bold",
            (Self::Courier, false) => b"Courier",
            (Self::Courier, true) => b"Courier-Bold",
        }
    }

    /// Approximate widths at 1000 units/em for WinAnsi chars 32..=255.
    fn widths(self, bold: bool) -> Vec<f32> {
        (32u8..=255u8)
            .map(|b| match self {
                Self::Courier => 600.0,
                Self::Helvetica => helvetica_width(b, bold),
                Self::Times => times_width(b, bold),
            })
            .collect()
    }
}

fn helvetica_width(b: u8, bold: bool) -> f32 {
    match (b, bold) {
        (32, _) => 278.0,
        (33..=47 | 58..=64, _) => 333.0,
        (48..=57, _) => 556.0,
        (73, _) => 278.0,
        (74, false) => 500.0,
        (74, true) => 556.0,
        (77, _) => 833.0,
        (87, _) => 944.0,
        (65..=90, false) => 667.0,
        (65..=90, true) => 722.0,
        (91..=96, _) => 333.0,
        (105 | 106 | 108, _) => 222.0 + if bold { 56.0 } else { 0.0 },
        (102 | 116, _) => 278.0 + if bold { 55.0 } else { 0.0 },
        (114, false) => 333.0,
        (114, true) => 389.0,
        (109, _) => 833.0 + if bold { 56.0 } else { 0.0 },
        (119, _) => 722.0 + if bold { 56.0 } else { 0.0 },
        (97..=122, false) => 556.0,
        (97..=122, true) => 611.0,
        (_, false) => 556.0,
        (_, true) => 611.0,
    }
}

fn times_width(b: u8, bold: bool) -> f32 {
    match (b, bold) {
        (32, _) => 250.0,
        (33..=47, _) => 333.0,
        (48..=57, _) => 500.0,
        (58..=64, _) => 278.0,
        (73, false) => 333.0,
        (73, true) => 389.0,
        (77, _) => 889.0 + if bold { 55.0 } else { 0.0 },
        (87, _) => 944.0 + if bold { 56.0 } else { 0.0 },
        (65..=90, false) => 667.0,
        (65..=90, true) => 722.0,
        (105 | 106 | 108, _) => 278.0,
        (102 | 116 | 114, false) => 333.0,
        (102 | 116 | 114, true) => 389.0,
        (109, _) => 778.0 + if bold { 55.0 } else { 0.0 },
        (119, _) => 722.0,
        (97..=122, false) => 444.0,
        (97..=122, true) => 500.0,
        (_, _) => 500.0,
    }
}

/// (lowercase family name, bold) -> (file path, face index within TTC)
type FontLookup = HashMap<(String, bool), (PathBuf, u32)>;

static FONT_INDEX: OnceLock<FontLookup> = OnceLock::new();

fn font_family_name(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::FAMILY && name.is_unicode())
        .find_map(|name| name.to_string())
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    if let Ok(val) = std::env::var("PHOTOREPORT_FONTS") {
        let sep = if cfg!(windows) { ';' } else { ':' };
        dirs.extend(
            val.split(sep)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        );
    }

    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Library/Fonts".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend(["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push("C:\\Windows\\Fonts".into());
        }
    }

    dirs
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf" | "ttc")
    )
}

fn is_font_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ttc"))
}

fn scan_font_dirs() -> FontLookup {
    let t0 = std::time::Instant::now();
    let mut index = FontLookup::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut files_scanned = 0u32;

    let mut stack = font_directories();
    while let Some(dir) = stack.pop() {
        if !visited.insert(dir.clone()) {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if !is_font_file(&path) {
                continue;
            }
            files_scanned += 1;
            let Ok(file) = std::fs::File::open(&path) else {
                continue;
            };
            // SAFETY: font files are opened read-only and only parsed while mapped
            let Ok(data) = (unsafe { Mmap::map(&file) }) else {
                continue;
            };
            let face_count = if is_font_collection(&path) {
                ttf_parser::fonts_in_collection(&data).unwrap_or(1)
            } else {
                1
            };
            for face_idx in 0..face_count {
                let Ok(face) = Face::parse(&data, face_idx) else {
                    continue;
                };
                if face.is_italic() {
                    continue;
                }
                if let Some(family) = font_family_name(&face) {
                    index
                        .entry((family.to_lowercase(), face.is_bold()))
                        .or_insert((path.clone(), face_idx));
                }
            }
        }
    }

    log::info!(
        "Font scan: {:.1}ms, {} files parsed → {} entries",
        t0.elapsed().as_secs_f64() * 1000.0,
        files_scanned,
        index.len(),
    );
    index
}

/// Look up a system font by family name. Falls back to the regular face when
/// no bold face is installed.
fn find_font_file(family: &str, bold: bool) -> Option<(PathBuf, u32)> {
    let index = FONT_INDEX.get_or_init(scan_font_dirs);
    let key = family.trim().to_lowercase();
    index
        .get(&(key.clone(), bold))
        .or_else(|| if bold { index.get(&(key, false)) } else { None })
        .cloned()
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert text to WinAnsi (Windows-1252) bytes; unmappable chars are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(char_to_winansi)
        .filter(|&b| b != 0)
        .collect()
}

/// Encode text as big-endian 2-byte glyph IDs for CIDFont content streams.
fn encode_as_gids(text: &str, char_to_gid: &HashMap<char, u16>) -> Vec<u8> {
    text.chars()
        .flat_map(|ch| char_to_gid.get(&ch).copied().unwrap_or(0).to_be_bytes())
        .collect()
}

struct TrueTypeMetrics {
    widths_1000: Vec<f32>,
    ascender_ratio: f32,
    char_to_gid: HashMap<char, u16>,
    char_widths_1000: HashMap<char, f32>,
}

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with
/// Identity-H encoding, subsetted to the characters the document uses.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    font_name: &str,
    font_data: &[u8],
    face_index: u32,
    used_chars: &HashSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<TrueTypeMetrics> {
    let face = Face::parse(font_data, face_index).ok()?;

    let units = face.units_per_em() as f32;
    let to_1000 = |v: f32| v / units * 1000.0;
    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        to_1000(bb.x_min as f32),
        to_1000(bb.y_min as f32),
        to_1000(bb.x_max as f32),
        to_1000(bb.y_max as f32),
    );

    let advance = |ch: char| {
        face.glyph_index(ch)
            .and_then(|gid| face.glyph_hor_advance(gid))
            .map(|adv| to_1000(adv as f32))
    };
    let widths_1000: Vec<f32> = (32u8..=255u8)
        .map(|byte| advance(winansi_to_char(byte)).unwrap_or(0.0))
        .collect();

    // Sorted so object output does not depend on hash order
    let mut chars: Vec<char> = used_chars.iter().copied().collect();
    chars.sort_unstable();

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = HashMap::new();
    let mut char_widths_1000 = HashMap::new();
    let mut gid_widths: Vec<(u16, f32)> = Vec::new();
    let mut cmap_pairs: Vec<(u16, char)> = Vec::new();
    for ch in chars {
        if let Some(gid) = face.glyph_index(ch) {
            let new_gid = remapper.remap(gid.0);
            let w = advance(ch).unwrap_or(0.0);
            char_to_gid.insert(ch, new_gid);
            char_widths_1000.insert(ch, w);
            gid_widths.push((new_gid, w));
            cmap_pairs.push((new_gid, ch));
        }
    }
    gid_widths.sort_by_key(|&(gid, _)| gid);
    gid_widths.dedup_by_key(|&mut (gid, _)| gid);

    let subset_data = subsetter::subset(font_data, face_index, &remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {font_name}: {e} — embedding full font");
        font_data.to_vec()
    });

    let descriptor_ref = alloc();
    let data_ref = alloc();
    let data_len = i32::try_from(subset_data.len()).ok()?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    let ps_name = font_name.replace(' ', "");

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(to_1000(face.ascender() as f32))
        .descent(to_1000(face.descender() as f32))
        .cap_height(face.capital_height().map(|h| to_1000(h as f32)).unwrap_or(700.0))
        .stem_v(80.0)
        .font_file2(data_ref);

    let system_info = pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };

    let cid_font_ref = alloc();
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(system_info);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let tounicode_ref = alloc();
    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    for &(gid, ch) in &cmap_pairs {
        cmap.pair(gid, ch);
    }
    pdf.stream(tounicode_ref, cmap.finish().as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Some(TrueTypeMetrics {
        widths_1000,
        ascender_ratio: face.ascender() as f32 / units,
        char_to_gid,
        char_widths_1000,
    })
}

fn builtin_entry(
    pdf: &mut Pdf,
    font_ref: Ref,
    pdf_name: String,
    family: StandardFamily,
    bold: bool,
) -> FontEntry {
    pdf.type1_font(font_ref)
        .base_font(Name(family.base_font(bold)))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    FontEntry {
        pdf_name,
        font_ref,
        widths_1000: family.widths(bold),
        ascender_ratio: None,
        char_to_gid: None,
        char_widths_1000: None,
    }
}

fn truetype_entry(pdf_name: String, font_ref: Ref, m: TrueTypeMetrics) -> FontEntry {
    FontEntry {
        pdf_name,
        font_ref,
        widths_1000: m.widths_1000,
        ascender_ratio: Some(m.ascender_ratio),
        char_to_gid: Some(m.char_to_gid),
        char_widths_1000: Some(m.char_widths_1000),
    }
}

/// Register the font for one style. Standard PDF families are referenced, not
/// embedded; anything else is embedded from the system font directories or
/// from the style's explicit font file. An explicit file that cannot be
/// loaded is an error; an unknown family falls back to Helvetica.
pub(crate) fn register_font(
    pdf: &mut Pdf,
    style: &TextStyle,
    pdf_name: String,
    alloc: &mut impl FnMut() -> Ref,
    used_chars: &HashSet<char>,
) -> Result<FontEntry, Error> {
    let t0 = std::time::Instant::now();
    let font_ref = alloc();
    let family = style.font_family.trim();

    let entry = if let Some(path) = &style.font_file {
        let data = std::fs::read(path)
            .map_err(|e| Error::Font(format!("cannot read {}: {e}", path.display())))?;
        let metrics = embed_truetype(pdf, font_ref, family, &data, 0, used_chars, alloc)
            .ok_or_else(|| Error::Font(format!("cannot parse {}", path.display())))?;
        truetype_entry(pdf_name, font_ref, metrics)
    } else if let Some(standard) = StandardFamily::from_family(family) {
        builtin_entry(pdf, font_ref, pdf_name, standard, style.bold)
    } else {
        let embedded = find_font_file(family, style.bold).and_then(|(path, face_index)| {
            let data = std::fs::read(&path).ok()?;
            embed_truetype(pdf, font_ref, family, &data, face_index, used_chars, alloc)
        });
        match embedded {
            Some(metrics) => truetype_entry(pdf_name, font_ref, metrics),
            None => {
                log::warn!("Font not found: {family} bold={} — using Helvetica", style.bold);
                builtin_entry(pdf, font_ref, pdf_name, StandardFamily::Helvetica, style.bold)
            }
        }
    };

    log::debug!(
        "register_font: {family} bold={} → {:.1}ms",
        style.bold,
        t0.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(entry)
}
