//! Layout configuration.
//!
//! Every value the layout engine uses is configurable. Lengths are millimetres
//! measured from the top-left corner of the page; font sizes are points.
//! The configuration is read from TOML, and every section falls back to its
//! defaults when omitted:
//!
//! ```toml
//! line_height_factor = 1.15
//!
//! [page]
//! width_mm = 210.0
//! height_mm = 297.0
//! margin_horizontal_mm = 15.0
//! margin_vertical_mm = 15.0
//!
//! [offsets]
//! last_vertical_shrink_mm = 10.0
//! trailing_pair_shrink_mm = 5.0
//!
//! [styles.description]
//! font_family = "Times"
//! size_pt = 9.0
//! alignment = "justify"
//! ```
//!
//! The `offsets` section holds heuristics rather than derived geometry: they
//! tune how a report looks when a page is visually full and may need
//! revisiting for page sizes other than A4.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::model::Alignment;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page: PageConfig,
    pub spacing: SpacingConfig,
    pub offsets: OffsetConfig,
    pub header: HeaderConfig,
    pub photo: PhotoConfig,
    pub signature: SignatureConfig,
    pub footer: FooterConfig,
    /// Line pitch as a multiple of the font size.
    pub line_height_factor: f32,
    pub styles: StyleTable,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_horizontal_mm: f32,
    pub margin_vertical_mm: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SpacingConfig {
    pub field_mm: f32,
    pub title_to_image_mm: f32,
    pub image_to_description_mm: f32,
    pub section_mm: f32,
    pub block_top_padding_mm: f32,
    pub header_mm: f32,
    pub logo_to_title_mm: f32,
    pub signature_image_gap_mm: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OffsetConfig {
    /// Taken off the last photo's block when it is vertical, leaving room for
    /// the signature underneath.
    pub last_vertical_shrink_mm: f32,
    /// Taken off each of the last two photos when both are horizontal.
    pub trailing_pair_shrink_mm: f32,
    pub min_image_height_mm: f32,
    /// Kept free below a lone first photo for the signature block.
    pub signature_reservation_mm: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub title: String,
    pub logo_height_mm: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// `{number}` is replaced by the photo's display number.
    pub label_format: String,
    pub border_width_mm: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    pub label: String,
    pub max_width_mm: f32,
    pub max_height_mm: f32,
    /// Distance from the bottom page edge to the label top when the last page
    /// is visually full.
    pub anchor_from_bottom_mm: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FooterConfig {
    /// `{page}` and `{pages}` are replaced by the page number and page count.
    pub format: String,
    pub top_mm: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub font_family: String,
    /// TrueType/OpenType file to embed instead of looking the family up.
    pub font_file: Option<PathBuf>,
    pub size_pt: f32,
    pub bold: bool,
    pub alignment: Alignment,
    pub color: Option<[u8; 3]>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StyleTable {
    pub title: TextStyle,
    pub label: TextStyle,
    pub value: TextStyle,
    pub photo_label: TextStyle,
    pub photo_title: TextStyle,
    pub description: TextStyle,
    pub signature_label: TextStyle,
    pub footer: TextStyle,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page: PageConfig::default(),
            spacing: SpacingConfig::default(),
            offsets: OffsetConfig::default(),
            header: HeaderConfig::default(),
            photo: PhotoConfig::default(),
            signature: SignatureConfig::default(),
            footer: FooterConfig::default(),
            line_height_factor: 1.15,
            styles: StyleTable::default(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        // A4 portrait
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_horizontal_mm: 15.0,
            margin_vertical_mm: 15.0,
        }
    }
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            field_mm: 2.0,
            title_to_image_mm: 2.0,
            image_to_description_mm: 2.0,
            section_mm: 8.0,
            block_top_padding_mm: 5.0,
            header_mm: 8.0,
            logo_to_title_mm: 4.0,
            signature_image_gap_mm: 2.0,
        }
    }
}

impl Default for OffsetConfig {
    fn default() -> Self {
        Self {
            last_vertical_shrink_mm: 10.0,
            trailing_pair_shrink_mm: 5.0,
            min_image_height_mm: 30.0,
            signature_reservation_mm: 20.0,
        }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            title: "PHOTOGRAPHIC REPORT".to_string(),
            logo_height_mm: 20.0,
        }
    }
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            label_format: "Photo {number}: ".to_string(),
            border_width_mm: 0.3,
        }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            label: "Signatures:".to_string(),
            max_width_mm: 60.0,
            max_height_mm: 20.0,
            anchor_from_bottom_mm: 29.0,
        }
    }
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            format: "Page {page} of {pages}".to_string(),
            top_mm: 8.0,
        }
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            font_file: None,
            size_pt: 10.0,
            bold: false,
            alignment: Alignment::Left,
            color: None,
        }
    }
}

impl TextStyle {
    fn sized(size_pt: f32, bold: bool, alignment: Alignment) -> Self {
        Self {
            size_pt,
            bold,
            alignment,
            ..Self::default()
        }
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self {
            title: TextStyle::sized(16.0, true, Alignment::Center),
            label: TextStyle::sized(10.0, true, Alignment::Left),
            value: TextStyle::sized(10.0, false, Alignment::Left),
            photo_label: TextStyle::sized(10.0, true, Alignment::Left),
            photo_title: TextStyle::sized(10.0, false, Alignment::Left),
            description: TextStyle::sized(9.0, false, Alignment::Justify),
            signature_label: TextStyle::sized(10.0, true, Alignment::Left),
            footer: TextStyle::sized(8.0, false, Alignment::Right),
        }
    }
}

impl StyleTable {
    pub fn iter(&self) -> impl Iterator<Item = &TextStyle> {
        [
            &self.title,
            &self.label,
            &self.value,
            &self.photo_label,
            &self.photo_title,
            &self.description,
            &self.signature_label,
            &self.footer,
        ]
        .into_iter()
    }
}

impl LayoutConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let config: LayoutConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn content_width_mm(&self) -> f32 {
        self.page.width_mm - 2.0 * self.page.margin_horizontal_mm
    }

    pub fn validate(&self) -> Result<(), Error> {
        let p = &self.page;
        if p.width_mm <= 0.0 || p.height_mm <= 0.0 {
            return Err(Error::Config(format!(
                "page size must be positive, got {}x{} mm",
                p.width_mm, p.height_mm
            )));
        }
        if p.margin_horizontal_mm < 0.0 || p.margin_vertical_mm < 0.0 {
            return Err(Error::Config("margins must not be negative".into()));
        }
        if self.content_width_mm() <= 0.0 {
            return Err(Error::Config(format!(
                "horizontal margins of {} mm leave no content width",
                p.margin_horizontal_mm
            )));
        }
        let usable = p.height_mm - 2.0 * p.margin_vertical_mm - self.spacing.block_top_padding_mm;
        if usable < self.offsets.min_image_height_mm {
            return Err(Error::Config(format!(
                "usable page height {usable:.1} mm is below the minimum image height of {} mm",
                self.offsets.min_image_height_mm
            )));
        }
        let sp = &self.spacing;
        let spacings = [
            ("field_mm", sp.field_mm),
            ("title_to_image_mm", sp.title_to_image_mm),
            ("image_to_description_mm", sp.image_to_description_mm),
            ("section_mm", sp.section_mm),
            ("block_top_padding_mm", sp.block_top_padding_mm),
            ("header_mm", sp.header_mm),
            ("logo_to_title_mm", sp.logo_to_title_mm),
            ("signature_image_gap_mm", sp.signature_image_gap_mm),
        ];
        let off = &self.offsets;
        let offsets = [
            ("last_vertical_shrink_mm", off.last_vertical_shrink_mm),
            ("trailing_pair_shrink_mm", off.trailing_pair_shrink_mm),
            ("min_image_height_mm", off.min_image_height_mm),
            ("signature_reservation_mm", off.signature_reservation_mm),
        ];
        if let Some((name, value)) = spacings
            .iter()
            .chain(offsets.iter())
            .find(|(_, v)| *v < 0.0 || v.is_nan())
        {
            return Err(Error::Config(format!("{name} must not be negative, got {value}")));
        }

        // Shrunk blocks still have to hold the padding and a minimum image.
        let min_block = sp.block_top_padding_mm + off.min_image_height_mm;
        let horizontal = (usable / 2.0).floor() - off.trailing_pair_shrink_mm;
        if horizontal < min_block {
            return Err(Error::Config(format!(
                "trailing_pair_shrink_mm of {} mm leaves a {horizontal:.1} mm landscape block, \
                 below the {min_block:.1} mm minimum",
                off.trailing_pair_shrink_mm
            )));
        }
        let vertical = usable.floor() - off.last_vertical_shrink_mm;
        if vertical < min_block {
            return Err(Error::Config(format!(
                "last_vertical_shrink_mm of {} mm leaves a {vertical:.1} mm portrait block, \
                 below the {min_block:.1} mm minimum",
                off.last_vertical_shrink_mm
            )));
        }

        if self.line_height_factor <= 0.0 {
            return Err(Error::Config("line_height_factor must be positive".into()));
        }
        if let Some(style) = self.styles.iter().find(|s| s.size_pt <= 0.0) {
            return Err(Error::Config(format!(
                "font size must be positive ({} at {} pt)",
                style.font_family, style.size_pt
            )));
        }
        if self.signature.max_width_mm <= 0.0 || self.signature.max_height_mm <= 0.0 {
            return Err(Error::Config("signature bounds must be positive".into()));
        }
        Ok(())
    }
}
