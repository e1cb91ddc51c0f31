use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// An encoded image as handed over by the caller. The pixel size is read from
/// the file header; the bitmap itself is only decoded when the PDF is written.
#[derive(Clone, Debug)]
pub struct ReportImage {
    pub data: Vec<u8>,
    pub format: Option<ImageFormat>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// JPEG colour components (1 = gray, 3 = RGB, 4 = CMYK). Always 3 for PNG.
    pub components: u8,
}

impl ReportImage {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        match image_dimensions(&data) {
            Some((w, h, format, components)) => Self {
                data,
                format: Some(format),
                pixel_width: w,
                pixel_height: h,
                components,
            },
            None => Self {
                data,
                format: None,
                pixel_width: 0,
                pixel_height: 0,
                components: 0,
            },
        }
    }

    /// Intrinsic size in pixels, `None` when the header could not be read.
    pub fn intrinsic_size(&self) -> Option<(u32, u32)> {
        (self.format.is_some() && self.pixel_width > 0 && self.pixel_height > 0)
            .then_some((self.pixel_width, self.pixel_height))
    }

    /// Portrait images are taller than wide; squares count as horizontal.
    pub fn is_vertical(&self) -> bool {
        self.pixel_height > self.pixel_width
    }
}

fn image_dimensions(data: &[u8]) -> Option<(u32, u32, ImageFormat, u8)> {
    // JPEG: starts with FF D8, size lives in the first SOFn segment
    if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8 {
        let mut i = 2;
        while i + 4 < data.len() {
            if data[i] != 0xFF {
                return None;
            }
            let marker = data[i + 1];
            if marker == 0xFF {
                i += 1; // fill byte
                continue;
            }
            if marker == 0xD9 || marker == 0xDA {
                break;
            }
            if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
                i += 2;
                continue;
            }
            let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            let is_sof = (0xC0..=0xCF).contains(&marker)
                && marker != 0xC4
                && marker != 0xC8
                && marker != 0xCC;
            if is_sof && i + 9 < data.len() {
                let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
                let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
                let components = data[i + 9];
                return Some((width, height, ImageFormat::Jpeg, components));
            }
            i += 2 + len;
        }
        return None;
    }

    // PNG: starts with 89 50 4E 47, dimensions in IHDR chunk at bytes 16-23
    if data.len() >= 24 && data[..4] == [0x89, 0x50, 0x4E, 0x47] {
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        return Some((width, height, ImageFormat::Png, 3));
    }

    None
}

/// Report metadata fields. Declaration order is the order they are printed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    #[serde(alias = "type")]
    ReportType,
    CaseNumber,
    Date,
    Time,
    Address,
    Subject,
    Signatories,
}

impl FieldName {
    pub fn label(self) -> &'static str {
        match self {
            FieldName::ReportType => "Type:",
            FieldName::CaseNumber => "Case number:",
            FieldName::Date => "Date:",
            FieldName::Time => "Time:",
            FieldName::Address => "Address:",
            FieldName::Subject => "Subject:",
            FieldName::Signatories => "Signatories:",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PhotoEntry {
    pub sequence_number: u32,
    pub title: String,
    pub description: String,
    pub image: ReportImage,
    pub is_active: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ReportDocument {
    pub title: Option<String>,
    pub fields: BTreeMap<FieldName, String>,
    pub header_logo: Option<ReportImage>,
    pub background_image: Option<ReportImage>,
    pub signature_image: Option<ReportImage>,
    pub photos: Vec<PhotoEntry>,
}

/// A photo that takes part in the layout, with its display number.
#[derive(Clone, Copy, Debug)]
pub struct ActivePhoto<'a> {
    pub number: usize,
    pub entry: &'a PhotoEntry,
}

impl ReportDocument {
    /// Active photos in traversal order, renumbered from 1.
    pub fn active_photos(&self) -> Vec<ActivePhoto<'_>> {
        self.photos
            .iter()
            .filter(|p| p.is_active)
            .enumerate()
            .map(|(i, entry)| ActivePhoto {
                number: i + 1,
                entry,
            })
            .collect()
    }

    pub fn case_number(&self) -> Option<&str> {
        self.fields
            .get(&FieldName::CaseNumber)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(w: u32, h: u32) -> Vec<u8> {
        let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&w.to_be_bytes());
        data.extend_from_slice(&h.to_be_bytes());
        data
    }

    fn photo(seq: u32, active: bool) -> PhotoEntry {
        PhotoEntry {
            sequence_number: seq,
            title: format!("t{seq}"),
            description: String::new(),
            image: ReportImage::from_bytes(png_header(4, 3)),
            is_active: active,
        }
    }

    #[test]
    fn reads_png_header_size() {
        let img = ReportImage::from_bytes(png_header(1000, 2000));
        assert_eq!(img.intrinsic_size(), Some((1000, 2000)));
        assert!(img.is_vertical());
    }

    #[test]
    fn square_is_horizontal() {
        let img = ReportImage::from_bytes(png_header(500, 500));
        assert!(!img.is_vertical());
    }

    #[test]
    fn garbage_has_no_size() {
        let img = ReportImage::from_bytes(b"not an image".to_vec());
        assert_eq!(img.intrinsic_size(), None);
        assert!(!img.is_vertical());
    }

    #[test]
    fn reads_jpeg_sof_after_app_segments() {
        let mut data = vec![0xFF, 0xD8];
        // APP0 with 14 bytes of payload
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        data.extend_from_slice(&[0u8; 14]);
        // SOF0: len, precision, height, width, components
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x03, 0x84, 0x06, 0x40, 0x01]);
        data.extend_from_slice(&[0u8; 12]);
        let img = ReportImage::from_bytes(data);
        assert_eq!(img.format, Some(ImageFormat::Jpeg));
        assert_eq!(img.intrinsic_size(), Some((1600, 900)));
        assert_eq!(img.components, 1);
    }

    #[test]
    fn active_photos_are_renumbered_in_order() {
        let doc = ReportDocument {
            photos: vec![photo(7, true), photo(3, false), photo(9, true), photo(1, true)],
            ..Default::default()
        };
        let active = doc.active_photos();
        let numbers: Vec<usize> = active.iter().map(|p| p.number).collect();
        let seqs: Vec<u32> = active.iter().map(|p| p.entry.sequence_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(seqs, vec![7, 9, 1]);
    }

    #[test]
    fn fields_iterate_in_declaration_order() {
        let mut doc = ReportDocument::default();
        doc.fields.insert(FieldName::Signatories, "A".into());
        doc.fields.insert(FieldName::ReportType, "B".into());
        doc.fields.insert(FieldName::Date, "C".into());
        let order: Vec<FieldName> = doc.fields.keys().copied().collect();
        assert_eq!(
            order,
            vec![FieldName::ReportType, FieldName::Date, FieldName::Signatories]
        );
    }
}
