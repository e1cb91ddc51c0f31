#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use photoreport_pdf::{FieldName, PhotoEntry, RenderedReport, ReportDocument, ReportImage};

/// Bottom limit of every block on the default A4 page.
pub const A4_BOTTOM_LIMIT: f32 = 297.0 - 15.0;
/// Default signature anchor on A4.
pub const A4_SIGNATURE_ANCHOR: f32 = 297.0 - 29.0;

fn encode(img: image::DynamicImage, format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode test image");
    buf
}

/// Solid-colour PNG.
pub fn png(width: u32, height: u32) -> ReportImage {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 60, 40]));
    ReportImage::from_bytes(encode(img.into(), image::ImageFormat::Png))
}

/// PNG with a transparent left half.
pub fn translucent_png(width: u32, height: u32) -> ReportImage {
    let img = image::RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        image::Rgba([20, 20, 20, alpha])
    });
    ReportImage::from_bytes(encode(img.into(), image::ImageFormat::Png))
}

pub fn jpeg(width: u32, height: u32) -> ReportImage {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 140, 200]));
    ReportImage::from_bytes(encode(img.into(), image::ImageFormat::Jpeg))
}

/// A PNG whose header parses but whose pixel data is garbage.
pub fn broken_png(width: u32, height: u32) -> ReportImage {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 2, 0, 0, 0, 0xDE, 0xAD, 0xBE, 0xEF]);
    ReportImage::from_bytes(data)
}

/// A JPEG with a valid SOF0 header but no tables or scan data.
pub fn broken_jpeg(width: u16, height: u16) -> ReportImage {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08];
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&[0x03, 0x01, 0x11, 0x00, 0x02, 0x11, 0x00, 0x03, 0x11, 0x00]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    ReportImage::from_bytes(data)
}

pub fn garbage_image() -> ReportImage {
    ReportImage::from_bytes(b"definitely not an image".to_vec())
}

pub fn photo(title: &str, description: &str, image: ReportImage) -> PhotoEntry {
    PhotoEntry {
        sequence_number: 0,
        title: title.to_string(),
        description: description.to_string(),
        image,
        is_active: true,
    }
}

pub fn landscape(title: &str) -> PhotoEntry {
    photo(title, "", jpeg(160, 90))
}

pub fn portrait(title: &str) -> PhotoEntry {
    photo(title, "", jpeg(100, 200))
}

/// A report with the usual fields and the given photos, sequence numbers
/// assigned in order.
pub fn report(photos: Vec<PhotoEntry>) -> ReportDocument {
    let mut fields = BTreeMap::new();
    fields.insert(FieldName::CaseNumber, "2024-117".to_string());
    fields.insert(FieldName::Date, "12.03.2024".to_string());
    fields.insert(FieldName::Address, "12 Harbour Road".to_string());
    ReportDocument {
        title: None,
        fields,
        photos: photos
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                p.sequence_number = i as u32 + 1;
                p
            })
            .collect(),
        ..Default::default()
    }
}

pub fn long_text(sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("Sentence {i} describes the scene in some detail for the record."))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of page objects in the PDF.
pub fn page_objects(pdf: &[u8]) -> usize {
    count(pdf, b"/Type /Page") - count(pdf, b"/Type /Pages")
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Decompressed page content streams, in page order.
pub fn content_streams(pdf: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(start) = find(pdf, b"stream\n", pos) {
        let data_start = start + b"stream\n".len();
        let Some(end) = find(pdf, b"\nendstream", data_start) else {
            break;
        };
        pos = end + b"\nendstream".len();
        if start >= 3 && &pdf[start - 3..start] == b"end" {
            continue;
        }
        let Ok(raw) = miniz_oxide::inflate::decompress_to_vec_zlib(&pdf[data_start..end]) else {
            continue;
        };
        let text = String::from_utf8_lossy(&raw).into_owned();
        if text.contains(" Tj") {
            out.push(text);
        }
    }
    out
}

/// Baseline (PDF points from the page bottom) of the text object that shows
/// `text` as a single run.
pub fn baseline_of(stream: &str, text: &str) -> Option<f32> {
    let at = stream.find(&format!("({text}) Tj"))?;
    let td = stream[..at].trim_end().lines().last()?;
    let mut parts = td.split_whitespace();
    let (_x, y, op) = (parts.next()?, parts.next()?, parts.next()?);
    (op == "Td").then(|| y.parse().ok()).flatten()
}

/// Every block lies above the bottom margin.
pub fn assert_blocks_within_margin(report: &RenderedReport, bottom_limit: f32) {
    for block in &report.blocks {
        assert!(
            block.bottom() <= bottom_limit + 1e-3,
            "photo {} ends at {:.2}mm, below {bottom_limit}mm",
            block.number,
            block.bottom()
        );
        if let Some(img) = block.image {
            assert!(img.bottom() <= block.bottom() + 1e-3);
        }
    }
}

/// Keep a copy of generated PDFs under tests/output for manual inspection.
pub fn save_output(name: &str, bytes: &[u8]) {
    let dir = PathBuf::from("tests/output");
    fs::create_dir_all(&dir).ok();
    fs::write(dir.join(format!("{name}.pdf")), bytes).ok();
}
