//! Report manifests.
//!
//! A manifest is a JSON description of one report. Image entries are paths
//! relative to the manifest; the manifest can also travel as a `.zip` bundle
//! holding `report.json` next to the images it references.
//!
//! ```json
//! {
//!   "title": "PHOTOGRAPHIC REPORT",
//!   "fields": { "case_number": "2024-117", "address": "12 Harbour Road" },
//!   "logo": "logo.png",
//!   "signature": "signature.png",
//!   "photos": [
//!     { "title": "Front door", "description": "Lock forced.", "image": "p1.jpg" },
//!     { "title": "Hallway", "image": "p2.jpg", "active": false }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::model::{FieldName, PhotoEntry, ReportDocument, ReportImage};

/// Name of the manifest inside a bundle.
pub const BUNDLE_MANIFEST: &str = "report.json";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    fields: BTreeMap<FieldName, String>,
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    photos: Vec<PhotoManifest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PhotoManifest {
    #[serde(default)]
    sequence_number: Option<u32>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    image: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

/// Where manifest image paths are resolved.
enum ImageSource {
    Directory(PathBuf),
    Bundle(zip::ZipArchive<File>),
}

impl ImageSource {
    fn read(&mut self, rel: &str) -> std::io::Result<Vec<u8>> {
        match self {
            ImageSource::Directory(base) => std::fs::read(base.join(rel)),
            ImageSource::Bundle(zip) => {
                let mut entry = zip
                    .by_name(rel.trim_start_matches("./"))
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                Ok(data)
            }
        }
    }

    fn optional(&mut self, rel: Option<&str>, role: &str) -> Option<ReportImage> {
        let rel = rel?;
        match self.read(rel) {
            Ok(data) => Some(ReportImage::from_bytes(data)),
            Err(e) => {
                log::warn!("{role} image {rel} not loaded: {e}");
                None
            }
        }
    }
}

/// Load a report from a JSON manifest or a `.zip` bundle.
pub fn load(path: &Path) -> Result<ReportDocument, Error> {
    let is_bundle = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_bundle {
        load_bundle(path)
    } else {
        let json = std::fs::read_to_string(path).map_err(|e| open_error(e, path))?;
        let base = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        from_json_str(&json, base)
    }
}

/// Parse a manifest whose image paths are relative to `base_dir`.
pub fn from_json_str(json: &str, base_dir: impl Into<PathBuf>) -> Result<ReportDocument, Error> {
    let manifest: Manifest = serde_json::from_str(json)?;
    Ok(build(manifest, ImageSource::Directory(base_dir.into())))
}

fn load_bundle(path: &Path) -> Result<ReportDocument, Error> {
    let file = File::open(path).map_err(|e| open_error(e, path))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut json = String::new();
    zip.by_name(BUNDLE_MANIFEST)
        .map_err(|_| Error::InvalidManifest(format!("bundle has no {BUNDLE_MANIFEST}")))?
        .read_to_string(&mut json)?;
    let manifest: Manifest = serde_json::from_str(&json)?;
    Ok(build(manifest, ImageSource::Bundle(zip)))
}

fn open_error(e: std::io::Error, path: &Path) -> Error {
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
        ),
        _ => Error::Io(e),
    }
}

fn build(manifest: Manifest, mut source: ImageSource) -> ReportDocument {
    let header_logo = source.optional(manifest.logo.as_deref(), "logo");
    let background_image = source.optional(manifest.background.as_deref(), "background");
    let signature_image = source.optional(manifest.signature.as_deref(), "signature");

    let photos = manifest
        .photos
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            // A missing file still yields a block with its title and description.
            let data = source.read(&p.image).unwrap_or_else(|e| {
                log::warn!("photo image {} not loaded: {e}", p.image);
                Vec::new()
            });
            PhotoEntry {
                sequence_number: p.sequence_number.unwrap_or(i as u32 + 1),
                title: p.title,
                description: p.description,
                image: ReportImage::from_bytes(data),
                is_active: p.active,
            }
        })
        .collect();

    ReportDocument {
        title: manifest.title,
        fields: manifest.fields,
        header_logo,
        background_image,
        signature_image,
        photos,
    }
}
