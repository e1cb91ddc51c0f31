mod background;
mod blocks;
mod cursor;
mod footer;
mod header;
mod layout;
mod signature;
mod surface;

use std::collections::{HashMap, HashSet};

use pdf_writer::{Content, Filter, Name, Pdf, Ref, TextStr};

use crate::cancel::CancelToken;
use crate::config::LayoutConfig;
use crate::error::Error;
use crate::fonts::{FontSet, font_key};
use crate::geometry::{PageGeometry, intrinsic_size};
use crate::model::{ImageFormat, ReportDocument, ReportImage};

use background::Background;
use surface::Surface;

pub use blocks::BlockPlacement;
pub use cursor::LayoutCursor;
pub use signature::SignaturePlacement;

/// An embedded image XObject and its intrinsic pixel size.
#[derive(Clone, Debug)]
pub(crate) struct ImageXObject {
    pub(crate) xobject: String,
    pub(crate) intrinsic: (f32, f32),
}

/// A finished report: the PDF bytes plus the geometry every block and the
/// signature were laid out with.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub blocks: Vec<BlockPlacement>,
    pub signature: SignaturePlacement,
}

/// Pages produced by the layout pass, before footers are stamped.
pub(crate) struct LaidOutDocument {
    pub(crate) pages: Vec<Content>,
    pub(crate) blocks: Vec<BlockPlacement>,
    pub(crate) signature: SignaturePlacement,
    pub(crate) geometry: PageGeometry,
}

pub(crate) use footer::stamp_footers;

/// Embedded images, by role.
#[derive(Default)]
pub(crate) struct Assets {
    pub(crate) background: Option<Background>,
    pub(crate) logo: Option<ImageXObject>,
    pub(crate) signature: Option<ImageXObject>,
    /// XObject name per active photo, `None` where embedding failed.
    pub(crate) photos: Vec<Option<String>>,
    xobjects: Vec<(String, Ref)>,
}

pub fn render(
    doc: &ReportDocument,
    config: &LayoutConfig,
    cancel: &CancelToken,
) -> Result<RenderedReport, Error> {
    config.validate()?;
    cancel.check()?;

    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    // Phase 1: fonts, subset to the characters each one will draw
    let used_chars = collect_used_chars(doc, config);
    let fonts = FontSet::register(&mut pdf, &config.styles, &mut alloc, &used_chars)?;
    let t_fonts = t0.elapsed();

    // Phase 1b: images
    let assets = embed_assets(&mut pdf, &mut alloc, doc, cancel)?;
    let t_images = t0.elapsed();

    // Phase 2: layout
    let laid_out = layout(doc, config, &fonts, &assets, cancel)?;
    let t_layout = t0.elapsed();

    // Phase 2b: footers, now that the page count is final
    let laid_out = stamp_footers(laid_out, &fonts, config);
    let t_footers = t0.elapsed();

    // Phase 3: page tree and resources
    let LaidOutDocument {
        pages,
        blocks,
        signature,
        geometry,
    } = laid_out;
    let n = pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, c) in pages.into_iter().enumerate() {
        let raw = c.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed)
            .filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    let title = document_title(doc, config);
    pdf.document_info(info_id)
        .title(TextStr(title))
        .producer(TextStr(concat!("photoreport-pdf ", env!("CARGO_PKG_VERSION"))));

    let font_pairs = fonts.resources();
    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(pdf_writer::Rect::new(
            0.0,
            0.0,
            geometry.width_pt(),
            geometry.height_pt(),
        ))
        .parent(pages_id)
        .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut fonts = resources.fonts();
            for (name, font_ref) in &font_pairs {
                fonts.pair(Name(name.as_bytes()), *font_ref);
            }
        }
        if !assets.xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &assets.xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    let t_assembly = t0.elapsed();

    log::info!(
        "Render phases: font_embed={:.1}ms, images={:.1}ms, layout={:.1}ms, footers={:.1}ms, assembly={:.1}ms",
        t_fonts.as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_layout - t_images).as_secs_f64() * 1000.0,
        (t_footers - t_layout).as_secs_f64() * 1000.0,
        (t_assembly - t_footers).as_secs_f64() * 1000.0,
    );

    Ok(RenderedReport {
        bytes: pdf.finish(),
        page_count: n,
        blocks,
        signature,
    })
}

/// First pass: header, fields, photo blocks and signature onto as many
/// pages as they need. Footers are left to [`stamp_footers`].
pub(crate) fn layout(
    doc: &ReportDocument,
    config: &LayoutConfig,
    fonts: &FontSet,
    assets: &Assets,
    cancel: &CancelToken,
) -> Result<LaidOutDocument, Error> {
    let geometry = PageGeometry::from_config(config);
    let mut surface = Surface::new(geometry, assets.background.clone());

    let title = document_title(doc, config);
    let cursor = header::render_header(&mut surface, fonts, config, title, assets.logo.as_ref());
    let cursor = header::render_fields(&mut surface, fonts, config, &doc.fields, cursor);

    let photos = doc.active_photos();
    let (cursor, blocks) = blocks::layout_photos(
        &mut surface,
        fonts,
        config,
        &photos,
        &assets.photos,
        cursor,
        cancel,
    )?;

    let signature =
        signature::render_signature(&mut surface, fonts, config, assets.signature.as_ref(), cursor);

    Ok(LaidOutDocument {
        pages: surface.finish(),
        blocks,
        signature,
        geometry,
    })
}

fn document_title<'a>(doc: &'a ReportDocument, config: &'a LayoutConfig) -> &'a str {
    doc.title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&config.header.title)
}

fn collect_used_chars(
    doc: &ReportDocument,
    config: &LayoutConfig,
) -> HashMap<String, HashSet<char>> {
    let styles = &config.styles;
    let mut used: HashMap<String, HashSet<char>> = HashMap::new();
    let mut add = |style: &crate::config::TextStyle, text: &str| {
        used.entry(font_key(style)).or_default().extend(text.chars());
    };

    add(&styles.title, document_title(doc, config));
    for (name, value) in &doc.fields {
        add(&styles.label, name.label());
        add(&styles.value, value);
    }
    for photo in doc.active_photos() {
        add(&styles.photo_title, &photo.entry.title);
        add(&styles.description, &photo.entry.description);
    }
    add(&styles.description, "\u{2026}");
    add(&styles.photo_label, &config.photo.label_format);
    add(&styles.photo_label, "0123456789");
    add(&styles.signature_label, &config.signature.label);
    add(&styles.footer, &config.footer.format);
    add(&styles.footer, "0123456789");
    used
}

fn embed_assets(
    pdf: &mut Pdf,
    alloc: &mut impl FnMut() -> Ref,
    doc: &ReportDocument,
    cancel: &CancelToken,
) -> Result<Assets, Error> {
    let mut assets = Assets::default();

    let mut embed = |img: &ReportImage, assets: &mut Assets| {
        let intrinsic = intrinsic_size(img)?;
        let xobj_ref = embed_image(&mut *pdf, &mut *alloc, img)?;
        let name = format!("Im{}", assets.xobjects.len() + 1);
        assets.xobjects.push((name.clone(), xobj_ref));
        Some(ImageXObject {
            xobject: name,
            intrinsic,
        })
    };

    if let Some(img) = &doc.background_image {
        assets.background = match embed(img, &mut assets) {
            Some(x) => Some(Background {
                xobject: x.xobject,
                intrinsic: x.intrinsic,
            }),
            None => {
                log::warn!("background: undecodable image, pages render without it");
                None
            }
        };
    }
    if let Some(img) = &doc.header_logo {
        assets.logo = embed(img, &mut assets);
        if assets.logo.is_none() {
            log::warn!("logo: undecodable image, title starts at the top margin");
        }
    }
    if let Some(img) = &doc.signature_image {
        assets.signature = embed(img, &mut assets);
        if assets.signature.is_none() {
            log::warn!("signature: undecodable image, drawing the label only");
        }
    }
    for photo in doc.active_photos() {
        cancel.check()?;
        let name = embed(&photo.entry.image, &mut assets).map(|x| x.xobject);
        if name.is_none() {
            log::warn!(
                "photo {}: undecodable image, drawing title and description only",
                photo.number
            );
        }
        assets.photos.push(name);
    }
    Ok(assets)
}

/// Write one image XObject. JPEG data is passed through once it decodes; PNG
/// is decoded and re-compressed as RGB with a soft mask when it has
/// transparency. Returns `None` for anything that cannot be decoded, without
/// allocating an object.
fn embed_image(pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref, img: &ReportImage) -> Option<Ref> {
    match img.format? {
        ImageFormat::Jpeg => {
            if !matches!(img.components, 1 | 3 | 4) {
                return None;
            }
            let reader = image::ImageReader::with_format(
                std::io::Cursor::new(&img.data),
                image::ImageFormat::Jpeg,
            );
            if let Err(e) = reader.decode() {
                log::debug!("JPEG decode failed: {e}");
                return None;
            }
            let xobj_ref = alloc();
            let mut xobj = pdf.image_xobject(xobj_ref, &img.data);
            xobj.filter(Filter::DctDecode);
            xobj.width(img.pixel_width as i32);
            xobj.height(img.pixel_height as i32);
            match img.components {
                1 => xobj.color_space().device_gray(),
                4 => xobj.color_space().device_cmyk(),
                _ => xobj.color_space().device_rgb(),
            };
            xobj.bits_per_component(8);
            Some(xobj_ref)
        }
        ImageFormat::Png => {
            let cursor = std::io::Cursor::new(&img.data);
            let reader = image::ImageReader::with_format(
                std::io::BufReader::new(cursor),
                image::ImageFormat::Png,
            );
            let decoded = match reader.decode() {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::debug!("PNG decode failed: {e}");
                    return None;
                }
            };
            let rgba: image::RgbaImage = decoded.to_rgba8();
            let (w, h) = (rgba.width(), rgba.height());
            let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

            let rgb_data: Vec<u8> = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

            let xobj_ref = alloc();
            let smask_ref = if has_alpha {
                let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w as i32);
                mask.height(h as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(mask_ref)
            } else {
                None
            };

            let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w as i32);
            xobj.height(h as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
            Some(xobj_ref)
        }
    }
}
