mod common;

use common::{A4_BOTTOM_LIMIT, A4_SIGNATURE_ANCHOR};
use photoreport_pdf::geometry::{PageGeometry, background_size};
use photoreport_pdf::{LayoutConfig, render_report};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}

#[test]
fn single_portrait_photo_anchors_signature() {
    let doc = common::report(vec![common::photo("Front door", "", common::jpeg(1000, 2000))]);
    let out = render_report(&doc, &LayoutConfig::default()).expect("render");
    common::save_output("single_portrait", &out.bytes);

    assert_eq!(out.page_count, 1);
    assert_eq!(common::page_objects(&out.bytes), 1);

    let block = &out.blocks[0];
    assert!(block.is_vertical);
    assert_eq!(block.page_index, 0);
    // Grows into the free space, less the signature reservation and the
    // last-vertical shrink.
    assert!(approx(block.height, A4_BOTTOM_LIMIT - block.top - 20.0 - 10.0));

    assert!(out.signature.anchored);
    assert_eq!(out.signature.page_index, 0);
    assert!(approx(out.signature.label_top, A4_SIGNATURE_ANCHOR));
    common::assert_blocks_within_margin(&out, A4_BOTTOM_LIMIT);
}

#[test]
fn two_landscape_photos_both_shrink() {
    let doc = common::report(vec![common::landscape("Street"), common::landscape("Porch")]);
    let out = render_report(&doc, &LayoutConfig::default()).expect("render");

    let [first, second] = out.blocks.as_slice() else {
        panic!("expected two blocks, got {}", out.blocks.len());
    };
    assert!(!first.is_vertical && !second.is_vertical);
    // First block fills the page below the header, then gives up 5mm.
    assert!(approx(first.height, A4_BOTTOM_LIMIT - first.top - 5.0));
    // Horizontal reference height floor(262 / 2) less 5mm.
    assert!(approx(second.height, 126.0));

    assert_eq!(second.page_index, 1);
    assert!(approx(second.top, 15.0));
    assert_eq!(out.page_count, 2);

    // One landscape photo on the last page: signature follows the cursor.
    assert!(!out.signature.anchored);
    assert!(approx(out.signature.label_top, 15.0 + 126.0 + 8.0));
    common::assert_blocks_within_margin(&out, A4_BOTTOM_LIMIT);
}

#[test]
fn trailing_pair_on_last_page_anchors_signature() {
    let doc = common::report(vec![
        common::landscape("Overview"),
        common::landscape("Window"),
        common::landscape("Lock"),
    ]);
    let out = render_report(&doc, &LayoutConfig::default()).expect("render");

    assert_eq!(out.page_count, 2);
    assert_eq!(out.blocks[0].page_index, 0);
    assert!(approx(out.blocks[0].bottom(), A4_BOTTOM_LIMIT));
    assert_eq!(out.blocks[1].page_index, 1);
    assert_eq!(out.blocks[2].page_index, 1);
    assert!(approx(out.blocks[1].height, 126.0));
    assert!(approx(out.blocks[2].height, 126.0));
    assert!(approx(out.blocks[2].bottom(), 267.0));

    assert!(out.signature.anchored);
    assert_eq!(out.signature.page_index, 1);
    assert!(approx(out.signature.label_top, A4_SIGNATURE_ANCHOR));
}

#[test]
fn alternating_orientations_stamp_every_page() {
    let desc = common::long_text(12);
    let photos = (0..5)
        .map(|i| {
            let image = if i % 2 == 0 {
                common::jpeg(160, 90)
            } else {
                common::jpeg(90, 160)
            };
            common::photo(&format!("View {}", i + 1), &desc, image)
        })
        .collect();
    let doc = common::report(photos);
    let out = render_report(&doc, &LayoutConfig::default()).expect("render");
    common::save_output("alternating", &out.bytes);

    let n = out.page_count;
    assert!(n >= 3, "expected several pages, got {n}");
    assert_eq!(common::page_objects(&out.bytes), n);

    let streams = common::content_streams(&out.bytes);
    assert_eq!(streams.len(), n);
    for (i, stream) in streams.iter().enumerate() {
        let footer = format!("(Page {} of {n}) Tj", i + 1);
        assert!(stream.contains(&footer), "page {} lacks {footer:?}", i + 1);
        assert_eq!(stream.matches(" of ").count(), 1);
    }

    let verticals: Vec<bool> = out.blocks.iter().map(|b| b.is_vertical).collect();
    assert_eq!(verticals, [false, true, false, true, false]);
    common::assert_blocks_within_margin(&out, A4_BOTTOM_LIMIT);
}

#[test]
fn wide_background_fills_page_height() {
    let config = LayoutConfig::default();
    let page = PageGeometry::from_config(&config);
    let (w, h) = background_size(&page, (300.0, 100.0));
    assert!(approx(h, 297.0));
    assert!(approx(w, 891.0));

    let mut doc = common::report(vec![common::landscape("Yard"), common::landscape("Shed")]);
    doc.background_image = Some(common::png(300, 100));
    let out = render_report(&doc, &config).expect("render");
    common::save_output("background", &out.bytes);

    let streams = common::content_streams(&out.bytes);
    assert_eq!(streams.len(), out.page_count);
    for stream in &streams {
        let bg = stream.find("/Im1 Do").expect("background drawn on every page");
        let text = stream.find("BT").expect("page has text");
        assert!(bg < text, "background must be painted first");
    }
}
