use pdf_writer::{Content, Name};

use crate::geometry::{PageGeometry, background_size, mm_to_pt};

/// An embedded full-bleed background and its intrinsic pixel size.
#[derive(Clone, Debug)]
pub(crate) struct Background {
    pub(crate) xobject: String,
    pub(crate) intrinsic: (f32, f32),
}

/// Paint the background anchored at the page's top-left corner. Must run
/// before anything else is drawn on the page.
pub(crate) fn paint_background(content: &mut Content, bg: &Background, geom: &PageGeometry) {
    let (w, h) = background_size(geom, bg.intrinsic);
    let (w_pt, h_pt) = (mm_to_pt(w), mm_to_pt(h));
    content.save_state();
    content.transform([w_pt, 0.0, 0.0, h_pt, 0.0, geom.height_pt() - h_pt]);
    content.x_object(Name(bg.xobject.as_bytes()));
    content.restore_state();
}
