/// Vertical layout state threaded through every renderer. Each renderer takes
/// the cursor by value and returns the updated one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutCursor {
    /// Top of the next free area on the current page, in mm from the page top.
    pub y: f32,
    /// Photo blocks drawn on the current page.
    pub page_photo_count: usize,
    /// Whether any of those blocks holds a vertical photo.
    pub page_has_vertical_photo: bool,
}

impl LayoutCursor {
    pub fn at(y: f32) -> Self {
        Self {
            y,
            page_photo_count: 0,
            page_has_vertical_photo: false,
        }
    }

    pub fn advanced(self, dy: f32) -> Self {
        Self {
            y: self.y + dy,
            ..self
        }
    }

    /// State at the top of a freshly started page.
    pub fn on_new_page(top: f32) -> Self {
        Self::at(top)
    }

    pub fn after_block(self, height: f32, is_vertical: bool) -> Self {
        Self {
            y: self.y + height,
            page_photo_count: self.page_photo_count + 1,
            page_has_vertical_photo: self.page_has_vertical_photo || is_vertical,
        }
    }

    /// The current page is visually full: one vertical photo, or two
    /// horizontal ones.
    pub fn page_is_full(&self) -> bool {
        (self.page_photo_count == 1 && self.page_has_vertical_photo)
            || (self.page_photo_count == 2 && !self.page_has_vertical_photo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_bookkeeping_accumulates() {
        let c = LayoutCursor::at(15.0)
            .after_block(100.0, false)
            .after_block(50.0, true);
        assert_eq!(c.y, 165.0);
        assert_eq!(c.page_photo_count, 2);
        assert!(c.page_has_vertical_photo);
        assert!(!c.page_is_full());
    }

    #[test]
    fn full_page_cases() {
        assert!(LayoutCursor::at(0.0).after_block(10.0, true).page_is_full());
        assert!(!LayoutCursor::at(0.0).after_block(10.0, false).page_is_full());
        let two_horizontal = LayoutCursor::at(0.0)
            .after_block(10.0, false)
            .after_block(10.0, false);
        assert!(two_horizontal.page_is_full());
    }

    #[test]
    fn new_page_resets_bookkeeping() {
        let c = LayoutCursor::on_new_page(15.0);
        assert_eq!(c, LayoutCursor::at(15.0));
        assert_eq!(c.page_photo_count, 0);
    }
}
