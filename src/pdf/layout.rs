//! Page geometry for the chest-number sheets
//!
//! An A4 page is split into two equal horizontal halves, one record (label +
//! QR) per half, two consecutive numbers per page. All coordinates are PDF
//! points with the origin at the bottom-left corner of the page.

/// A4 in points.
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

/// One record occupies half a page.
pub const CARD_HEIGHT: f32 = PAGE_HEIGHT / 2.0;
pub const RECORDS_PER_PAGE: usize = 2;

pub const LEFT_PADDING: f32 = 40.0;
pub const RIGHT_PADDING: f32 = 30.0;

/// Rendered QR side length.
pub const QR_SIZE: f32 = 150.0;

pub const LABEL_SIZE_LARGE: f32 = 180.0;
pub const LABEL_SIZE_SMALL: f32 = 120.0;
pub const CAPTION_SIZE: f32 = 14.0;

/// Advance width of a Helvetica digit, in em. All digits share it, which
/// makes the label width exact without consulting font metrics at runtime.
const DIGIT_ADVANCE: f32 = 0.556;

/// Rough average advance for the bold caption text, in em.
const CAPTION_ADVANCE: f32 = 0.60;

/// Zero-padded label text for a number (width 3, wider numbers unpadded).
pub fn format_label(number: u32) -> String {
    format!("{:03}", number)
}

/// Labels longer than three digits drop to the smaller typeface.
pub fn label_font_size(label: &str) -> f32 {
    if label.len() > 3 {
        LABEL_SIZE_SMALL
    } else {
        LABEL_SIZE_LARGE
    }
}

/// Resolved positions for one record within its half of the page.
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    pub label_x: f32,
    pub label_y: f32,
    pub label_size: f32,
    pub caption_x: f32,
    pub caption_y: f32,
    pub qr_x: f32,
    pub qr_y: f32,
}

/// Compute the layout for the record in `half` (0 = top, 1 = bottom).
pub fn record_layout(label: &str, caption: &str, half: usize) -> RecordLayout {
    debug_assert!(half < RECORDS_PER_PAGE);
    let card_bottom = if half == 0 { CARD_HEIGHT } else { 0.0 };

    let label_size = label_font_size(label);
    // Baseline placed so the cap height is vertically centered in the card.
    let label_y = card_bottom + CARD_HEIGHT / 2.0 - label_size * 0.36;
    let label_width = label.len() as f32 * DIGIT_ADVANCE * label_size;

    // Caption sits under the label, right-aligned to its trailing edge.
    let caption_width = caption.len() as f32 * CAPTION_ADVANCE * CAPTION_SIZE;
    let caption_x = (LEFT_PADDING + label_width - caption_width).max(LEFT_PADDING);
    let caption_y = label_y - CAPTION_SIZE - 8.0;

    RecordLayout {
        label_x: LEFT_PADDING,
        label_y,
        label_size,
        caption_x,
        caption_y,
        qr_x: PAGE_WIDTH - RIGHT_PADDING - QR_SIZE,
        qr_y: card_bottom + (CARD_HEIGHT - QR_SIZE) / 2.0,
    }
}
