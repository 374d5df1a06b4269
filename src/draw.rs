//! Box and label rendering for annotated output frames.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;

use crate::evaluation::FrameMatch;
use crate::tracker::{Rect, TrackedBox};
use crate::via::GroundTruthBox;

pub const TRACK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const GT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const UNMATCHED_TRACK_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const TEXT_BG: Rgb<u8> = Rgb([0, 0, 0]);

const BOX_THICKNESS: i32 = 2;
const CHAR_WIDTH: i32 = 6;
const CHAR_HEIGHT: i32 = 7;

/// 5x7 bitmap glyphs, one row per byte, most significant of the low 5 bits on the left.
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        ' ' => [0; 7],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

fn put_pixel_checked(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Draw `text` with its top-left corner at (x, y) on a solid background.
pub fn draw_label(img: &mut RgbImage, text: &str, x: i32, y: i32, color: Rgb<u8>) {
    let text_width = text.chars().count() as i32 * CHAR_WIDTH + 2;
    for dy in 0..CHAR_HEIGHT + 2 {
        for dx in 0..text_width {
            put_pixel_checked(img, x + dx, y + dy, TEXT_BG);
        }
    }

    for (i, ch) in text.to_uppercase().chars().enumerate() {
        let char_x = x + 1 + i as i32 * CHAR_WIDTH;
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..5 {
                if (bits >> (4 - col)) & 1 == 1 {
                    put_pixel_checked(img, char_x + col, y + 1 + row as i32, color);
                }
            }
        }
    }
}

/// Draw a bounding box with a label above its top-left corner.
pub fn draw_bbox(img: &mut RgbImage, rect: &Rect, color: Rgb<u8>, label: &str) {
    let [x1, y1, x2, y2] = rect.to_tlbr();
    let (x1, y1, x2, y2) = (x1 as i32, y1 as i32, x2 as i32, y2 as i32);
    let width = (x2 - x1).max(1) as u32;
    let height = (y2 - y1).max(1) as u32;

    for offset in 0..BOX_THICKNESS {
        let r = imageproc::rect::Rect::at(x1 - offset, y1 - offset)
            .of_size(width + 2 * offset as u32, height + 2 * offset as u32);
        draw_hollow_rect_mut(img, r, color);
    }

    if !label.is_empty() {
        let label_y = (y1 - BOX_THICKNESS - CHAR_HEIGHT - 2).max(0);
        draw_label(img, label, x1, label_y, color);
    }
}

/// Draw every tracked box in the track colour, labelled with its id.
pub fn draw_tracked_boxes(img: &mut RgbImage, tracked: &[TrackedBox]) {
    for t in tracked {
        draw_bbox(img, &t.bbox, TRACK_COLOR, &format!("id : {}", t.track_id));
    }
}

/// Overlay ground truth and tracked boxes for visual inspection.
///
/// Tracked boxes without a ground-truth partner are drawn in a separate
/// colour so false tracks stand out.
pub fn draw_gt_tracking(
    img: &mut RgbImage,
    gt: &[GroundTruthBox],
    tracked: &[TrackedBox],
    frame_match: &FrameMatch,
    frame_number: u32,
) {
    for g in gt {
        draw_bbox(img, &g.bbox, GT_COLOR, &format!("gt id : {}", g.track_id));
    }
    for (idx, t) in tracked.iter().enumerate() {
        let color = if frame_match.false_tracks.contains(&idx) {
            UNMATCHED_TRACK_COLOR
        } else {
            TRACK_COLOR
        };
        draw_bbox(img, &t.bbox, color, &format!("id : {}", t.track_id));
    }
    draw_label(img, &format!("frame {}", frame_number), 2, 2, Rgb([255, 255, 255]));
}
