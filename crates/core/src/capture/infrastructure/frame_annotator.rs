use font8x8::{UnicodeFonts, BASIC_FONTS};

use crate::detection::domain::face_detection::FaceDetection;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

const DEFAULT_BOX_COLOR: [u8; 3] = [0, 0, 255];
const DEFAULT_LANDMARK_COLOR: [u8; 3] = [0, 255, 0];
const LABEL_TEXT_COLOR: [u8; 3] = [255, 255, 255];
/// font8x8 glyphs are 8x8 cells.
const GLYPH_SIZE: i32 = 8;

/// Draws face boxes, landmark dots and text labels directly into RGB frames.
#[derive(Clone, Debug)]
pub struct FrameAnnotator {
    box_color: [u8; 3],
    landmark_color: [u8; 3],
    /// Outline thickness in pixels; landmark dots are twice this size.
    thickness: u32,
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self {
            box_color: DEFAULT_BOX_COLOR,
            landmark_color: DEFAULT_LANDMARK_COLOR,
            thickness: 2,
        }
    }
}

impl FrameAnnotator {
    pub fn new(box_color: [u8; 3], landmark_color: [u8; 3], thickness: u32) -> Self {
        Self {
            box_color,
            landmark_color,
            thickness: thickness.max(1),
        }
    }

    /// Scales line thickness with the frame so annotations stay visible on
    /// large photos.
    pub fn for_frame(frame: &Frame) -> Self {
        let thickness = (frame.width().max(frame.height()) / 320).max(2);
        Self {
            thickness,
            ..Self::default()
        }
    }

    pub fn annotate<'a>(&self, frame: &mut Frame, faces: impl IntoIterator<Item = &'a FaceDetection>) {
        if frame.channels() < 3 {
            return;
        }
        let t = self.thickness as i32;
        for face in faces {
            let b = face.bbox;
            self.fill(frame, BoundingBox::new(b.x, b.y, b.width, t), self.box_color);
            self.fill(frame, BoundingBox::new(b.x, b.bottom() - t, b.width, t), self.box_color);
            self.fill(frame, BoundingBox::new(b.x, b.y, t, b.height), self.box_color);
            self.fill(frame, BoundingBox::new(b.right() - t, b.y, t, b.height), self.box_color);

            if let Some(landmarks) = &face.landmarks {
                for (_, (x, y)) in landmarks.visible() {
                    let dot = BoundingBox::new(x.round() as i32 - t, y.round() as i32 - t, 2 * t, 2 * t);
                    self.fill(frame, dot, self.landmark_color);
                }
            }
        }
    }

    /// Draws `text` on a box-colored strip just above `anchor`, or inside its
    /// top edge when there is no room above. Glyphs scale with thickness.
    pub fn draw_label(&self, frame: &mut Frame, anchor: &BoundingBox, text: &str) {
        if frame.channels() < 3 || text.is_empty() {
            return;
        }
        let scale = self.label_scale();
        let glyph = GLYPH_SIZE * scale;
        let chars = text.chars().count() as i32;
        let strip = BoundingBox::new(
            anchor.x.max(0),
            anchor.y - glyph - 2 * scale,
            chars * glyph + 2 * scale,
            glyph + 2 * scale,
        );
        let strip = if strip.y < 0 {
            BoundingBox { y: anchor.y.max(0), ..strip }
        } else {
            strip
        };
        self.fill(frame, strip, self.box_color);

        let (mut pen_x, pen_y) = (strip.x + scale, strip.y + scale);
        for c in text.chars() {
            let Some(rows) = BASIC_FONTS.get(c).or_else(|| BASIC_FONTS.get('?')) else {
                pen_x += glyph;
                continue;
            };
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_SIZE {
                    if *bits & (1u8 << col) != 0 {
                        let dot = BoundingBox::new(
                            pen_x + col * scale,
                            pen_y + row as i32 * scale,
                            scale,
                            scale,
                        );
                        self.fill(frame, dot, LABEL_TEXT_COLOR);
                    }
                }
            }
            pen_x += glyph;
        }
    }

    fn label_scale(&self) -> i32 {
        (self.thickness as i32 / 2).max(1)
    }

    fn fill(&self, frame: &mut Frame, rect: BoundingBox, color: [u8; 3]) {
        let Some(r) = rect.clamped(frame.width(), frame.height()) else {
            return;
        };
        let mut pixels = frame.as_ndarray_mut();
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                for (c, value) in color.iter().enumerate() {
                    pixels[[y as usize, x as usize, c]] = *value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_landmarks::FaceLandmarks;

    fn black(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let a = frame.as_ndarray();
        [a[[y, x, 0]], a[[y, x, 1]], a[[y, x, 2]]]
    }

    #[test]
    fn test_draws_box_outline_only() {
        let mut frame = black(50, 50);
        let face = FaceDetection::new(BoundingBox::new(10, 10, 20, 20), 0.9, None);
        FrameAnnotator::default().annotate(&mut frame, [&face]);

        assert_eq!(pixel(&frame, 10, 10), DEFAULT_BOX_COLOR);
        assert_eq!(pixel(&frame, 29, 29), DEFAULT_BOX_COLOR);
        assert_eq!(pixel(&frame, 20, 11), DEFAULT_BOX_COLOR);
        assert_eq!(pixel(&frame, 20, 20), [0, 0, 0]);
        assert_eq!(pixel(&frame, 5, 5), [0, 0, 0]);
    }

    #[test]
    fn test_draws_visible_landmarks() {
        let mut frame = black(50, 50);
        let mut pts = [(0.0, 0.0); 5];
        pts[2] = (20.0, 20.0);
        let face = FaceDetection::new(
            BoundingBox::new(10, 10, 20, 20),
            0.9,
            Some(FaceLandmarks::new(pts)),
        );
        FrameAnnotator::default().annotate(&mut frame, [&face]);
        assert_eq!(pixel(&frame, 20, 20), DEFAULT_LANDMARK_COLOR);
        assert_eq!(pixel(&frame, 15, 15), [0, 0, 0]);
    }

    #[test]
    fn test_box_partly_outside_frame_is_clipped() {
        let mut frame = black(20, 20);
        let face = FaceDetection::new(BoundingBox::new(-5, -5, 15, 40), 0.9, None);
        FrameAnnotator::default().annotate(&mut frame, [&face]);
        assert_eq!(pixel(&frame, 8, 10), DEFAULT_BOX_COLOR);
    }

    #[test]
    fn test_thickness_scales_with_frame() {
        let big = black(1920, 10);
        assert_eq!(FrameAnnotator::for_frame(&big).thickness, 6);
        assert_eq!(FrameAnnotator::for_frame(&black(100, 100)).thickness, 2);
    }

    fn count(frame: &Frame, region: BoundingBox, color: [u8; 3]) -> usize {
        (region.y..region.bottom())
            .flat_map(|y| (region.x..region.right()).map(move |x| (x as usize, y as usize)))
            .filter(|&(x, y)| pixel(frame, x, y) == color)
            .count()
    }

    #[test]
    fn test_label_painted_above_box() {
        let mut frame = black(80, 60);
        let anchor = BoundingBox::new(10, 30, 40, 20);
        FrameAnnotator::default().draw_label(&mut frame, &anchor, "hi");

        // 2 glyphs at scale 1 plus 1px padding: 18x10 strip ending at y=30.
        let strip = BoundingBox::new(10, 20, 18, 10);
        let text = count(&frame, strip, LABEL_TEXT_COLOR);
        let background = count(&frame, strip, DEFAULT_BOX_COLOR);
        assert!(text > 0);
        assert_eq!(text + background, 18 * 10);
        assert_eq!(count(&frame, BoundingBox::new(0, 0, 80, 20), [0, 0, 0]), 80 * 20);
        assert_eq!(pixel(&frame, 30, 40), [0, 0, 0]);
    }

    #[test]
    fn test_label_moves_inside_box_at_top_edge() {
        let mut frame = black(80, 60);
        let anchor = BoundingBox::new(5, 2, 40, 30);
        FrameAnnotator::default().draw_label(&mut frame, &anchor, "a");

        let strip = BoundingBox::new(5, 2, 10, 10);
        assert!(count(&frame, strip, LABEL_TEXT_COLOR) > 0);
        assert_eq!(pixel(&frame, 5, 2), DEFAULT_BOX_COLOR);
        assert_eq!(pixel(&frame, 5, 1), [0, 0, 0]);
    }

    #[test]
    fn test_label_glyphs_scale_with_thickness() {
        let mut frame = black(200, 100);
        let anchor = BoundingBox::new(10, 60, 40, 20);
        let annotator = FrameAnnotator::new(DEFAULT_BOX_COLOR, DEFAULT_LANDMARK_COLOR, 6);
        annotator.draw_label(&mut frame, &anchor, "x");

        // scale 3: 24px glyph plus 3px padding on each side
        let strip = BoundingBox::new(10, 30, 30, 30);
        let text = count(&frame, strip, LABEL_TEXT_COLOR);
        assert_eq!(text % 9, 0);
        assert_eq!(text + count(&frame, strip, DEFAULT_BOX_COLOR), 30 * 30);
    }

    #[test]
    fn test_grayscale_frame_untouched() {
        let mut frame = Frame::new(vec![0u8; 100], 10, 10, 1, 0);
        let face = FaceDetection::new(BoundingBox::new(0, 0, 10, 10), 0.9, None);
        FrameAnnotator::default().annotate(&mut frame, [&face]);
        assert!(frame.data().iter().all(|&v| v == 0));
    }
}
