//! YOLO face-pose detector over ONNX Runtime.
//!
//! Letterbox preprocessing, inference, confidence filtering, greedy NMS and
//! keypoint decoding. Output boxes are in source frame coordinates.
use std::path::Path;

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::build_session;
use super::math::nms;

/// Fallback input resolution when the model shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

/// 5 landmarks × (x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// Gray used for letterbox padding.
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model. The input size is read from the NCHW input shape.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!("YOLO input size {input_size}, confidence {confidence}");
        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        let (input, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("YOLO output is not contiguous")?;

        let candidates = decode_rows(data, shape[1], shape[2], self.confidence, &letterbox);
        Ok(suppress(candidates))
    }
}

/// Scale and padding applied by [`letterbox`], needed to map back.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame into a `target_size` square NCHW tensor in [0, 1].
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let gray_source = frame.channels() < 3;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                let sc = if gray_source { 0 } else { c };
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, sc]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

/// Parse raw output rows above `confidence`.
///
/// The output is `[1, features, detections]` (transposed) or
/// `[1, detections, features]`; the smaller axis is the feature axis.
/// Row layout: `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
fn decode_rows(
    data: &[f32],
    dim1: usize,
    dim2: usize,
    confidence: f64,
    letterbox: &Letterbox,
) -> Vec<FaceDetection> {
    let transposed = dim1 < dim2;
    let (num_dets, num_feats) = if transposed { (dim2, dim1) } else { (dim1, dim2) };
    if num_feats < 5 {
        return Vec::new();
    }
    let value = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[idx] as f64
    };

    let mut detections = Vec::new();
    for i in 0..num_dets {
        let score = value(i, 4);
        if score < confidence {
            continue;
        }
        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);

        let landmarks = (num_feats >= 5 + NUM_KEYPOINT_VALUES).then(|| {
            let mut pts = [(0.0f64, 0.0f64); 5];
            for (k, pt) in pts.iter_mut().enumerate() {
                let base = 5 + k * 3;
                if value(i, base + 2) >= KEYPOINT_CONF_THRESH {
                    *pt = letterbox.unmap(value(i, base), value(i, base + 1));
                }
            }
            FaceLandmarks::new(pts)
        });

        detections.push(FaceDetection::new(
            BoundingBox::from_corners(x1, y1, x2, y2),
            score,
            landmarks,
        ));
    }
    detections
}

fn suppress(candidates: Vec<FaceDetection>) -> Vec<FaceDetection> {
    let boxes: Vec<[f64; 4]> = candidates
        .iter()
        .map(|d| {
            [
                d.bbox.x as f64,
                d.bbox.y as f64,
                d.bbox.right() as f64,
                d.bbox.bottom() as f64,
            ]
        })
        .collect();
    let scores: Vec<f64> = candidates.iter().map(|d| d.score).collect();
    let keep = nms(&boxes, &scores, NMS_IOU_THRESH);
    keep.into_iter().map(|i| candidates[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IDENTITY: Letterbox = Letterbox {
        scale: 1.0,
        pad_x: 0,
        pad_y: 0,
    };

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // scale = min(640/200, 640/100) = 3.2, new 640x320, pad_y 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2, epsilon = 0.01);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized_and_padded() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        let y = lb.pad_y as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, 1]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], PAD_VALUE, epsilon = 0.01);
    }

    #[test]
    fn test_letterbox_single_channel_is_replicated() {
        let frame = Frame::new(vec![51u8; 10 * 10], 10, 10, 1, 0);
        let (tensor, _) = letterbox(&frame, 20);
        for c in 0..3 {
            assert_relative_eq!(tensor[[0, c, 5, 5]], 0.2, epsilon = 0.01);
        }
    }

    #[test]
    fn test_unmap_inverts_letterbox() {
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 10,
            pad_y: 20,
        };
        assert_eq!(lb.unmap(30.0, 40.0), (10.0, 10.0));
    }

    /// Row-major `[detections, features]` output, padded with empty rows so
    /// the detection axis is the longer one.
    fn row_major(rows: &[Vec<f32>], feats: usize) -> (Vec<f32>, usize) {
        let num_dets = rows.len().max(feats + 1);
        let mut data = vec![0.0f32; num_dets * feats];
        for (i, row) in rows.iter().enumerate() {
            data[i * feats..i * feats + row.len()].copy_from_slice(row);
        }
        (data, num_dets)
    }

    #[test]
    fn test_decode_rows_row_major_filters_by_confidence() {
        let rows = vec![
            vec![50.0, 50.0, 20.0, 20.0, 0.9],
            vec![10.0, 10.0, 4.0, 4.0, 0.1],
        ];
        let (data, num_dets) = row_major(&rows, 5);
        let dets = decode_rows(&data, num_dets, 5, 0.25, &IDENTITY);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox, BoundingBox::new(40, 40, 20, 20));
        assert_relative_eq!(dets[0].score, 0.9, epsilon = 1e-6);
        assert!(dets[0].landmarks.is_none());
    }

    #[test]
    fn test_decode_rows_transposed_layout() {
        // 5 features × 6 detections; only detection 3 is confident
        let mut data = vec![0.0f32; 5 * 6];
        let set = |data: &mut Vec<f32>, feat: usize, val: f32| data[feat * 6 + 3] = val;
        set(&mut data, 0, 100.0);
        set(&mut data, 1, 60.0);
        set(&mut data, 2, 10.0);
        set(&mut data, 3, 20.0);
        set(&mut data, 4, 0.7);
        let dets = decode_rows(&data, 5, 6, 0.25, &IDENTITY);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox, BoundingBox::new(95, 50, 10, 20));
    }

    #[test]
    fn test_decode_rows_keypoints_respect_confidence() {
        let mut row = vec![50.0f32, 50.0, 20.0, 20.0, 0.9];
        for k in 0..5 {
            let conf = if k == 2 { 0.9 } else { 0.1 };
            row.extend_from_slice(&[40.0 + k as f32, 45.0, conf]);
        }
        let (data, num_dets) = row_major(&[row], 20);
        let dets = decode_rows(&data, num_dets, 20, 0.25, &IDENTITY);
        assert_eq!(dets.len(), 1);
        let lm = dets[0].landmarks.as_ref().unwrap();
        let visible: Vec<_> = lm.visible().collect();
        assert_eq!(visible, vec![("nose", (42.0, 45.0))]);
    }

    #[test]
    fn test_suppress_orders_by_score() {
        let low = FaceDetection::new(BoundingBox::new(0, 0, 50, 50), 0.4, None);
        let high = FaceDetection::new(BoundingBox::new(200, 200, 50, 50), 0.9, None);
        let overlapping = FaceDetection::new(BoundingBox::new(2, 2, 50, 50), 0.3, None);
        let kept = suppress(vec![low.clone(), high.clone(), overlapping]);
        assert_eq!(kept, vec![high, low]);
    }
}
