/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Letterbox preprocessing, inference and NMS. Reports the best candidate
/// only unless `keep_all` is set; the orchestrator applies the final
/// confidence threshold.
use std::path::{Path, PathBuf};

use crate::detection::domain::face_detector::{FaceDetector, FaceDetectorFactory};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::DEFAULT_MIN_FACE_SIZE;
use crate::shared::device::Device;
use crate::shared::frame::Frame;

use super::execution_provider::build_session;

/// Fallback input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Candidates scoring below this never leave the detector.
pub const CANDIDATE_CONFIDENCE: f32 = 0.25;

const NMS_IOU_THRESH: f32 = 0.45;

/// Letterbox padding value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorOptions {
    /// Return every face after NMS instead of only the highest-scoring one.
    pub keep_all: bool,
    /// Faces whose shorter edge is below this many pixels are dropped.
    pub min_face_size: u32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            keep_all: false,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
        }
    }
}

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    options: DetectorOptions,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model on `device`.
    ///
    /// The input resolution is read from the model's NCHW input shape,
    /// falling back to 640 when dynamic.
    pub fn new(
        model_path: &Path,
        device: &Device,
        options: DetectorOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path, device)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            options,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let (input_tensor, transform) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let candidates = decode_output(data, &shape, &transform)?;
        Ok(select_faces(candidates, &self.options))
    }
}

/// Builds [`OnnxYoloDetector`]s from one model file.
pub struct OnnxYoloDetectorFactory {
    model_path: PathBuf,
    options: DetectorOptions,
}

impl OnnxYoloDetectorFactory {
    pub fn new(model_path: PathBuf, options: DetectorOptions) -> Self {
        Self {
            model_path,
            options,
        }
    }
}

impl FaceDetectorFactory for OnnxYoloDetectorFactory {
    fn create(&self, device: &Device) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
        Ok(Box::new(OnnxYoloDetector::new(
            &self.model_path,
            device,
            self.options,
        )?))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Maps letterboxed model coordinates back to source pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LetterboxTransform {
    scale: f32,
    pad_x: u32,
    pad_y: u32,
}

impl LetterboxTransform {
    fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`, NCHW float32 in [0,1].
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, LetterboxTransform) {
    let fw = frame.width() as f32;
    let fh = frame.height() as f32;
    let target = target_size as f32;

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

    for y in 0..new_h as usize {
        let src_y = ((y as f32 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f32 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        LetterboxTransform {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Parses raw YOLO output rows `[cx, cy, w, h, conf, ...]` into source-space boxes.
///
/// Accepts both `[1, features, detections]` and `[1, detections, features]`.
fn decode_output(
    data: &[f32],
    shape: &[usize],
    transform: &LetterboxTransform,
) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(format!("YOLO output too small for shape {shape:?}").into());
    }

    let feature = |det: usize, f: usize| {
        if transposed {
            data[f * num_dets + det]
        } else {
            data[det * num_feats + f]
        }
    };

    let mut boxes = Vec::new();
    for i in 0..num_dets {
        let conf = feature(i, 4);
        if conf < CANDIDATE_CONFIDENCE {
            continue;
        }
        let (cx, cy, w, h) = (feature(i, 0), feature(i, 1), feature(i, 2), feature(i, 3));
        let (x1, y1) = transform.to_source(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = transform.to_source(cx + w / 2.0, cy + h / 2.0);
        boxes.push(BoundingBox::new(x1, y1, x2, y2, conf));
    }
    Ok(boxes)
}

/// Size filter, NMS, then best-only unless `keep_all`.
fn select_faces(candidates: Vec<BoundingBox>, options: &DetectorOptions) -> Vec<BoundingBox> {
    let min = options.min_face_size as f32;
    let mut sized: Vec<BoundingBox> = candidates
        .into_iter()
        .filter(|b| b.width().min(b.height()) >= min)
        .collect();

    let mut kept = nms(&mut sized, NMS_IOU_THRESH);
    if !options.keep_all {
        kept.truncate(1);
    }
    kept
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [BoundingBox], iou_thresh: f32) -> Vec<BoundingBox> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i]);
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && dets[i].iou(&dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}
