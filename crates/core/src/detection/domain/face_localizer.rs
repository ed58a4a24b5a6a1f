use serde::{Deserialize, Serialize};

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::{BoundingBox, CropRect};
use crate::shared::constants::FACE_CONFIDENCE_THRESHOLD;
use crate::shared::frame::Frame;

/// What to do with a face whose clipped box has zero area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyCropPolicy {
    /// Drop the face before classification.
    #[default]
    Skip,
    /// Hand the empty crop to the classifier as-is.
    Keep,
}

/// A face cut out of the source image.
#[derive(Clone, Debug)]
pub struct FaceCrop {
    pub image: Frame,
    pub rect: CropRect,
    pub confidence: f32,
}

/// Turns raw detector output into clipped face crops.
#[derive(Clone, Debug)]
pub struct FaceLocalizer {
    threshold: f32,
    empty_crops: EmptyCropPolicy,
}

impl Default for FaceLocalizer {
    fn default() -> Self {
        Self::new(EmptyCropPolicy::default())
    }
}

impl FaceLocalizer {
    pub fn new(empty_crops: EmptyCropPolicy) -> Self {
        Self {
            threshold: FACE_CONFIDENCE_THRESHOLD,
            empty_crops,
        }
    }

    /// Runs the detector once and crops every confident face, in detector order.
    pub fn locate(
        &self,
        detector: &mut dyn FaceDetector,
        frame: &Frame,
    ) -> Result<Vec<FaceCrop>, Box<dyn std::error::Error>> {
        let candidates = detector.detect(frame)?;
        let confident = self.filter_confident(&candidates);
        Ok(self.crop_faces(frame, &confident))
    }

    /// Keeps candidates scoring strictly above the threshold, preserving order.
    pub fn filter_confident(&self, candidates: &[BoundingBox]) -> Vec<BoundingBox> {
        candidates
            .iter()
            .filter(|b| b.confidence > self.threshold)
            .copied()
            .collect()
    }

    pub fn crop_faces(&self, frame: &Frame, boxes: &[BoundingBox]) -> Vec<FaceCrop> {
        let mut crops = Vec::with_capacity(boxes.len());
        for (i, b) in boxes.iter().enumerate() {
            let rect = b.clip_to(frame.width(), frame.height());
            if rect.is_empty() && self.empty_crops == EmptyCropPolicy::Skip {
                log::debug!("Skipping face {i}: box {b:?} has no area inside the image");
                continue;
            }
            crops.push(FaceCrop {
                image: frame.crop(&rect),
                rect,
                confidence: b.confidence,
            });
        }
        crops
    }
}
