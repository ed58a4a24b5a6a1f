use std::path::Path;
use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_localizer::FaceLocalizer;
use crate::emotion::domain::emotion_classifier::EmotionClassifier;
use crate::imaging::domain::image_reader::ImageReader;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::bounding_box::CropRect;
use crate::shared::frame::Frame;

/// One classified face.
#[derive(Clone, Debug)]
pub struct EmotionResult {
    pub face: image::RgbImage,
    pub label: String,
    /// Raw classifier scores, in the model's label order.
    pub scores: Vec<f32>,
    /// Where the face sits in the source image.
    pub rect: CropRect,
    pub detection_confidence: f32,
}

/// Still-image emotion pipeline: read → detect → clip/crop → classify.
///
/// Collaborators are constructed by the caller; nothing here touches
/// models or the filesystem directly.
pub struct RecognizeEmotionsUseCase {
    reader: Box<dyn ImageReader>,
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn EmotionClassifier>,
    localizer: FaceLocalizer,
    logger: Box<dyn PipelineLogger>,
}

impl RecognizeEmotionsUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        detector: Box<dyn FaceDetector>,
        classifier: Box<dyn EmotionClassifier>,
        localizer: FaceLocalizer,
    ) -> Self {
        Self {
            reader,
            detector,
            classifier,
            localizer,
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Decodes the image at `input_path` and classifies every face in it.
    pub fn execute(
        &mut self,
        input_path: &Path,
    ) -> Result<Vec<EmotionResult>, Box<dyn std::error::Error>> {
        let start = Instant::now();
        let frame = self.reader.read(input_path)?;
        self.logger.timing("decode", elapsed_ms(start));

        self.execute_frame(&frame)
    }

    /// Classifies every face in an already-decoded frame.
    ///
    /// Results follow detection order. No faces is an empty vector.
    pub fn execute_frame(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<EmotionResult>, Box<dyn std::error::Error>> {
        let start = Instant::now();
        let crops = self.localizer.locate(self.detector.as_mut(), frame)?;
        self.logger.timing("detect", elapsed_ms(start));
        self.logger.faces_detected(crops.len());

        let start = Instant::now();
        let mut results = Vec::with_capacity(crops.len());
        for (index, crop) in crops.into_iter().enumerate() {
            let prediction = self.classifier.classify(&crop.image)?;
            self.logger.emotion_predicted(index, &prediction.label);
            results.push(EmotionResult {
                face: crop.image.to_rgb_image(),
                label: prediction.label,
                scores: prediction.scores,
                rect: crop.rect,
                detection_confidence: crop.confidence,
            });
        }
        self.logger.timing("classify", elapsed_ms(start));
        self.logger.summary();

        Ok(results)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
