use std::path::Path;
use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetectorFactory;
use crate::detection::domain::face_localizer::FaceLocalizer;
use crate::detection::infrastructure::onnx_yolo_detector::{DetectorOptions, OnnxYoloDetectorFactory};
use crate::emotion::domain::emotion_classifier::EmotionClassifierFactory;
use crate::emotion::infrastructure::onnx_emotion_classifier::OnnxEmotionClassifierFactory;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::infrastructure::image_file_reader::ImageFileReader;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::recognize_emotions_use_case::{EmotionResult, RecognizeEmotionsUseCase};
use crate::shared::config::RecognizerConfig;
use crate::shared::constants::{DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL};
use crate::shared::device::Device;
use crate::shared::model_resolver::{ModelResolver, ModelSource, ProgressFn};

/// Factory for the logger attached to each run.
pub type LoggerFactory = Box<dyn Fn() -> Box<dyn PipelineLogger> + Send>;

/// Long-lived entry point that builds fresh collaborators for every image.
///
/// Detector and classifier are created per call and dropped when it
/// returns; only configuration and factories persist.
pub struct EmotionRecognizer {
    config: RecognizerConfig,
    detector_factory: Box<dyn FaceDetectorFactory>,
    classifier_factory: Box<dyn EmotionClassifierFactory>,
    logger_factory: LoggerFactory,
}

impl EmotionRecognizer {
    pub fn new(
        config: RecognizerConfig,
        detector_factory: Box<dyn FaceDetectorFactory>,
        classifier_factory: Box<dyn EmotionClassifierFactory>,
    ) -> Self {
        Self {
            config,
            detector_factory,
            classifier_factory,
            logger_factory: Box::new(|| Box::new(NullPipelineLogger) as Box<dyn PipelineLogger>),
        }
    }

    /// Recognizer backed by the ONNX detector and classifier.
    ///
    /// Resolves (and downloads if needed) the detector model up front;
    /// the emotion model is resolved when a classifier is first built.
    /// `download_progress` is reported for both.
    pub fn onnx(
        config: RecognizerConfig,
        download_progress: Option<ProgressFn>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut resolver = ModelResolver::with_default_cache()?;
        if let Some(dir) = &config.bundled_models_dir {
            resolver = resolver.with_bundled_dir(dir.clone());
        }

        let detector_path = match &config.detector_model_path {
            Some(path) => path.clone(),
            None => resolver.resolve(
                &ModelSource::new(DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL),
                download_progress.as_ref(),
            )?,
        };
        let detector_factory = OnnxYoloDetectorFactory::new(
            detector_path,
            DetectorOptions {
                keep_all: config.keep_all,
                min_face_size: config.min_face_size,
            },
        );

        let mut classifier_factory = OnnxEmotionClassifierFactory::new(resolver);
        if let Some(path) = &config.classifier_model_path {
            classifier_factory = classifier_factory.with_model_path(path.clone());
        }
        if let Some(progress) = download_progress {
            classifier_factory = classifier_factory.with_download_progress(progress);
        }

        Ok(Self::new(
            config,
            Box::new(detector_factory),
            Box::new(classifier_factory),
        ))
    }

    pub fn with_logger_factory(mut self, logger_factory: LoggerFactory) -> Self {
        self.logger_factory = logger_factory;
        self
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Runs the pipeline on the configured device.
    pub fn process_image(
        &self,
        input_path: &Path,
    ) -> Result<Vec<EmotionResult>, Box<dyn std::error::Error>> {
        self.process_image_on(input_path, &self.config.device)
    }

    /// Runs the pipeline on an explicit device, overriding the config.
    ///
    /// The image is decoded before any model is loaded, so an unreadable
    /// input fails with the decoder's error and never triggers a download.
    pub fn process_image_on(
        &self,
        input_path: &Path,
        device: &Device,
    ) -> Result<Vec<EmotionResult>, Box<dyn std::error::Error>> {
        let reader = ImageFileReader::new();
        let mut logger = (self.logger_factory)();

        let start = Instant::now();
        let frame = reader.read(input_path)?;
        logger.timing("decode", start.elapsed().as_secs_f64() * 1000.0);

        let detector = self.detector_factory.create(device)?;
        let classifier = self
            .classifier_factory
            .create(self.config.emotion_model.as_deref(), device)?;

        let mut use_case = RecognizeEmotionsUseCase::new(
            Box::new(reader),
            detector,
            classifier,
            FaceLocalizer::new(self.config.empty_crops),
        )
        .with_logger(logger);

        use_case.execute_frame(&frame)
    }
}

/// Detects faces in the image at `input_path` and labels each one's emotion,
/// using the ONNX models with default settings on `device`.
pub fn process_image(
    input_path: &Path,
    device: &Device,
) -> Result<Vec<EmotionResult>, Box<dyn std::error::Error>> {
    let config = RecognizerConfig {
        device: device.clone(),
        ..RecognizerConfig::default()
    };
    EmotionRecognizer::onnx(config, None)?.process_image(input_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::emotion::domain::emotion_classifier::{EmotionClassifier, EmotionPrediction};
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubDetector {
        boxes: Vec<BoundingBox>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(self.boxes.clone())
        }
    }

    struct StubDetectorFactory {
        boxes: Vec<BoundingBox>,
        devices: Arc<Mutex<Vec<Device>>>,
    }

    impl FaceDetectorFactory for StubDetectorFactory {
        fn create(&self, device: &Device) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
            self.devices.lock().unwrap().push(device.clone());
            Ok(Box::new(StubDetector {
                boxes: self.boxes.clone(),
            }))
        }
    }

    struct FixedClassifier(String);

    impl EmotionClassifier for FixedClassifier {
        fn classify(&mut self, _face: &Frame) -> Result<EmotionPrediction, Box<dyn std::error::Error>> {
            Ok(EmotionPrediction::new(self.0.clone(), vec![1.0]))
        }
    }

    /// Labels every face with the model name it was asked to load.
    struct ModelEchoFactory {
        builds: Arc<Mutex<usize>>,
    }

    impl EmotionClassifierFactory for ModelEchoFactory {
        fn create(
            &self,
            model: Option<&str>,
            _device: &Device,
        ) -> Result<Box<dyn EmotionClassifier>, Box<dyn std::error::Error>> {
            *self.builds.lock().unwrap() += 1;
            Ok(Box::new(FixedClassifier(model.unwrap_or("default").to_string())))
        }
    }

    struct Harness {
        recognizer: EmotionRecognizer,
        devices: Arc<Mutex<Vec<Device>>>,
        builds: Arc<Mutex<usize>>,
    }

    fn harness(config: RecognizerConfig, boxes: Vec<BoundingBox>) -> Harness {
        let devices = Arc::new(Mutex::new(Vec::new()));
        let builds = Arc::new(Mutex::new(0));
        let recognizer = EmotionRecognizer::new(
            config,
            Box::new(StubDetectorFactory {
                boxes,
                devices: devices.clone(),
            }),
            Box::new(ModelEchoFactory {
                builds: builds.clone(),
            }),
        );
        Harness {
            recognizer,
            devices,
            builds,
        }
    }

    fn write_image(dir: &tempfile::TempDir, w: u32, h: u32) -> std::path::PathBuf {
        let path = dir.path().join("input.png");
        image::RgbImage::from_pixel(w, h, image::Rgb([120, 80, 60]))
            .save(&path)
            .unwrap();
        path
    }

    // --- Tests ---

    #[test]
    fn test_process_image_end_to_end_with_stubs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, 200, 200);
        let h = harness(
            RecognizerConfig::default(),
            vec![BoundingBox::new(50.0, 50.0, 150.0, 150.0, 0.95)],
        );

        let results = h.recognizer.process_image(&path).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].face.dimensions(), (100, 100));
        assert_eq!(results[0].face.get_pixel(0, 0).0, [120, 80, 60]);
        assert_eq!(results[0].label, "default");
    }

    #[test]
    fn test_no_face_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, 64, 64);
        let h = harness(RecognizerConfig::default(), vec![]);
        assert!(h.recognizer.process_image(&path).unwrap().is_empty());
    }

    #[test]
    fn test_configured_model_is_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, 100, 100);
        let config = RecognizerConfig {
            emotion_model: Some("enet_b2_7".into()),
            ..RecognizerConfig::default()
        };
        let h = harness(config, vec![BoundingBox::new(0.0, 0.0, 50.0, 50.0, 0.99)]);

        let results = h.recognizer.process_image(&path).unwrap();
        assert_eq!(results[0].label, "enet_b2_7");
    }

    #[test]
    fn test_collaborators_built_fresh_per_call_on_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, 100, 100);
        let config = RecognizerConfig {
            device: Device::Accelerator("cuda:0".into()),
            ..RecognizerConfig::default()
        };
        let h = harness(config, vec![]);

        h.recognizer.process_image(&path).unwrap();
        h.recognizer.process_image_on(&path, &Device::Cpu).unwrap();

        assert_eq!(
            h.devices.lock().unwrap().as_slice(),
            &[Device::Accelerator("cuda:0".into()), Device::Cpu]
        );
        assert_eq!(*h.builds.lock().unwrap(), 2);
    }

    struct UnavailableModelFactory {
        builds: Arc<Mutex<usize>>,
    }

    impl EmotionClassifierFactory for UnavailableModelFactory {
        fn create(
            &self,
            _model: Option<&str>,
            _device: &Device,
        ) -> Result<Box<dyn EmotionClassifier>, Box<dyn std::error::Error>> {
            *self.builds.lock().unwrap() += 1;
            Err("classifier model unavailable".into())
        }
    }

    #[test]
    fn test_decode_error_wins_over_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let devices = Arc::new(Mutex::new(Vec::new()));
        let builds = Arc::new(Mutex::new(0));
        let recognizer = EmotionRecognizer::new(
            RecognizerConfig::default(),
            Box::new(StubDetectorFactory {
                boxes: vec![],
                devices: devices.clone(),
            }),
            Box::new(UnavailableModelFactory {
                builds: builds.clone(),
            }),
        );

        let err = recognizer
            .process_image(&dir.path().join("missing.png"))
            .unwrap_err();

        assert!(err.downcast_ref::<image::ImageError>().is_some(), "got: {err}");
        assert!(devices.lock().unwrap().is_empty(), "no detector built");
        assert_eq!(*builds.lock().unwrap(), 0, "no classifier built");
    }

    #[test]
    fn test_model_load_error_after_successful_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, 32, 32);
        let recognizer = EmotionRecognizer::new(
            RecognizerConfig::default(),
            Box::new(StubDetectorFactory {
                boxes: vec![],
                devices: Arc::new(Mutex::new(Vec::new())),
            }),
            Box::new(UnavailableModelFactory {
                builds: Arc::new(Mutex::new(0)),
            }),
        );

        let err = recognizer.process_image(&path).unwrap_err();
        assert_eq!(err.to_string(), "classifier model unavailable");
    }

    #[test]
    fn test_unreadable_image_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(RecognizerConfig::default(), vec![]);
        assert!(h
            .recognizer
            .process_image(&dir.path().join("missing.png"))
            .is_err());
    }
}
