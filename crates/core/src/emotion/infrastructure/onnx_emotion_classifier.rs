/// AffectNet emotion classifier using ONNX Runtime via `ort`.
use std::path::{Path, PathBuf};

use crate::detection::infrastructure::execution_provider::build_session;
use crate::emotion::domain::emotion_classifier::{
    EmotionClassifier, EmotionClassifierFactory, EmotionPrediction,
};
use crate::shared::device::Device;
use crate::shared::frame::Frame;
use crate::shared::model_resolver::{ModelResolveError, ModelResolver, ProgressFn};

use super::model_registry::{select_model, EmotionModel};

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

pub struct OnnxEmotionClassifier {
    session: ort::session::Session,
    model: EmotionModel,
}

impl OnnxEmotionClassifier {
    pub fn new(
        model_path: &Path,
        model: EmotionModel,
        device: &Device,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path, device)?;
        log::debug!("Emotion model {} ready", model.name);
        Ok(Self { session, model })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&mut self, face: &Frame) -> Result<EmotionPrediction, Box<dyn std::error::Error>> {
        if face.is_empty() {
            return Err("Cannot classify an empty face crop".into());
        }

        let tensor = preprocess(face, self.model.input_size);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Emotion model produced no outputs".into());
        }
        let logits = outputs[0].try_extract_array::<f32>()?;
        let scores: Vec<f32> = logits.iter().copied().collect();

        decode_scores(scores, self.model.labels)
    }
}

/// Resize to `size` × `size`, ImageNet-normalize, NCHW layout.
fn preprocess(face: &Frame, size: u32) -> ndarray::Array4<f32> {
    let resized = image::imageops::resize(
        &face.to_rgb_image(),
        size,
        size,
        image::imageops::FilterType::Triangle,
    );

    let s = size as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let v = pixel.0[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    tensor
}

/// Picks the argmax label over the leading emotion logits.
///
/// Multi-task models append extra regressions (valence, arousal) after the
/// class logits; those are kept in `scores` but never chosen as the label.
fn decode_scores(
    scores: Vec<f32>,
    labels: &[&str],
) -> Result<EmotionPrediction, Box<dyn std::error::Error>> {
    if scores.len() < labels.len() {
        return Err(format!(
            "Emotion model returned {} scores for {} labels",
            scores.len(),
            labels.len()
        )
        .into());
    }
    let best = scores[..labels.len()]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .ok_or("Emotion model has no labels")?;
    Ok(EmotionPrediction::new(labels[best], scores))
}

/// Builds [`OnnxEmotionClassifier`]s, resolving model files on demand.
pub struct OnnxEmotionClassifierFactory {
    resolver: ModelResolver,
    model_path_override: Option<PathBuf>,
    download_progress: Option<ProgressFn>,
}

impl OnnxEmotionClassifierFactory {
    pub fn new(resolver: ModelResolver) -> Self {
        Self {
            resolver,
            model_path_override: None,
            download_progress: None,
        }
    }

    /// Reports progress when a model has to be downloaded.
    pub fn with_download_progress(mut self, progress: ProgressFn) -> Self {
        self.download_progress = Some(progress);
        self
    }

    /// Load this file instead of resolving `<model>.onnx`.
    pub fn with_model_path(mut self, path: PathBuf) -> Self {
        self.model_path_override = Some(path);
        self
    }

    fn model_path(&self, model: &EmotionModel) -> Result<PathBuf, ModelResolveError> {
        match &self.model_path_override {
            Some(path) => Ok(path.clone()),
            None => self
                .resolver
                .resolve(&model.source(), self.download_progress.as_ref()),
        }
    }
}

impl EmotionClassifierFactory for OnnxEmotionClassifierFactory {
    fn create(
        &self,
        model: Option<&str>,
        device: &Device,
    ) -> Result<Box<dyn EmotionClassifier>, Box<dyn std::error::Error>> {
        let selected = select_model(model)?;
        let path = self.model_path(selected)?;
        log::info!("Using emotion model {} ({})", selected.name, path.display());
        Ok(Box::new(OnnxEmotionClassifier::new(&path, *selected, device)?))
    }
}
