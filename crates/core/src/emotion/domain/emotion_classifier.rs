use crate::shared::device::Device;
use crate::shared::frame::Frame;

/// Best label for one face plus the model's raw per-class scores.
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionPrediction {
    pub label: String,
    pub scores: Vec<f32>,
}

impl EmotionPrediction {
    pub fn new(label: impl Into<String>, scores: Vec<f32>) -> Self {
        Self {
            label: label.into(),
            scores,
        }
    }

    /// Softmax of the scores; empty when there are none.
    pub fn probabilities(&self) -> Vec<f32> {
        let Some(max) = self.scores.iter().copied().reduce(f32::max) else {
            return Vec::new();
        };
        let exps: Vec<f32> = self.scores.iter().map(|s| (s - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }
}

/// Domain interface for per-face emotion classification.
///
/// Each call is independent; `&mut self` only because inference sessions
/// need exclusive access.
pub trait EmotionClassifier: Send {
    fn classify(&mut self, face: &Frame) -> Result<EmotionPrediction, Box<dyn std::error::Error>>;
}

/// Builds a fresh [`EmotionClassifier`].
///
/// `model` names the model to load; `None` means the factory's default.
pub trait EmotionClassifierFactory: Send {
    fn create(
        &self,
        model: Option<&str>,
        device: &Device,
    ) -> Result<Box<dyn EmotionClassifier>, Box<dyn std::error::Error>>;
}
