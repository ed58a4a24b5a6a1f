use thiserror::Error;

use crate::shared::constants::EMOTION_MODEL_BASE_URL;
use crate::shared::model_resolver::ModelSource;

const LABELS_8: &[&str] = &[
    "Anger",
    "Contempt",
    "Disgust",
    "Fear",
    "Happiness",
    "Neutral",
    "Sadness",
    "Surprise",
];

const LABELS_7: &[&str] = &[
    "Anger",
    "Disgust",
    "Fear",
    "Happiness",
    "Neutral",
    "Sadness",
    "Surprise",
];

/// A pretrained AffectNet emotion model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmotionModel {
    pub name: &'static str,
    /// Square input edge in pixels.
    pub input_size: u32,
    /// Class labels, in logit order.
    pub labels: &'static [&'static str],
}

impl EmotionModel {
    pub fn file_name(&self) -> String {
        format!("{}.onnx", self.name)
    }

    pub fn source(&self) -> ModelSource {
        ModelSource::new(
            self.file_name(),
            format!("{EMOTION_MODEL_BASE_URL}/{}", self.file_name()),
        )
    }
}

const MODELS: &[EmotionModel] = &[
    EmotionModel {
        name: "enet_b0_8_best_vgaf",
        input_size: 224,
        labels: LABELS_8,
    },
    EmotionModel {
        name: "enet_b0_8_best_afew",
        input_size: 224,
        labels: LABELS_8,
    },
    EmotionModel {
        name: "enet_b2_8",
        input_size: 260,
        labels: LABELS_8,
    },
    EmotionModel {
        name: "enet_b0_8_va_mtl",
        input_size: 224,
        labels: LABELS_8,
    },
    EmotionModel {
        name: "enet_b2_7",
        input_size: 260,
        labels: LABELS_7,
    },
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelSelectionError {
    #[error("unknown emotion model '{name}' (available: {available})")]
    UnknownModel { name: String, available: String },
}

/// Every known emotion model; the first entry is the default.
pub fn available_models() -> &'static [EmotionModel] {
    MODELS
}

/// Looks up `name`, or returns the first listed model when `name` is `None`.
pub fn select_model(name: Option<&str>) -> Result<&'static EmotionModel, ModelSelectionError> {
    match name {
        None => Ok(&MODELS[0]),
        Some(name) => MODELS
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| ModelSelectionError::UnknownModel {
                name: name.to_string(),
                available: MODELS.iter().map(|m| m.name).collect::<Vec<_>>().join(", "),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_first_listed() {
        let model = select_model(None).unwrap();
        assert_eq!(model, &available_models()[0]);
        assert_eq!(model.name, "enet_b0_8_best_vgaf");
    }

    #[rstest]
    #[case("enet_b2_8", 260, 8)]
    #[case("enet_b2_7", 260, 7)]
    #[case("enet_b0_8_va_mtl", 224, 8)]
    fn test_select_by_name(#[case] name: &str, #[case] size: u32, #[case] classes: usize) {
        let model = select_model(Some(name)).unwrap();
        assert_eq!(model.name, name);
        assert_eq!(model.input_size, size);
        assert_eq!(model.labels.len(), classes);
    }

    #[test]
    fn test_unknown_model_lists_alternatives() {
        let err = select_model(Some("resnet_9000")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("resnet_9000"));
        assert!(message.contains("enet_b0_8_best_vgaf"));
    }

    #[test]
    fn test_seven_class_labels_omit_contempt() {
        let model = select_model(Some("enet_b2_7")).unwrap();
        assert!(!model.labels.contains(&"Contempt"));
    }

    #[test]
    fn test_source_points_at_onnx_file() {
        let source = select_model(None).unwrap().source();
        assert_eq!(source.file_name, "enet_b0_8_best_vgaf.onnx");
        assert!(source.url.ends_with("/enet_b0_8_best_vgaf.onnx"));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = available_models().iter().map(|m| m.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), available_models().len());
    }
}
