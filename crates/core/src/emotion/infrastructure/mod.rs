pub mod model_registry;
pub mod onnx_emotion_classifier;
