//! Face detection and per-face emotion recognition for still images.
//!
//! The [`pipeline`] module holds the orchestration; [`detection`] and
//! [`emotion`] define the two model seams with ONNX Runtime
//! implementations behind them.

pub mod detection;
pub mod emotion;
pub mod imaging;
pub mod pipeline;
pub mod shared;

pub use pipeline::infrastructure::emotion_recognizer::{process_image, EmotionRecognizer};
pub use pipeline::recognize_emotions_use_case::{EmotionResult, RecognizeEmotionsUseCase};
pub use shared::config::RecognizerConfig;
pub use shared::device::Device;
