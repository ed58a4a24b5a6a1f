pub const DETECTOR_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Base URL of the AffectNet emotion models; `<name>.onnx` is appended.
pub const EMOTION_MODEL_BASE_URL: &str =
    "https://github.com/sb-ai-lab/EmotiEffLib/raw/main/models/affectnet_emotions/onnx";

/// Candidates at or below this detector confidence are discarded.
pub const FACE_CONFIDENCE_THRESHOLD: f32 = 0.9;

/// Smallest face edge (pixels) the detector reports.
pub const DEFAULT_MIN_FACE_SIZE: u32 = 40;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Directory name used under the platform cache and config dirs.
pub const APP_DIR_NAME: &str = "EmotionLens";
