use crate::shared::bounding_box::BoundingBox;
use crate::shared::device::Device;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Returns every candidate with its confidence, in the detector's own
/// order. An empty vector means no face was found. Thresholding is the
/// caller's job.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}

/// Builds a fresh [`FaceDetector`] bound to a compute device.
pub trait FaceDetectorFactory: Send {
    fn create(&self, device: &Device) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>>;
}
