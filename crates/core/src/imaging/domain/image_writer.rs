use std::path::Path;

/// Writes a face image to disk; the format follows the path's extension.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, image: &image::RgbImage) -> Result<(), Box<dyn std::error::Error>>;
}
