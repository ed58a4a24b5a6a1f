use std::path::Path;

use crate::imaging::domain::image_writer::ImageWriter;

/// Saves images with the `image` crate, creating parent directories.
#[derive(Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, image: &image::RgbImage) -> Result<(), Box<dyn std::error::Error>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(format!("Refusing to write empty image to {}", path.display()).into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        image.save(path)?;
        Ok(())
    }
}
