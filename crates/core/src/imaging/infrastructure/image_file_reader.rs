use std::path::Path;

use crate::imaging::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Decodes image files with the `image` crate, converting any pixel
/// format to 8-bit RGB.
///
/// Decode errors are returned as the `image` crate reports them.
#[derive(Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let rgb = image::open(path)?.into_rgb8();
        log::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            rgb.width(),
            rgb.height()
        );
        Ok(Frame::from_rgb_image(rgb))
    }
}
