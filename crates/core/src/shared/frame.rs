use ndarray::{s, ArrayView3};

use crate::shared::bounding_box::CropRect;

/// A decoded still image: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; detection and
/// classification see pixel data through this type.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

/// Channel count of every frame (RGB).
pub const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height)
    }

    /// Copies the pixels into a standalone `image::RgbImage`.
    pub fn to_rgb_image(&self) -> image::RgbImage {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("Frame data length must match dimensions")
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `rect` into a new frame.
    ///
    /// `rect` must already be clipped to this frame; a zero-area rect
    /// yields an empty frame.
    pub fn crop(&self, rect: &CropRect) -> Frame {
        debug_assert!(rect.x2 <= self.width && rect.y2 <= self.height);
        let view = self.as_ndarray();
        let region = view.slice(s![
            rect.y1 as usize..rect.y2 as usize,
            rect.x1 as usize..rect.x2 as usize,
            ..
        ]);
        let data: Vec<u8> = region.iter().copied().collect();
        Frame::new(data, rect.width(), rect.height())
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}
