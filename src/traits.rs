use crate::errors::Result;
use image::{GrayImage, RgbImage};
use std::sync::Arc;

/// Foreground seed rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Learned matting backend.
///
/// Works on encoded bytes so the backend owns decoding and encoding, the same
/// way the batch loop hands it a whole file.
pub trait MattingModel: Send + Sync {
    /// Remove the background of an encoded image and return an encoded image
    /// that carries an alpha channel.
    fn remove(&self, encoded: &[u8]) -> Result<Vec<u8>>;
}

/// Interactive graph-cut segmentation (GrabCut).
///
/// Returns one label per pixel using the OpenCV convention: 0 background,
/// 1 foreground, 2 probable background, 3 probable foreground.
pub trait InteractiveSegmenter: Send + Sync {
    fn grab_cut(&self, image: &RgbImage, rect: Rect, iterations: u32) -> Result<GrayImage>;
}

impl<T: MattingModel + ?Sized> MattingModel for Arc<T> {
    fn remove(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        (**self).remove(encoded)
    }
}

impl<T: InteractiveSegmenter + ?Sized> InteractiveSegmenter for Arc<T> {
    fn grab_cut(&self, image: &RgbImage, rect: Rect, iterations: u32) -> Result<GrayImage> {
        (**self).grab_cut(image, rect, iterations)
    }
}
