//! Test doubles for both backends, with call counters so tests can assert
//! that a backend was or was not reached.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::{BgRemoveError, Result};
use crate::grabcut::{GC_BGD, GC_PR_FGD};
use crate::traits::{InteractiveSegmenter, MattingModel, Rect};
use image::{GrayImage, ImageFormat, Luma, RgbImage};
use parking_lot::Mutex;

/// Matting model that keeps every pixel and sets a fixed alpha.
#[derive(Debug)]
pub struct MockMattingModel {
    pub alpha: u8,
    calls: AtomicUsize,
}

impl MockMattingModel {
    pub const fn new(alpha: u8) -> Self {
        Self {
            alpha,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockMattingModel {
    fn default() -> Self {
        Self::new(u8::MAX)
    }
}

impl MattingModel for MockMattingModel {
    fn remove(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut rgba = image::load_from_memory(encoded)?.to_rgba8();
        rgba.pixels_mut().for_each(|p| p[3] = self.alpha);

        let mut buffer = Cursor::new(Vec::new());
        rgba.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// Matting model that always fails, standing in for a crashing session.
#[derive(Debug, Default)]
pub struct FailingMattingModel;

impl MattingModel for FailingMattingModel {
    fn remove(&self, _encoded: &[u8]) -> Result<Vec<u8>> {
        Err(BgRemoveError::Model {
            operation: "inference".to_string(),
            source: "session crashed".into(),
        })
    }
}

/// Segmenter that labels the seed rectangle as probable foreground and the
/// rest as background, the result GrabCut converges to on a flat image.
#[derive(Debug, Default)]
pub struct MockSegmenter {
    calls: AtomicUsize,
    last_call: Mutex<Option<(Rect, u32)>>,
}

impl MockSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<(Rect, u32)> {
        *self.last_call.lock()
    }
}

impl InteractiveSegmenter for MockSegmenter {
    fn grab_cut(&self, image: &RgbImage, rect: Rect, iterations: u32) -> Result<GrayImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock() = Some((rect, iterations));

        Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let inside = (rect.x..rect.x + rect.width).contains(&x)
                && (rect.y..rect.y + rect.height).contains(&y);
            Luma([if inside { GC_PR_FGD } else { GC_BGD }])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, Rgb};

    fn encoded_red_square() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 0])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_mock_matting_model_sets_alpha() -> Result<()> {
        let mock = MockMattingModel::new(7);

        let output = mock.remove(&encoded_red_square())?;
        let decoded = image::load_from_memory(&output)?;

        assert_eq!(decoded.dimensions(), (10, 10));
        assert_eq!(decoded.to_rgba8().get_pixel(3, 3)[3], 7);
        assert_eq!(mock.calls(), 1);
        Ok(())
    }

    #[test]
    fn test_mock_segmenter_labels_rect() -> Result<()> {
        let mock = MockSegmenter::new();
        let rect = Rect {
            x: 2,
            y: 2,
            width: 3,
            height: 3,
        };

        let labels = mock.grab_cut(&RgbImage::new(8, 8), rect, 5)?;

        assert_eq!(labels.get_pixel(1, 1)[0], GC_BGD);
        assert_eq!(labels.get_pixel(2, 2)[0], GC_PR_FGD);
        assert_eq!(labels.get_pixel(5, 5)[0], GC_BGD);
        assert_eq!(mock.last_call(), Some((rect, 5)));
        Ok(())
    }
}
