use image::{ImageBuffer, Luma, Pixel, Primitive, Rgb, Rgba};
use num_traits::AsPrimitive;
use thiserror::Error;

use crate::imageops_ai::get_max_value;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AlphaMaskError {
    #[error("image is {expected:?} but mask is {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("pixel buffer does not match image dimensions")]
    Buffer,
}

/// Turn a color image into RGBA using a single-channel mask as alpha.
///
/// Mask values are rescaled from the mask's channel range to the image's,
/// so an `f32` mask in `0.0..=1.0` and a `u8` mask in `0..=255` both work.
pub trait AlphaMaskApplicable<SI>
where
    SI: Primitive + AsPrimitive<f32> + 'static,
{
    fn apply_alpha_mask<SM>(
        self,
        mask: &ImageBuffer<Luma<SM>, Vec<SM>>,
    ) -> Result<ImageBuffer<Rgba<SI>, Vec<SI>>, AlphaMaskError>
    where
        Rgba<SI>: Pixel<Subpixel = SI>,
        SM: Primitive + AsPrimitive<f32> + 'static;
}

impl<SI> AlphaMaskApplicable<SI> for ImageBuffer<Rgb<SI>, Vec<SI>>
where
    Rgb<SI>: Pixel<Subpixel = SI>,
    SI: Primitive + AsPrimitive<f32> + 'static,
    f32: AsPrimitive<SI>,
{
    fn apply_alpha_mask<SM>(
        self,
        mask: &ImageBuffer<Luma<SM>, Vec<SM>>,
    ) -> Result<ImageBuffer<Rgba<SI>, Vec<SI>>, AlphaMaskError>
    where
        Rgba<SI>: Pixel<Subpixel = SI>,
        SM: Primitive + AsPrimitive<f32> + 'static,
    {
        if self.dimensions() != mask.dimensions() {
            return Err(AlphaMaskError::DimensionMismatch {
                expected: self.dimensions(),
                actual: mask.dimensions(),
            });
        }

        let si_max: f32 = get_max_value::<SI>().as_();
        let sm_max: f32 = get_max_value::<SM>().as_();

        let pixels = self
            .pixels()
            .zip(mask.pixels())
            .flat_map(|(&Rgb([red, green, blue]), &Luma([alpha]))| {
                let alpha = (alpha.as_() / sm_max * si_max).round().as_();
                [red, green, blue, alpha]
            })
            .collect::<Vec<SI>>();

        ImageBuffer::from_raw(self.width(), self.height(), pixels).ok_or(AlphaMaskError::Buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    #[test]
    fn test_binary_mask_becomes_alpha() {
        let image = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(1, 0, Luma([255]));

        let rgba = image.apply_alpha_mask(&mask).unwrap();
        assert_eq!(rgba.get_pixel(0, 0), &Rgba([10, 20, 30, 0]));
        assert_eq!(rgba.get_pixel(1, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_float_mask_is_rescaled() {
        let image = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        let mask = ImageBuffer::<Luma<f32>, Vec<f32>>::from_pixel(1, 1, Luma([0.5]));

        let rgba = image.apply_alpha_mask(&mask).unwrap();
        assert_eq!(rgba.get_pixel(0, 0)[3], 128);
    }

    #[test]
    fn test_partial_alpha_keeps_color() {
        let image = RgbImage::from_pixel(1, 1, Rgb([200, 100, 50]));
        let mask = GrayImage::from_pixel(1, 1, Luma([64]));

        let rgba = image.apply_alpha_mask(&mask).unwrap();
        assert_eq!(rgba.get_pixel(0, 0), &Rgba([200, 100, 50, 64]));
    }

    #[test]
    fn test_dimension_mismatch() {
        let image = RgbImage::new(4, 4);
        let mask = GrayImage::new(2, 2);

        assert_eq!(
            image.apply_alpha_mask(&mask).unwrap_err(),
            AlphaMaskError::DimensionMismatch {
                expected: (4, 4),
                actual: (2, 2)
            }
        );
    }
}
