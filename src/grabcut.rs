use std::path::Path;

use image::{GrayImage, Luma, RgbImage, RgbaImage};
use imageproc::map::map_colors;
use tracing::debug;

use crate::errors::{BgRemoveError, Result};
use crate::imageops_ai::AlphaMaskApplicable;
use crate::traits::{InteractiveSegmenter, Rect};

pub const GRABCUT_ITERATIONS: u32 = 5;

/// GrabCut label values.
pub const GC_BGD: u8 = 0;
pub const GC_FGD: u8 = 1;
pub const GC_PR_BGD: u8 = 2;
pub const GC_PR_FGD: u8 = 3;

/// Seed rectangle leaving a 5% margin on every side.
pub fn foreground_rect(width: u32, height: u32) -> Rect {
    Rect {
        x: (width as f64 * 0.05) as u32,
        y: (height as f64 * 0.05) as u32,
        width: (width as f64 * 0.9) as u32,
        height: (height as f64 * 0.9) as u32,
    }
}

/// Background and probable background become 0, everything else 255.
pub fn labels_to_alpha(labels: &GrayImage) -> GrayImage {
    map_colors(labels, |Luma([label])| match label {
        GC_BGD | GC_PR_BGD => Luma([0u8]),
        _ => Luma([u8::MAX]),
    })
}

/// Cut out the foreground of an already decoded image.
pub fn cut_out(segmenter: &dyn InteractiveSegmenter, image: RgbImage) -> Result<RgbaImage> {
    let rect = foreground_rect(image.width(), image.height());
    debug!(?rect, iterations = GRABCUT_ITERATIONS, "running grabcut");

    let labels = segmenter.grab_cut(&image, rect, GRABCUT_ITERATIONS)?;
    let alpha = labels_to_alpha(&labels);

    image
        .apply_alpha_mask(&alpha)
        .map_err(|e| BgRemoveError::Segmentation {
            operation: "alpha composition".to_string(),
            source: Box::new(e),
        })
}

/// Decode `path` as 3-channel color and cut out its foreground.
pub fn remove_with_grabcut(segmenter: &dyn InteractiveSegmenter, path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .map_err(|e| BgRemoveError::UnreadableInput {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?
        .into_rgb8();

    cut_out(segmenter, image)
}

#[cfg(feature = "opencv")]
pub use self::opencv_backend::OpenCvSegmenter;

#[cfg(feature = "opencv")]
mod opencv_backend {
    use image::{GrayImage, RgbImage};
    use opencv::{
        core::{self, Mat, Scalar, Vec3b},
        imgproc,
        prelude::*,
    };

    use crate::errors::{BgRemoveError, Result};
    use crate::traits::{InteractiveSegmenter, Rect};

    /// GrabCut through OpenCV's `imgproc` module.
    #[derive(Debug, Default)]
    pub struct OpenCvSegmenter;

    impl OpenCvSegmenter {
        /// Fails when the linked OpenCV library cannot be queried.
        pub fn probe() -> Result<Self> {
            let version = core::get_version_string()?;
            tracing::debug!(%version, "opencv available");
            Ok(Self)
        }
    }

    impl InteractiveSegmenter for OpenCvSegmenter {
        fn grab_cut(&self, image: &RgbImage, rect: Rect, iterations: u32) -> Result<GrayImage> {
            let (width, height) = image.dimensions();

            // OpenCV expects BGR
            let pixels = image
                .pixels()
                .map(|p| Vec3b::from_array([p[2], p[1], p[0]]))
                .collect::<Vec<_>>();
            let bgr = Mat::new_rows_cols_with_data(height as i32, width as i32, &pixels)?
                .try_clone()?;

            let mut mask = Mat::new_rows_cols_with_default(
                height as i32,
                width as i32,
                core::CV_8UC1,
                Scalar::all(0.0),
            )?;
            let mut bgd_model = Mat::default();
            let mut fgd_model = Mat::default();

            imgproc::grab_cut(
                &bgr,
                &mut mask,
                core::Rect::new(
                    rect.x as i32,
                    rect.y as i32,
                    rect.width as i32,
                    rect.height as i32,
                ),
                &mut bgd_model,
                &mut fgd_model,
                iterations as i32,
                imgproc::GC_INIT_WITH_RECT,
            )?;

            GrayImage::from_raw(width, height, mask.data_bytes()?.to_vec()).ok_or_else(|| {
                BgRemoveError::Segmentation {
                    operation: "label readback".to_string(),
                    source: "grabcut mask has unexpected size".into(),
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSegmenter;
    use image::Rgb;

    #[test]
    fn test_foreground_rect_margins() {
        assert_eq!(
            foreground_rect(100, 200),
            Rect {
                x: 5,
                y: 10,
                width: 90,
                height: 180
            }
        );
        assert_eq!(
            foreground_rect(15, 15),
            Rect {
                x: 0,
                y: 0,
                width: 13,
                height: 13
            }
        );
    }

    #[test]
    fn test_labels_to_alpha() {
        let labels = GrayImage::from_raw(4, 1, vec![GC_BGD, GC_FGD, GC_PR_BGD, GC_PR_FGD]).unwrap();
        let alpha = labels_to_alpha(&labels);
        assert_eq!(alpha.as_raw(), &vec![0, 255, 0, 255]);
    }

    #[test]
    fn test_cut_out_solid_color_is_binary() -> Result<()> {
        let segmenter = MockSegmenter::new();
        let image = RgbImage::from_pixel(64, 48, Rgb([200, 30, 30]));

        let rgba = cut_out(&segmenter, image)?;

        assert_eq!(rgba.dimensions(), (64, 48));
        assert!(rgba.pixels().all(|p| p[3] == 0 || p[3] == 255));
        assert_eq!(rgba.get_pixel(0, 0)[3], 0);
        assert_eq!(rgba.get_pixel(32, 24)[3], 255);
        assert_eq!(rgba.get_pixel(32, 24)[0], 200);
        assert_eq!(segmenter.last_call(), Some((foreground_rect(64, 48), 5)));
        Ok(())
    }

    #[test]
    fn test_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = remove_with_grabcut(&MockSegmenter::new(), &path).unwrap_err();
        assert!(matches!(err, BgRemoveError::UnreadableInput { .. }));
    }

    #[cfg(feature = "opencv")]
    #[test]
    fn test_opencv_solid_color_is_binary() -> Result<()> {
        let segmenter = OpenCvSegmenter::probe()?;
        let image = RgbImage::from_pixel(64, 48, Rgb([90, 140, 200]));

        let rgba = cut_out(&segmenter, image)?;

        assert_eq!(rgba.dimensions(), (64, 48));
        assert!(rgba.pixels().all(|p| p[3] == 0 || p[3] == 255));
        // outside the seed rectangle is always background
        assert_eq!(rgba.get_pixel(0, 0)[3], 0);
        assert_eq!(rgba.get_pixel(63, 47)[3], 0);
        Ok(())
    }

    #[cfg(feature = "opencv")]
    #[test]
    fn test_opencv_labels_keep_orientation() -> Result<()> {
        let segmenter = OpenCvSegmenter::probe()?;
        // wide frame so a transposed readback cannot line up
        let image = RgbImage::from_fn(80, 40, |x, y| {
            if (30..50).contains(&x) && (12..28).contains(&y) {
                Rgb([250, 250, 250])
            } else {
                Rgb([10, 20, 10])
            }
        });

        let rgba = cut_out(&segmenter, image)?;

        assert_eq!(rgba.dimensions(), (80, 40));
        assert_eq!(rgba.get_pixel(40, 20)[3], 255);
        assert_eq!(rgba.get_pixel(40, 20)[0], 250);
        // outside the 4..76 x 2..38 seed rectangle
        assert_eq!(rgba.get_pixel(1, 20)[3], 0);
        assert_eq!(rgba.get_pixel(78, 20)[3], 0);
        assert_eq!(rgba.get_pixel(40, 0)[3], 0);
        assert_eq!(rgba.get_pixel(40, 39)[3], 0);
        Ok(())
    }
}
