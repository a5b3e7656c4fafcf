use std::io::Cursor;
use std::path::Path;

use crate::{
    errors::{BgRemoveError, Result},
    imageops_ai::AlphaMaskApplicable,
    traits::MattingModel,
};
use image::{
    imageops, imageops::FilterType, DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma,
    RgbImage,
};
use imageproc::map::map_colors;
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::debug;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];
const DEFAULT_IMAGE_SIZE: u32 = 320;

/// Salient-object matting model (u2net, u2netp, silueta, isnet) run through
/// ONNX Runtime.
pub struct U2NetModel {
    pub image_size: u32,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl U2NetModel {
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        if !model_path.is_file() {
            return Err(BgRemoveError::FileSystem {
                path: model_path.to_path_buf(),
                operation: "model lookup".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "model file not found"),
            });
        }

        let session = SessionBuilder::new()
            .map_err(|e| BgRemoveError::Model {
                operation: "session builder init".to_string(),
                source: Box::new(e),
            })?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| BgRemoveError::Model {
                operation: "execution provider setup".to_string(),
                source: Box::new(e),
            })?
            .commit_from_file(model_path)
            .map_err(|e| BgRemoveError::Model {
                operation: format!("model load: {}", model_path.display()),
                source: Box::new(e),
            })?;

        let input = session.inputs.first().ok_or_else(|| missing("model input"))?;
        let output = session
            .outputs
            .first()
            .ok_or_else(|| missing("model output"))?;

        // dynamic axes come back as -1
        let image_size = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.get(2).copied())
            .filter(|&size| size > 0)
            .map_or(DEFAULT_IMAGE_SIZE, |size| size as u32);

        debug!(
            input = %input.name,
            output = %output.name,
            image_size,
            "loaded matting model"
        );

        let input_name = input.name.clone();
        let output_name = output.name.clone();
        Ok(Self {
            image_size,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }

    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }

    fn segment_image(&self, img: &DynamicImage) -> Result<DynamicImage> {
        let rgb_img = img.to_rgb8();
        let tensor = preprocess(&rgb_img, self.image_size);
        let prediction = self.predict(tensor.view())?;
        let (width, height) = rgb_img.dimensions();
        let mask = postprocess_mask(prediction, self.image_size, width, height)?;

        // straight alpha: color channels are kept as-is, not premultiplied
        // against transparent black, so soft edges keep their original color
        let rgba = rgb_img
            .apply_alpha_mask(&mask)
            .map_err(|e| BgRemoveError::ImageProcessing {
                path: "unknown".to_string(),
                operation: "mask application".to_string(),
                source: Box::new(e),
            })?;
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

impl MattingModel for U2NetModel {
    fn remove(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        let img = image::load_from_memory(encoded).map_err(|e| BgRemoveError::ImageProcessing {
            path: "memory".to_string(),
            operation: "decode".to_string(),
            source: Box::new(e),
        })?;

        let result = self.segment_image(&img)?;

        let mut buffer = Cursor::new(Vec::new());
        result
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| BgRemoveError::ImageProcessing {
                path: "memory".to_string(),
                operation: "encode".to_string(),
                source: Box::new(e),
            })?;
        Ok(buffer.into_inner())
    }
}

fn missing(what: &str) -> BgRemoveError {
    BgRemoveError::Model {
        operation: format!("{what} lookup"),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "model has no such tensor",
        )),
    }
}

/// Resize to the model input, scale by the brightest channel value and
/// normalize with ImageNet statistics. Returns a `1x3xSxS` tensor.
pub fn preprocess(image: &RgbImage, image_size: u32) -> Array4<f32> {
    let image = imageops::resize(image, image_size, image_size, FilterType::Lanczos3);
    let max = image.as_raw().iter().copied().max().unwrap_or(0).max(1) as f32;

    let mut tensor = image
        .as_ndarray3()
        .mapv(|v| v as f32 / max)
        .insert_axis(Axis(0));

    for (channel, (mean, std)) in MEAN.iter().zip(STD.iter()).enumerate() {
        tensor
            .slice_mut(s![0, channel, .., ..])
            .mapv_inplace(|v| (v - mean) / std);
    }

    tensor
}

/// Min-max normalize the first prediction channel and resize it back to the
/// source dimensions as an 8-bit mask.
pub fn postprocess_mask(
    prediction: Array4<f32>,
    image_size: u32,
    width: u32,
    height: u32,
) -> Result<GrayImage> {
    let prediction = prediction.slice_move(s![0, 0, .., ..]);
    let (min, max) = prediction
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = (max - min).max(f32::EPSILON);

    let values = prediction
        .as_standard_layout()
        .iter()
        .map(|v| (v - min) / range)
        .collect::<Vec<f32>>();
    let mask: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_raw(image_size, image_size, values)
        .ok_or_else(|| BgRemoveError::Model {
            operation: "mask reshape".to_string(),
            source: format!("prediction is not {image_size}x{image_size}").into(),
        })?;

    let mask = imageops::resize(&mask, width, height, FilterType::Lanczos3);
    Ok(map_colors(&mask, |Luma([alpha])| {
        Luma([(alpha.clamp(0.0, 1.0) * 255.0).round() as u8])
    }))
}
