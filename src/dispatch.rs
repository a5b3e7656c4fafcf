use std::fs;
use std::path::Path;

use image::RgbaImage;
use tracing::debug;

use crate::capabilities::Backends;
use crate::config::Method;
use crate::errors::{BgRemoveError, Result};
use crate::grabcut::remove_with_grabcut;
use crate::traits::MattingModel;

pub const LEARNED_MODEL: &str = "learned-model";
pub const CLASSICAL: &str = "classical";

/// Produce an RGBA cut-out of `path` with the backend `method` selects.
pub fn remove_background(backends: &Backends, method: Method, path: &Path) -> Result<RgbaImage> {
    match method {
        Method::LearnedModel => {
            let model = backends
                .learned_model
                .as_deref()
                .ok_or(BgRemoveError::BackendNotInstalled {
                    backend: LEARNED_MODEL,
                })?;
            remove_with_learned_model(model, path)
        }
        Method::Classical => {
            let segmenter = backends
                .classical
                .as_deref()
                .ok_or(BgRemoveError::BackendNotInstalled { backend: CLASSICAL })?;
            remove_with_grabcut(segmenter, path)
        }
        Method::Auto => {
            if let Some(model) = backends.learned_model.as_deref() {
                debug!(path = %path.display(), "auto: using {LEARNED_MODEL}");
                remove_with_learned_model(model, path)
            } else if let Some(segmenter) = backends.classical.as_deref() {
                debug!(path = %path.display(), "auto: using {CLASSICAL}");
                remove_with_grabcut(segmenter, path)
            } else {
                Err(BgRemoveError::NoBackendAvailable)
            }
        }
    }
}

/// Hand the raw file bytes to the model and decode what comes back.
pub fn remove_with_learned_model(model: &dyn MattingModel, path: &Path) -> Result<RgbaImage> {
    let input = fs::read(path).map_err(|e| BgRemoveError::FileSystem {
        path: path.to_path_buf(),
        operation: "read input".to_string(),
        source: e,
    })?;

    let output = model.remove(&input)?;

    let image = image::load_from_memory(&output).map_err(|e| BgRemoveError::ImageProcessing {
        path: path.display().to_string(),
        operation: "decode model output".to_string(),
        source: Box::new(e),
    })?;
    Ok(image.into_rgba8())
}
