use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while removing the background of a single file.
///
/// # Why structured errors
///
/// The batch loop reports every failure as one line naming the file, so each
/// variant carries just enough context (backend, path, operation) for that
/// line to be useful without the caller parsing strings. Only directory
/// enumeration and output directory creation escape the per-file boundary.
#[derive(Error, Debug)]
pub enum BgRemoveError {
    #[error("{backend} backend is not installed")]
    BackendNotInstalled { backend: &'static str },

    #[error(
        "no backend available (provide an ONNX model with --model or build with the `opencv` feature)"
    )]
    NoBackendAvailable,

    #[error("could not read image {path:?}")]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Segmentation error: {operation} failed")]
    Segmentation {
        operation: String,
        #[source]
        source: BoxError,
    },
}

pub type Result<T> = std::result::Result<T, BgRemoveError>;

impl BgRemoveError {
    /// Message used in the per-file error line, including the innermost cause.
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should build
/// `BgRemoveError::FileSystem` directly; this is the fallback for `?`.
impl From<std::io::Error> for BgRemoveError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for BgRemoveError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for BgRemoveError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors only occur while moving tensors in and out of the session,
/// so they count as model errors.
impl From<ndarray::ShapeError> for BgRemoveError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for BgRemoveError {
    fn from(err: opencv::Error) -> Self {
        Self::Segmentation {
            operation: "opencv call".to_string(),
            source: Box::new(err),
        }
    }
}
