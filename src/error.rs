use kornia_image::ImageSize;
use std::path::PathBuf;

/// Errors produced while loading a model, fetching an image or running a classification.
#[derive(thiserror::Error, Debug)]
pub enum ClassifierError {
    /// The model artifact could not be read or turned into a runnable plan.
    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// The image request failed at the transport or HTTP status level.
    #[error("image request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The payload is not a decodable JPEG/PNG.
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error(transparent)]
    Image(#[from] kornia_image::ImageError),

    /// The decoded image does not have the size the image source was asked for.
    #[error("expected a {}x{} image, got {}x{}", expected.width, expected.height, actual.width, actual.height)]
    UnexpectedImageSize {
        expected: ImageSize,
        actual: ImageSize,
    },

    /// The image does not match the model input shape.
    #[error("model expects {}x{} input, got {}x{}", expected.width, expected.height, actual.width, actual.height)]
    ShapeMismatch {
        expected: ImageSize,
        actual: ImageSize,
    },

    /// The backend returned a probability vector of the wrong length.
    #[error("expected {expected} class scores, backend returned {actual}")]
    UnexpectedOutput { expected: usize, actual: usize },

    #[error("inference failed: {0}")]
    Inference(String),

    /// A request is already in flight.
    #[error("engine is still processing")]
    Busy,

    #[error("engine worker is gone")]
    EngineDisconnected,
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
