//! Single-image classification on top of kornia images.
//!
//! An RGB image is normalized into a `[1, H, W, 3]` float tensor, handed to an
//! [`InferenceBackend`], and the index of the highest score is reported. The
//! [`ClassifierEngine`] runs fetch-then-classify jobs on a worker thread, one at a
//! time.

pub mod engine;
pub mod error;
pub mod fetch;
pub mod model;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod session;
#[cfg(feature = "tract")]
pub mod tract;

pub use engine::{
    ClassifierEngine, EngineModel, EngineResponse, EngineResult, EngineState, RequestMetadata,
};
pub use error::{ClassifierError, Result};
pub use fetch::{ImageFetcher, decode_image, image_url};
pub use model::{InferenceBackend, ModelFormat, ModelKind, ModelSpec, load_model_bytes};
pub use pipeline::{Classification, ClassifierPipeline};
pub use postprocess::arg_max;
pub use preprocess::{Normalization, RgbImage, TensorBuffer, normalize, normalize_checked};
pub use session::{
    ClassifierSession, ClassifyOutcome, ClassifyRequest, DisplayState, ImageSource, SourceInfo,
};
#[cfg(feature = "tract")]
pub use tract::TractBackend;
