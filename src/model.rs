use crate::error::{ClassifierError, Result};
use crate::preprocess::{Normalization, TensorBuffer};
use kornia_image::ImageSize;
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Trait for the inference engine that turns a normalized tensor into class scores.
///
/// Implementations own whatever runtime state the engine needs. The pipeline calls
/// [`InferenceBackend::run`] once per image and never concurrently.
pub trait InferenceBackend {
    /// The error type that can be returned during inference.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the model on a `[1, H, W, 3]` tensor and returns the flattened `[1, classes]` output.
    fn run(&mut self, input: &TensorBuffer) -> std::result::Result<Vec<f32>, Self::Error>;
}

/// Serialization format of a model artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Tflite,
    Onnx,
}

/// Everything the pipeline needs to know about a model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelSpec {
    /// File name of the artifact inside the model directory.
    pub artifact: &'static str,
    pub format: ModelFormat,
    /// Spatial size of the `[1, H, W, 3]` input.
    pub input_size: ImageSize,
    pub num_classes: usize,
    pub normalization: Normalization,
}

impl ModelSpec {
    /// Number of `f32` values in one input tensor.
    pub fn input_len(&self) -> usize {
        self.input_size.width * self.input_size.height * 3
    }

    /// Input tensor shape, batch first.
    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.input_size.height, self.input_size.width, 3]
    }
}

const MOBILE_INPUT: ImageSize = ImageSize {
    width: 128,
    height: 128,
};

const IMAGENET_CLASSES: usize = 1001;

const UNIT_RANGE: Normalization = Normalization {
    mean: 127.5,
    std: 127.5,
};

/// Identifier of a packaged model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ModelKind {
    #[default]
    MobileNetV1,
    EfficientNetV0,
    EfficientNetV1,
    EfficientNetV2,
}

// Indexed by `ModelKind as usize`. All variants currently ship the same artifact.
static MODEL_TABLE: [ModelSpec; 4] = [
    ModelSpec {
        artifact: "1.tflite",
        format: ModelFormat::Tflite,
        input_size: MOBILE_INPUT,
        num_classes: IMAGENET_CLASSES,
        normalization: UNIT_RANGE,
    },
    ModelSpec {
        artifact: "1.tflite",
        format: ModelFormat::Tflite,
        input_size: MOBILE_INPUT,
        num_classes: IMAGENET_CLASSES,
        normalization: UNIT_RANGE,
    },
    ModelSpec {
        artifact: "1.tflite",
        format: ModelFormat::Tflite,
        input_size: MOBILE_INPUT,
        num_classes: IMAGENET_CLASSES,
        normalization: UNIT_RANGE,
    },
    ModelSpec {
        artifact: "1.tflite",
        format: ModelFormat::Tflite,
        input_size: MOBILE_INPUT,
        num_classes: IMAGENET_CLASSES,
        normalization: UNIT_RANGE,
    },
];

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::MobileNetV1,
        ModelKind::EfficientNetV0,
        ModelKind::EfficientNetV1,
        ModelKind::EfficientNetV2,
    ];

    /// Looks up the model in the static model table.
    pub fn spec(self) -> &'static ModelSpec {
        &MODEL_TABLE[self as usize]
    }

    /// Returns the model identifier as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::MobileNetV1 => "mobilenet_v1",
            ModelKind::EfficientNetV0 => "efficientnet_v0",
            ModelKind::EfficientNetV1 => "efficientnet_v1",
            ModelKind::EfficientNetV2 => "efficientnet_v2",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

/// Path of the model artifact inside `dir`.
pub fn model_path(dir: &Path, spec: &ModelSpec) -> PathBuf {
    dir.join(spec.artifact)
}

/// Reads the whole model artifact into memory.
pub fn load_model_bytes(dir: &Path, spec: &ModelSpec) -> Result<Vec<u8>> {
    let path = model_path(dir, spec);
    log::info!("Loading model from {}", path.display());

    std::fs::read(&path).map_err(|e| ClassifierError::ModelLoad {
        path,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_table_entry() {
        for (i, kind) in ModelKind::ALL.into_iter().enumerate() {
            assert_eq!(kind as usize, i);
            let spec = kind.spec();
            assert_eq!(spec.artifact, "1.tflite");
            assert_eq!(spec.input_shape(), [1, 128, 128, 3]);
            assert_eq!(spec.input_len(), 128 * 128 * 3);
            assert_eq!(spec.num_classes, 1001);
        }
    }

    #[test]
    fn parses_identifiers() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.as_str().parse::<ModelKind>(), Ok(kind));
        }
        assert!("resnet".parse::<ModelKind>().is_err());
    }

    #[test]
    fn missing_artifact_is_a_load_error() {
        let dir = std::env::temp_dir().join("kornia-classifier-no-such-dir");
        let err = load_model_bytes(&dir, ModelKind::MobileNetV1.spec()).unwrap_err();
        match err {
            ClassifierError::ModelLoad { path, .. } => assert!(path.ends_with("1.tflite")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
