use crate::model::ModelSpec;
use kornia_image::{Image, allocator::CpuAllocator};

/// RGB8 image as produced by the image sources.
pub type RgbImage = Image<u8, 3, CpuAllocator>;

/// Per-channel affine normalization `(v - mean) / std`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalization {
    pub mean: f32,
    pub std: f32,
}

impl Normalization {
    #[inline]
    pub fn apply(&self, v: u8) -> f32 {
        (v as f32 - self.mean) / self.std
    }
}

/// Flat `f32` input tensor, row-major with interleaved R, G, B.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorBuffer {
    data: Vec<f32>,
    shape: [usize; 4],
}

impl TensorBuffer {
    /// Shape as `[1, height, width, 3]`.
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Converts an RGB8 image into a normalized `[1, H, W, 3]` tensor.
pub fn normalize(image: &RgbImage, normalization: &Normalization) -> TensorBuffer {
    let data = image
        .as_slice()
        .iter()
        .map(|&v| normalization.apply(v))
        .collect();

    TensorBuffer {
        data,
        shape: [1, image.height(), image.width(), 3],
    }
}

/// Normalizes an image that must already have the model's input size.
///
/// # Panics
///
/// Panics if the image size differs from `spec.input_size`. Images are never
/// resized or cropped to fit.
pub fn normalize_checked(image: &RgbImage, spec: &ModelSpec) -> TensorBuffer {
    let actual = image.size();
    assert!(
        actual == spec.input_size,
        "model input is {}x{} but image is {}x{}",
        spec.input_size.width,
        spec.input_size.height,
        actual.width,
        actual.height,
    );

    let tensor = normalize(image, &spec.normalization);
    debug_assert_eq!(tensor.len(), spec.input_len());
    tensor
}
