use crate::{
    error::{ClassifierError, Result},
    model::{InferenceBackend, ModelSpec},
    postprocess::arg_max,
    preprocess::{RgbImage, TensorBuffer, normalize_checked},
};

/// Class scores of one image and the index of the winning class.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub probabilities: Vec<f32>,
    pub index: usize,
}

/// Image to class-scores pipeline over an inference backend.
///
/// The pipeline is stateless between calls: the same image always yields the same
/// tensor, and the backend is the only place where state may live.
pub struct ClassifierPipeline<B: InferenceBackend> {
    spec: ModelSpec,
    backend: B,
}

impl<B: InferenceBackend> ClassifierPipeline<B> {
    pub fn new(spec: ModelSpec, backend: B) -> Self {
        Self { spec, backend }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Checks the image against the model input and builds the input tensor.
    pub fn prepare(&self, image: &RgbImage) -> Result<TensorBuffer> {
        if image.size() != self.spec.input_size {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.spec.input_size,
                actual: image.size(),
            });
        }
        Ok(normalize_checked(image, &self.spec))
    }

    /// Runs the backend once and validates the length of its output.
    pub fn infer(&mut self, tensor: &TensorBuffer) -> Result<Vec<f32>> {
        let probabilities = self
            .backend
            .run(tensor)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        if probabilities.len() != self.spec.num_classes {
            return Err(ClassifierError::UnexpectedOutput {
                expected: self.spec.num_classes,
                actual: probabilities.len(),
            });
        }
        Ok(probabilities)
    }

    /// Classifies one image.
    pub fn classify(&mut self, image: &RgbImage) -> Result<Classification> {
        let tensor = self.prepare(image)?;
        let probabilities = self.infer(&tensor)?;
        let index = arg_max(&probabilities);
        log::debug!("Classified image as class {index}");

        Ok(Classification {
            probabilities,
            index,
        })
    }
}
