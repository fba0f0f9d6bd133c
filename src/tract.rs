use crate::{
    error::{ClassifierError, Result},
    model::{InferenceBackend, ModelFormat, ModelSpec, load_model_bytes, model_path},
    preprocess::TensorBuffer,
};
use std::{io::Cursor, path::Path};
use tract_onnx::prelude::*;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Error raised by tract while running a plan.
#[derive(thiserror::Error, Debug)]
#[error("{0:#}")]
pub struct TractRunError(TractError);

/// Inference backend running TFLite or ONNX models with tract.
pub struct TractBackend {
    plan: Plan,
}

impl TractBackend {
    /// Reads the artifact described by `spec` from `dir` and builds a runnable plan.
    pub fn load(dir: &Path, spec: &ModelSpec) -> Result<Self> {
        let bytes = load_model_bytes(dir, spec)?;
        Self::from_bytes(&bytes, spec).map_err(|e| match e {
            ClassifierError::ModelLoad { reason, .. } => ClassifierError::ModelLoad {
                path: model_path(dir, spec),
                reason,
            },
            other => other,
        })
    }

    /// Builds a runnable plan from an in-memory model artifact.
    pub fn from_bytes(bytes: &[u8], spec: &ModelSpec) -> Result<Self> {
        let plan = build_plan(bytes, spec).map_err(|e| ClassifierError::ModelLoad {
            path: spec.artifact.into(),
            reason: format!("{e:?}"),
        })?;
        log::info!("Model {} ready ({:?})", spec.artifact, spec.format);

        Ok(Self { plan })
    }
}

fn build_plan(bytes: &[u8], spec: &ModelSpec) -> TractResult<Plan> {
    let mut reader = Cursor::new(bytes);
    match spec.format {
        ModelFormat::Tflite => tract_tflite::tflite()
            .model_for_read(&mut reader)?
            .into_optimized()?
            .into_runnable(),
        ModelFormat::Onnx => tract_onnx::onnx()
            .model_for_read(&mut reader)?
            .with_input_fact(0, f32::fact(spec.input_shape()).into())?
            .into_optimized()?
            .into_runnable(),
    }
}

impl InferenceBackend for TractBackend {
    type Error = TractRunError;

    fn run(&mut self, input: &TensorBuffer) -> std::result::Result<Vec<f32>, Self::Error> {
        run_plan(&self.plan, input).map_err(TractRunError)
    }
}

fn run_plan(plan: &Plan, input: &TensorBuffer) -> TractResult<Vec<f32>> {
    let tensor: Tensor =
        tract_ndarray::ArrayD::from_shape_vec(input.shape().to_vec(), input.as_slice().to_vec())?
            .into();

    let outputs = plan.run(tvec!(tensor.into()))?;
    let scores = outputs[0].to_array_view::<f32>()?;

    Ok(scores.iter().copied().collect())
}
