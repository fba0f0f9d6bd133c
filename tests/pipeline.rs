use common::solid_image;
use kornia_classifier::{
    ClassifierError, ClassifierPipeline, InferenceBackend, ModelKind, TensorBuffer,
};
use kornia_image::ImageSize;
use std::sync::{Arc, Mutex};

mod common;

const INPUT: ImageSize = ImageSize {
    width: 128,
    height: 128,
};

#[derive(Debug, thiserror::Error)]
#[error("stub backend failure")]
struct StubError;

/// Returns a fixed score vector and records every tensor it sees.
struct StubBackend {
    scores: Vec<f32>,
    seen: Arc<Mutex<Vec<TensorBuffer>>>,
}

impl InferenceBackend for StubBackend {
    type Error = StubError;

    fn run(&mut self, input: &TensorBuffer) -> Result<Vec<f32>, Self::Error> {
        self.seen.lock().unwrap().push(input.clone());
        Ok(self.scores.clone())
    }
}

struct FailingBackend;

impl InferenceBackend for FailingBackend {
    type Error = StubError;

    fn run(&mut self, _input: &TensorBuffer) -> Result<Vec<f32>, Self::Error> {
        Err(StubError)
    }
}

// 0.01, 0.02, ... with a single peak of 0.9 at `peak`
fn designed_scores(len: usize, peak: usize) -> Vec<f32> {
    (0..len)
        .map(|i| if i == peak { 0.9 } else { (i % 50 + 1) as f32 / 100.0 })
        .collect()
}

#[test]
fn solid_red_image_end_to_end() {
    let spec = *ModelKind::MobileNetV1.spec();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let backend = StubBackend {
        scores: designed_scores(spec.num_classes, 417),
        seen: seen.clone(),
    };
    let mut pipeline = ClassifierPipeline::new(spec, backend);

    let image = solid_image(INPUT, [255, 0, 0]);
    let classification = pipeline.classify(&image).unwrap();

    assert_eq!(classification.index, 417);
    assert_eq!(classification.probabilities.len(), 1001);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let tensor = &seen[0];
    assert_eq!(tensor.shape(), [1, 128, 128, 3]);
    assert_eq!(tensor.len(), 128 * 128 * 3);
    assert_eq!(
        &tensor.as_slice()[..3],
        &[
            (255.0 - 127.5) / 127.5,
            (0.0 - 127.5) / 127.5,
            (0.0 - 127.5) / 127.5
        ]
    );
}

#[test]
fn classification_is_repeatable() {
    let spec = *ModelKind::EfficientNetV0.spec();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let backend = StubBackend {
        scores: designed_scores(spec.num_classes, 3),
        seen: seen.clone(),
    };
    let mut pipeline = ClassifierPipeline::new(spec, backend);
    let image = solid_image(INPUT, [12, 200, 99]);

    let first = pipeline.classify(&image).unwrap();
    let second = pipeline.classify(&image).unwrap();

    assert_eq!(first, second);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], seen[1]);
}

#[test]
fn wrong_image_size_is_reported_before_inference() {
    let spec = *ModelKind::MobileNetV1.spec();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let backend = StubBackend {
        scores: designed_scores(spec.num_classes, 0),
        seen: seen.clone(),
    };
    let mut pipeline = ClassifierPipeline::new(spec, backend);
    let image = solid_image(
        ImageSize {
            width: 224,
            height: 224,
        },
        [0, 0, 0],
    );

    let err = pipeline.classify(&image).unwrap_err();

    assert!(matches!(err, ClassifierError::ShapeMismatch { .. }));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn short_output_is_rejected() {
    let spec = *ModelKind::MobileNetV1.spec();
    let backend = StubBackend {
        scores: vec![0.5; 10],
        seen: Arc::default(),
    };
    let mut pipeline = ClassifierPipeline::new(spec, backend);
    let image = solid_image(INPUT, [1, 2, 3]);

    match pipeline.classify(&image) {
        Err(ClassifierError::UnexpectedOutput { expected, actual }) => {
            assert_eq!(expected, 1001);
            assert_eq!(actual, 10);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn backend_failure_becomes_inference_error() {
    let mut pipeline = ClassifierPipeline::new(*ModelKind::MobileNetV1.spec(), FailingBackend);
    let image = solid_image(INPUT, [1, 2, 3]);

    let err = pipeline.classify(&image).unwrap_err();
    assert_eq!(err.to_string(), "inference failed: stub backend failure");
}
