use crate::{
    engine::{EngineModel, EngineResponse, RequestMetadata},
    error::ClassifierError,
    fetch::fetch_image,
    model::InferenceBackend,
    pipeline::{Classification, ClassifierPipeline},
    preprocess::RgbImage,
};
use kornia_image::ImageSize;

/// Where the image of a classification request comes from.
pub enum ImageSource {
    /// Download the image from this URL.
    Remote(String),
    /// Use an image that is already in memory.
    Local(RgbImage),
}

pub struct ClassifyRequest {
    pub source: ImageSource,
}

impl ClassifyRequest {
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            source: ImageSource::Remote(url.into()),
        }
    }

    pub fn local(image: RgbImage) -> Self {
        Self {
            source: ImageSource::Local(image),
        }
    }
}

/// Short description of a request, returned alongside its outcome.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceInfo {
    Remote(String),
    Local(ImageSize),
}

impl RequestMetadata for ClassifyRequest {
    type Metadata = SourceInfo;

    fn metadata(&self) -> Self::Metadata {
        match &self.source {
            ImageSource::Remote(url) => SourceInfo::Remote(url.clone()),
            ImageSource::Local(image) => SourceInfo::Local(image.size()),
        }
    }
}

/// The image that was classified and its classification.
pub struct ClassifyOutcome {
    pub image: RgbImage,
    pub classification: Classification,
}

/// Fetch-then-classify job run by the engine.
///
/// The whole sequence, download included, executes inside one engine request, so the
/// engine's busy gate covers it end to end. The HTTP client is created on the first
/// remote request, on the worker thread, since a blocking client must not be built
/// inside an async runtime.
pub struct ClassifierSession<B: InferenceBackend> {
    pipeline: ClassifierPipeline<B>,
    client: Option<reqwest::blocking::Client>,
}

impl<B: InferenceBackend> ClassifierSession<B> {
    pub fn new(pipeline: ClassifierPipeline<B>) -> Self {
        Self {
            pipeline,
            client: None,
        }
    }
}

impl<B: InferenceBackend> EngineModel for ClassifierSession<B> {
    type Request = ClassifyRequest;
    type Response = ClassifyOutcome;
    type Error = ClassifierError;

    fn run(&mut self, request: Self::Request) -> Result<Self::Response, Self::Error> {
        let image = match request.source {
            ImageSource::Remote(url) => {
                let size = self.pipeline.spec().input_size;
                let client = self
                    .client
                    .get_or_insert_with(reqwest::blocking::Client::new);
                fetch_image(client, &url, size)?
            }
            ImageSource::Local(image) => image,
        };

        let classification = self.pipeline.classify(&image)?;

        Ok(ClassifyOutcome {
            image,
            classification,
        })
    }
}

/// What the screen currently shows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayState {
    /// Size of the last successfully classified image.
    pub image_size: Option<ImageSize>,
    /// Winning class of the last successful classification.
    pub max_index: Option<usize>,
}

impl DisplayState {
    /// Applies a finished request. Failures leave the current display untouched.
    pub fn apply<E>(&mut self, response: &EngineResponse<SourceInfo, ClassifyOutcome, E>) {
        if let Ok(outcome) = &response.outcome {
            self.image_size = Some(outcome.image.size());
            self.max_index = Some(outcome.classification.index);
        }
    }

    /// Text of the result label, once a class has been found.
    pub fn result_label(&self) -> Option<String> {
        self.max_index
            .map(|index| format!("Max Probability Index: {index}"))
    }
}
