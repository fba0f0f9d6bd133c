use argh::FromArgs;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use kornia_classifier::{
    ClassifierEngine, ClassifierError, ClassifierPipeline, ClassifierSession, ClassifyRequest,
    DisplayState, EngineResult, ModelKind, SourceInfo, TractBackend, image_url,
};
use serde_json::json;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

mod messages;

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MODEL_DIR: &str = "assets";

#[derive(FromArgs)]
/// Classifies random images and shows the winning class index.
struct ServerArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// the model to load: mobilenet_v1, efficientnet_v0, efficientnet_v1, efficientnet_v2
    #[argh(option, short = 'm', default = "ModelKind::default()")]
    model: ModelKind,

    /// the directory holding the model artifacts
    #[argh(option, default = "PathBuf::from(DEFAULT_MODEL_DIR)")]
    model_dir: PathBuf,

    /// the image url, defaults to a random image of the model input size
    #[argh(option)]
    image_url: Option<String>,
}

type Engine = ClassifierEngine<ClassifierSession<TractBackend>>;

struct Screen {
    engine: Engine,
    image_url: String,
    display: Mutex<DisplayState>,
    last: Mutex<Option<messages::ClassifyResponse>>,
}

#[derive(Clone)]
enum AppState {
    Ready(Arc<Screen>),
    NoModel(Arc<String>),
}

fn no_model(reason: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "Error loading model", "reason": reason })),
    )
}

async fn post_classify(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let screen = match state {
        AppState::Ready(screen) => screen,
        AppState::NoModel(reason) => return no_model(&reason),
    };

    // an empty body classifies an image from the default url
    let payload = if body.is_empty() {
        messages::ClassifyRequest::default()
    } else {
        match serde_json::from_slice::<messages::ClassifyRequest>(&body) {
            Ok(payload) => payload,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })));
            }
        }
    };
    let url = payload
        .image_url
        .unwrap_or_else(|| screen.image_url.clone());

    match screen.engine.try_schedule(ClassifyRequest::remote(url)) {
        Ok(id) => {
            log::info!("Scheduled classification {id}");
            (StatusCode::OK, Json(json!({ "status": "scheduled", "id": id })))
        }
        Err(ClassifierError::Busy) => {
            log::debug!("Engine is still processing");
            (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Engine is still processing" })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

async fn get_results(State(state): State<AppState>) -> impl IntoResponse {
    let screen = match state {
        AppState::Ready(screen) => screen,
        AppState::NoModel(reason) => return no_model(&reason),
    };

    let status = match screen.engine.try_poll_response() {
        EngineResult::Ready(response) => {
            screen.display.lock().unwrap().apply(&response);

            let source = match &response.request_metadata {
                SourceInfo::Remote(url) => url.clone(),
                SourceInfo::Local(size) => format!("local {}x{}", size.width, size.height),
            };
            let (index, error) = match &response.outcome {
                Ok(outcome) => {
                    log::info!("Classification {} done", response.id);
                    (Some(outcome.classification.index), None)
                }
                Err(e) => {
                    log::warn!("Classification {} failed: {}", response.id, e);
                    (None, Some(e.to_string()))
                }
            };
            *screen.last.lock().unwrap() = Some(messages::ClassifyResponse {
                id: response.id,
                source,
                duration: response.duration,
                index,
                error,
            });
            "updated"
        }
        EngineResult::Empty(state) => state.as_str(),
        EngineResult::Error(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e })),
            );
        }
    };

    let display = screen.display.lock().unwrap().clone();
    let response = messages::ScreenResponse {
        status: status.to_string(),
        image: display.image_size.map(|size| messages::ImageInfo {
            width: size.width,
            height: size.height,
        }),
        label: display.result_label(),
        last: screen.last.lock().unwrap().clone(),
    };

    (StatusCode::OK, Json(json!(response)))
}

fn load_screen(args: &ServerArgs) -> Result<Screen, ClassifierError> {
    let spec = args.model.spec();
    let backend = TractBackend::load(&args.model_dir, spec)?;
    let session = ClassifierSession::new(ClassifierPipeline::new(*spec, backend));

    Ok(Screen {
        engine: ClassifierEngine::new(session),
        image_url: args
            .image_url
            .clone()
            .unwrap_or_else(|| image_url(spec.input_size)),
        display: Mutex::new(DisplayState::default()),
        last: Mutex::new(None),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ServerArgs = argh::from_env();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let state = match load_screen(&args) {
        Ok(screen) => AppState::Ready(Arc::new(screen)),
        Err(e) => {
            log::error!("Error loading model {}: {}", args.model, e);
            AppState::NoModel(Arc::new(e.to_string()))
        }
    };

    let app = Router::new()
        .route("/", get(|| async { "Welcome to kornia-classifier!" }))
        .route("/classify", post(post_classify))
        .route("/results", get(get_results))
        .with_state(state);

    log::info!("Starting the server");
    log::info!("Listening on: {}", addr);
    log::info!("Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
