use crate::error::ClassifierError;
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, mpsc},
    thread::JoinHandle,
    time::{Duration, Instant},
};

// Type alias to simplify complex types
type EngineReceiver<M> = Arc<
    Mutex<
        mpsc::Receiver<
            EngineResponse<
                <<M as EngineModel>::Request as RequestMetadata>::Metadata,
                <M as EngineModel>::Response,
                <M as EngineModel>::Error,
            >,
        >,
    >,
>;

/// Trait for the work executed by the [`ClassifierEngine`] worker thread.
pub trait EngineModel {
    /// The request type that the model accepts.
    type Request;
    /// The response type that the model returns.
    type Response;
    /// The error type that can be returned while handling a request.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handles one request.
    fn run(&mut self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}

/// Represents the current state of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Ready to accept a request.
    Idle,
    /// A request is in flight; new requests are rejected.
    Processing,
    /// The worker has exited, after `stop` or a panic in the model.
    Stopped,
}

impl EngineState {
    /// Returns the state as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Processing => "processing",
            EngineState::Stopped => "stopped",
        }
    }
}

/// Trait for extracting lightweight metadata from requests.
///
/// The metadata travels back with the response so callers can report what was
/// processed without keeping the (possibly large) request around.
pub trait RequestMetadata {
    /// The lightweight metadata type that represents the request.
    type Metadata: Send + 'static;

    /// Extracts metadata from the request without cloning heavy data.
    fn metadata(&self) -> Self::Metadata;
}

struct EngineRequest<Req> {
    id: u64,
    request: Req,
}

/// Response delivered for every scheduled request, successful or not.
pub struct EngineResponse<Metadata, Res, E> {
    /// Identifier returned by [`ClassifierEngine::try_schedule`].
    pub id: u64,
    /// Timestamp when the model started on the request.
    pub start_time: Instant,
    /// Time spent in the model.
    pub duration: Duration,
    /// Metadata extracted from the original request.
    pub request_metadata: Metadata,
    /// What the model returned.
    pub outcome: Result<Res, E>,
}

/// Result type returned when polling for responses.
pub enum EngineResult<M: EngineModel + Send + 'static>
where
    M::Request: RequestMetadata,
{
    /// A request has finished, with its outcome.
    Ready(EngineResponse<<M::Request as RequestMetadata>::Metadata, M::Response, M::Error>),
    /// No response available yet, with the current engine state.
    Empty(EngineState),
    /// The worker is gone.
    Error(String),
}

/// Single-slot executor that runs a model on a dedicated thread.
///
/// The worker thread owns the model, so it is never invoked concurrently. At most
/// one request is in flight: [`ClassifierEngine::try_schedule`] moves the engine
/// from `Idle` to `Processing` under a lock and rejects the request with
/// [`ClassifierError::Busy`] if it is not idle. The worker always queues a response
/// before going back to `Idle`, whether the model succeeded or failed, so responses
/// come out in the order the requests were accepted.
pub struct ClassifierEngine<M: EngineModel + Send + 'static>
where
    M::Request: Send + RequestMetadata + 'static,
    M::Response: Send + 'static,
{
    state: Arc<Mutex<EngineState>>,
    req_tx: Option<mpsc::Sender<EngineRequest<M::Request>>>,
    rep_rx: EngineReceiver<M>,
    worker_handle: Option<JoinHandle<()>>,
    id_counter: Mutex<u64>,
}

impl<M: EngineModel + Send + 'static> ClassifierEngine<M>
where
    M::Request: Send + RequestMetadata + 'static,
    M::Response: Send + 'static,
{
    /// Creates a new engine and moves `model` to its worker thread.
    pub fn new(mut model: M) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<EngineRequest<M::Request>>();
        let (rep_tx, rep_rx) = mpsc::channel();
        let state = Arc::new(Mutex::new(EngineState::Idle));

        let worker_handle = std::thread::spawn({
            let state = state.clone();
            move || {
                while let Ok(req) = req_rx.recv() {
                    log::debug!("Running request {}", req.id);

                    let request_metadata = req.request.metadata();
                    let start_time = Instant::now();
                    let outcome =
                        match panic::catch_unwind(AssertUnwindSafe(|| model.run(req.request))) {
                            Ok(outcome) => outcome,
                            Err(_) => {
                                log::error!("Model panicked on request {}, stopping engine", req.id);
                                break;
                            }
                        };
                    let duration = start_time.elapsed();

                    match &outcome {
                        Ok(_) => log::debug!("Request {} completed in {:?}", req.id, duration),
                        Err(e) => log::warn!("Request {} failed: {}", req.id, e),
                    }

                    // the response is queued before the gate reopens
                    let mut guard = lock(&state);
                    let _ = rep_tx.send(EngineResponse {
                        id: req.id,
                        start_time,
                        duration,
                        request_metadata,
                        outcome,
                    });
                    *guard = EngineState::Idle;
                }
                // set before the response channel closes
                *lock(&state) = EngineState::Stopped;
                log::debug!("Engine worker stopped");
            }
        });

        Self {
            state,
            req_tx: Some(req_tx),
            rep_rx: Arc::new(Mutex::new(rep_rx)),
            worker_handle: Some(worker_handle),
            id_counter: Mutex::new(0),
        }
    }

    /// Returns the current state of the engine.
    pub fn state(&self) -> EngineState {
        *lock(&self.state)
    }

    /// Schedules a request if no other request is in flight.
    ///
    /// # Returns
    /// The id the response will carry, [`ClassifierError::Busy`] if a request is
    /// still outstanding, or [`ClassifierError::EngineDisconnected`] once stopped or
    /// after the model panicked.
    pub fn try_schedule(&self, request: M::Request) -> Result<u64, ClassifierError> {
        let tx = self
            .req_tx
            .as_ref()
            .ok_or(ClassifierError::EngineDisconnected)?;

        let mut state = lock(&self.state);
        match *state {
            EngineState::Idle => {}
            EngineState::Processing => {
                log::debug!("Rejecting request, engine is processing");
                return Err(ClassifierError::Busy);
            }
            EngineState::Stopped => return Err(ClassifierError::EngineDisconnected),
        }

        let id = {
            let mut counter = lock(&self.id_counter);
            let id = *counter;
            *counter += 1;
            id
        };

        tx.send(EngineRequest { id, request })
            .map_err(|_| ClassifierError::EngineDisconnected)?;
        *state = EngineState::Processing;

        Ok(id)
    }

    /// Attempts to retrieve a finished response without blocking.
    pub fn try_poll_response(&self) -> EngineResult<M> {
        match lock(&self.rep_rx).try_recv() {
            Ok(response) => EngineResult::Ready(response),
            Err(mpsc::TryRecvError::Empty) => EngineResult::Empty(self.state()),
            Err(mpsc::TryRecvError::Disconnected) => {
                log::error!("Response channel disconnected");
                EngineResult::Error("Response channel disconnected".to_string())
            }
        }
    }

    /// Blocks until the next response is available.
    pub fn recv_response(&self) -> EngineResult<M> {
        match lock(&self.rep_rx).recv() {
            Ok(response) => EngineResult::Ready(response),
            Err(mpsc::RecvError) => {
                log::error!("Response channel disconnected");
                EngineResult::Error("Response channel disconnected".to_string())
            }
        }
    }

    /// Stops the engine and joins the worker thread.
    ///
    /// A request already in flight runs to completion first.
    pub fn stop(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}

impl<M: EngineModel + Send + 'static> Drop for ClassifierEngine<M>
where
    M::Request: Send + RequestMetadata + 'static,
    M::Response: Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

// Poisoning is ignored; no guarded value is ever left half-updated.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
