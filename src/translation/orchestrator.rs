// Orchestrator - drives one video translation attempt from submission to a terminal state

use super::catalog::LanguageCatalog;
use super::error::{GENERIC_FAILURE_MESSAGE, Result, TranslateError, TransportError};
use super::transport::{CONFIDENCE_HEADER, DETECTED_LANGUAGE_HEADER, Transport, TransportResponse};
use super::types::{
    AttemptState, ResponseMetadata, TranslateForm, TranslatedVideo, TranslationOutcome, TranslationRequest,
    TranslationSuccess, disposition_file_name,
};
use futures_util::Stream;
use serde::Deserialize;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Identifies one submission. Later submissions always get larger ids; 0 is the idle session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The session's current attempt and its state
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSnapshot {
    pub attempt: AttemptId,
    pub state: AttemptState,
}

/// Runs translation attempts against a transport.
///
/// Only the most recent submission is tracked. Submitting again supersedes the
/// previous attempt without aborting its request; whatever it receives later is dropped.
pub struct Orchestrator<T: Transport> {
    transport: Arc<T>,
    next_id: AtomicU64,
    session: Arc<watch::Sender<AttemptSnapshot>>,
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(transport: T) -> Self {
        let (session, _) = watch::channel(AttemptSnapshot {
            attempt: AttemptId(0),
            state: AttemptState::Idle,
        });

        Self {
            transport: Arc::new(transport),
            next_id: AtomicU64::new(0),
            session: Arc::new(session),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the target language catalog through the same transport
    pub async fn languages(&self) -> LanguageCatalog {
        LanguageCatalog::load(self.transport.as_ref()).await
    }

    /// Snapshot of the current attempt
    pub fn current(&self) -> AttemptSnapshot {
        self.session.borrow().clone()
    }

    /// Watch the session state as attempts progress
    pub fn subscribe(&self) -> watch::Receiver<AttemptSnapshot> {
        self.session.subscribe()
    }

    /// Start a new attempt, replacing whatever attempt is current.
    ///
    /// Invalid input is rejected here, before any request is made and without
    /// touching the session state. Must be called from within a tokio runtime.
    pub fn submit(&self, request: TranslationRequest) -> Result<Attempt> {
        let form = request.into_upload()?;

        let id = AttemptId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let (events, receiver) = mpsc::unbounded_channel();
        let reporter = Reporter {
            id,
            session: self.session.clone(),
            events,
        };

        tracing::info!(
            "Attempt {}: translating {} ({} bytes) to {}",
            id,
            form.file.file_name,
            form.file.len(),
            form.target_lang
        );
        reporter.begin();

        let transport = self.transport.clone();
        let task = tokio::spawn(async move { run_attempt(transport, form, reporter).await });

        Ok(Attempt {
            id,
            events: receiver,
            task,
        })
    }
}

/// Handle to a submitted attempt.
///
/// Yields this attempt's states as a stream. The stream ends after the terminal
/// state, or early if the attempt is superseded.
pub struct Attempt {
    id: AttemptId,
    events: mpsc::UnboundedReceiver<AttemptState>,
    task: JoinHandle<Option<TranslationOutcome>>,
}

impl Attempt {
    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub async fn next_state(&mut self) -> Option<AttemptState> {
        self.events.recv().await
    }

    /// Wait for the terminal outcome. `None` means the attempt was superseded.
    pub async fn outcome(self) -> Option<TranslationOutcome> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Attempt {} task failed: {}", self.id, e);
                None
            }
        }
    }
}

impl Stream for Attempt {
    type Item = AttemptState;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}

/// Publishes one attempt's states while it is still the current one
struct Reporter {
    id: AttemptId,
    session: Arc<watch::Sender<AttemptSnapshot>>,
    events: mpsc::UnboundedSender<AttemptState>,
}

impl Reporter {
    /// Take over the session unless a newer attempt already has
    fn begin(&self) -> bool {
        let id = self.id;
        let current = self.session.send_if_modified(|snapshot| {
            if snapshot.attempt >= id {
                return false;
            }
            *snapshot = AttemptSnapshot {
                attempt: id,
                state: AttemptState::Uploading,
            };
            true
        });

        if current {
            let _ = self.events.send(AttemptState::Uploading);
        }
        current
    }

    /// Returns false once the attempt has been superseded
    fn publish(&self, state: AttemptState) -> bool {
        let id = self.id;
        let stage = state.stage();
        let next = state.clone();

        let current = self.session.send_if_modified(|snapshot| {
            if snapshot.attempt != id {
                return false;
            }
            snapshot.state = next;
            true
        });

        if current {
            tracing::debug!("Attempt {}: {}", id, stage.as_str());
            let _ = self.events.send(state);
        } else {
            tracing::debug!("Attempt {} superseded, dropping {}", id, stage.as_str());
        }
        current
    }
}

/// Why an attempt stopped short of a preview
enum Interrupted {
    Superseded,
    Failed(TranslateError),
}

impl From<TranslateError> for Interrupted {
    fn from(err: TranslateError) -> Self {
        Interrupted::Failed(err)
    }
}

impl From<TransportError> for Interrupted {
    fn from(err: TransportError) -> Self {
        Interrupted::Failed(TranslateError::Transport(err))
    }
}

async fn run_attempt<T: Transport>(
    transport: Arc<T>,
    form: TranslateForm,
    reporter: Reporter,
) -> Option<TranslationOutcome> {
    let terminal = match execute(transport.as_ref(), form, &reporter).await {
        Ok(success) => AttemptState::Complete(success),
        Err(Interrupted::Failed(error)) => AttemptState::Error(error),
        Err(Interrupted::Superseded) => return None,
    };

    let outcome = terminal.outcome();
    if !reporter.publish(terminal) {
        tracing::warn!("Attempt {} finished after being superseded, result discarded", reporter.id);
        return None;
    }

    match &outcome {
        Some(TranslationOutcome::Success(success)) => tracing::info!(
            "Attempt {}: complete ({} bytes, detected {:?}, confidence {:.2})",
            reporter.id,
            success.video.len(),
            success.detected_language,
            success.confidence
        ),
        Some(TranslationOutcome::Failure { error }) => {
            tracing::info!("Attempt {}: failed: {}", reporter.id, error)
        }
        None => {}
    }
    outcome
}

async fn execute<T: Transport>(
    transport: &T,
    form: TranslateForm,
    reporter: &Reporter,
) -> Result<TranslationSuccess, Interrupted> {
    if !reporter.publish(AttemptState::Translating) {
        return Err(Interrupted::Superseded);
    }

    let response = transport.translate_video(form).await?;

    if !response.is_success() {
        let status = response.status();
        let message = service_error_message(response).await;
        return Err(TranslateError::Service { status, message }.into());
    }

    let metadata = ResponseMetadata::from_headers(
        response.header(DETECTED_LANGUAGE_HEADER).as_deref(),
        response.header(CONFIDENCE_HEADER).as_deref(),
    );
    let content_type = response.header("Content-Type");
    let file_name = response
        .header("Content-Disposition")
        .as_deref()
        .and_then(disposition_file_name);

    if !reporter.publish(AttemptState::RenderingPreview(metadata.clone())) {
        return Err(Interrupted::Superseded);
    }

    let bytes = response.bytes().await?;

    Ok(TranslationSuccess {
        video: TranslatedVideo::new(bytes, content_type, file_name),
        detected_language: metadata.detected_language,
        confidence: metadata.confidence,
        low_confidence: metadata.low_confidence,
    })
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// The service's `detail` text, or a generic message when there is none to show
async fn service_error_message(response: Box<dyn TransportResponse>) -> String {
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("Could not read error body: {}", e);
            return GENERIC_FAILURE_MESSAGE.to_string();
        }
    };

    serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|d| d.as_str().map(str::to_string))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}
