//! `POST /execute` (§6.1): validates the submitted workflow, then streams
//! progress events over Server-Sent Events. A validation error is returned
//! as a plain 400 response before the stream opens; everything after that
//! point is surfaced as an `error` SSE event, never an HTTP error status.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::app::AppState;
use crate::wire::{to_workflow, ExecuteRequest};

/// §4.8: the engine blocks after this many buffered, unconsumed events.
const EVENT_QUEUE_CAPACITY: usize = 64;

pub async fn execute_handler(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Response {
    let workflow = match to_workflow(request) {
        Ok(workflow) => workflow,
        Err(err) => return bad_request(&err.to_string()),
    };

    if let Err(err) = weave_engine::compile(&workflow) {
        return bad_request(&err.to_string());
    }

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let cancel = CancellationToken::new();

    let engine = state.engine.clone();
    let run_cancel = cancel.clone();
    let timeout_cancel = cancel.clone();
    let timeout = state.request_timeout;

    let timeout_task = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        timeout_cancel.cancel();
    });

    tokio::spawn(async move {
        let _ = engine.run(&workflow, tx, run_cancel).await;
        timeout_task.abort();
    });

    let stream = CancelOnDrop { inner: ReceiverStream::new(rx), cancel };
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn to_sse_event(event: &weave_stream::Event) -> SseEvent {
    let tag = event.sse_tag();
    match event.to_json() {
        Ok(payload) => SseEvent::default()
            .event(tag)
            .json_data(payload)
            .unwrap_or_else(|_| SseEvent::default().event("error").data("event serialization failed")),
        Err(_) => SseEvent::default().event("error").data("event serialization failed"),
    }
}

/// Wraps the event receiver so that dropping the SSE response body — which
/// happens when the client disconnects mid-stream — cancels the run (§4.8,
/// §5). The engine observes the same [`CancellationToken`] at its next
/// scheduling decision and stops emitting further events.
struct CancelOnDrop {
    inner: ReceiverStream<weave_stream::Event>,
    cancel: CancellationToken,
}

impl Stream for CancelOnDrop {
    type Item = Result<SseEvent, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(to_sse_event(&event)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
