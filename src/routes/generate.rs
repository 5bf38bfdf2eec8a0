//! Document generation route
//!
//! Resolves the requested numbers, warms the QR cache (any failure here
//! still surfaces as a proper error response), then streams the PDF while a
//! blocking task renders pages into an mpsc-backed body. Once bytes are
//! flowing, a failure can only truncate the stream; it is logged and the
//! job is marked by never reaching 100% progress.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::Response,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{AppError, Result};
use crate::numbers::NumberSet;
use crate::pdf::{render_document, warm_cache, ChannelWriter, RenderJob};
use crate::progress::EXPIRY_DELAY;
use crate::state::AppState;

/// Create the generation router
pub fn router() -> Router<AppState> {
    Router::new().route("/generate-pdf", post(generate_pdf))
}

/// Generation request body. `numbers` values may be integers or numeric
/// strings; `request_id` is an opaque token minted by the caller for
/// correlating the progress channel.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub numbers: Option<Vec<serde_json::Value>>,
    pub request_id: Option<String>,
}

async fn generate_pdf(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response> {
    let numbers = NumberSet::resolve(
        request.numbers.as_deref(),
        request.start,
        request.end,
    )?;
    let job = RenderJob::new(
        numbers,
        request.request_id,
        &state.config().document.filename_prefix,
    );
    tracing::info!(
        "generating {} ({} numbers)",
        job.filename,
        job.numbers.len()
    );

    // Warm phase runs before any response bytes, so cache failures still
    // produce a structured error response.
    warm_cache(&job, state.qr_cache(), state.progress()).await?;

    let filename = job.filename.clone();
    let (tx, rx) = mpsc::channel::<Bytes>(8);
    spawn_render(state.clone(), job, tx);

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    Response::builder()
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Drive the render phase on a blocking task and settle progress afterwards.
fn spawn_render(state: AppState, job: RenderJob, tx: mpsc::Sender<Bytes>) {
    tokio::spawn(async move {
        let request_id = job.request_id.clone();
        let filename = job.filename.clone();

        let rendered = tokio::task::spawn_blocking({
            let state = state.clone();
            move || {
                render_document(
                    ChannelWriter::new(tx),
                    &job,
                    state.qr_cache(),
                    state.progress(),
                    &state.config().document.caption,
                )
            }
        })
        .await;

        match rendered {
            Ok(Ok(())) => {
                if let Some(id) = request_id {
                    state.progress().complete(&id);
                    state.progress().expire_after(id, EXPIRY_DELAY);
                }
            }
            Ok(Err(AppError::StreamWrite(e))) => {
                // Peer gone or transport broke: the client sees a truncated
                // stream. No retry; the caller must re-request.
                tracing::warn!("stream for {} aborted: {}", filename, e);
            }
            Ok(Err(e)) => {
                tracing::error!("rendering {} failed mid-stream: {}", filename, e);
            }
            Err(e) => {
                tracing::error!("render task for {} panicked: {}", filename, e);
            }
        }
    });
}
