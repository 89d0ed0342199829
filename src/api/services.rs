use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use http_body_util::BodyExt;
use tracing::{info, warn};

use super::{
    models::{
        EnabledQuery, EnabledResponse, HealthResponse, HeartbeatResponse, TranslateRequest,
        TranslateResponse, WorkerStatus,
    },
    state::AppState,
};
use crate::api::error::ApiError;
use crate::provider::TaskOutcome;
use crate::worker::dispatcher::translate_task;
use crate::worker::report::report_outcome;

/// Push-style translation endpoint (POST /translate)
///
/// Runs one task through the gateway on the request path and reports the
/// outcome for `task_id` to the host, exactly like a polled task. An
/// inference failure is reported as a task error and answered with a
/// generic 500. A result the host never acknowledges is answered with 503
/// so the caller knows the task is still open.
pub async fn translate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    super::utils::parse_content_type(content_type)?;

    let body_bytes = read_body(body, state.config.server.max_payload_bytes).await?;
    let request: TranslateRequest = serde_json::from_slice(&body_bytes)?;
    let (task_id, input) = request.into_parts();

    if input.target_language.trim().is_empty() {
        let message = "target_language must not be empty";
        warn!(%task_id, "Rejecting task without a target language");
        report_outcome(
            state.sources.as_ref(),
            state.source.as_ref(),
            &task_id,
            &TaskOutcome::Error(message.to_string()),
            &state.metrics,
        )
        .await;
        return Err(ApiError::InvalidPayload(message.into()));
    }

    let outcome = translate_task(&state.gateway, &task_id, &input, &state.metrics).await;
    let reported = report_outcome(
        state.sources.as_ref(),
        state.source.as_ref(),
        &task_id,
        &outcome,
        &state.metrics,
    )
    .await;

    if !reported {
        return Err(ApiError::Unavailable(
            "task result could not be reported to the host".into(),
        ));
    }

    match outcome {
        TaskOutcome::Output(output) => Ok((StatusCode::OK, Json(TranslateResponse { output }))),
        TaskOutcome::Error(_) => Err(ApiError::Internal),
    }
}

/// Reads request body and validates size
///
/// Decompression is handled by RequestDecompressionLayer.
async fn read_body(body: axum::body::Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let data = body
        .collect()
        .await
        .map_err(|err| ApiError::InvalidPayload(err.to_string()))?
        .to_bytes()
        .to_vec();

    super::utils::validate_body_size(&data, max_size)?;

    Ok(data)
}

/// Enabled notification from the host (PUT /enabled?enabled=0|1)
///
/// Registration failures do not fail the request; they are returned in the
/// `error` field the host displays.
pub async fn set_enabled(
    State(state): State<AppState>,
    Query(query): Query<EnabledQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let enabled = match query.enabled {
        0 => false,
        1 => true,
        other => {
            return Err(ApiError::InvalidPayload(format!(
                "enabled must be 0 or 1, got {other}"
            )));
        }
    };

    info!(enabled, "Enabled state changed");
    let error = match state.lifecycle.on_enabled_changed(enabled).await {
        Ok(()) => String::new(),
        Err(e) => e.to_string(),
    };

    Ok((StatusCode::OK, Json(EnabledResponse { error })))
}

/// GET /heartbeat
pub async fn heartbeat() -> impl IntoResponse {
    Json(HeartbeatResponse {
        status: "ok".to_string(),
    })
}

/// GET /languages
pub async fn languages(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.languages.as_ref().clone())
}

/// Health check endpoint (GET /health)
///
/// Reports the worker status and counters. Always 200 while the process
/// serves requests; a disabled worker is not unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let lifecycle = &state.lifecycle;

    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_replicas: state.gateway.replica_count(),
        worker: WorkerStatus {
            enabled: lifecycle.state().is_active(),
            running: lifecycle.is_running(),
            live_workers: lifecycle.live_workers(),
        },
        metrics: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(response))
}
