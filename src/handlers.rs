use crate::call_types::CallEventPayload;
use crate::error::AppError;
use crate::tasks::{
    process_call_event, run_diagnostic_flow, submit_manual_ticket, CallEventOutcome,
};
use crate::types::{AppState, ManualTicketPayload};
use crate::validate::validate;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{trace, warn};

pub async fn health(State(app_state): State<Arc<AppState>>) -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "status": "healthy",
        "service": app_state.config.service_name,
        "timestamp": timestamp,
    }))
}

fn rejected(e: AppError) -> AppError {
    warn!(error=%e, "rejected request body");
    e
}

/// Webhook fired by the call-analytics provider over a call's lifecycle.
pub async fn call_events_manager(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    trace!(body = %String::from_utf8_lossy(&body), "call event body");
    let payload = validate::<CallEventPayload>(&body).map_err(rejected)?;

    let response = match process_call_event(&app_state, payload).await? {
        CallEventOutcome::Disabled => json!({ "message": "Call processing disabled" }),
        CallEventOutcome::NotEnded(status) => json!({
            "message": "Call not ended yet",
            "call_status": status,
        }),
        CallEventOutcome::AlreadyProcessed(record) => json!({
            "message": "Call already processed",
            "call_id": record.call_id,
            "ticket_id": record.ticket_id,
            "processed_at": record.processed_at_iso(),
        }),
        CallEventOutcome::Completed { ticket_id } => json!({
            "success": true,
            "ticket_id": ticket_id,
            "message": "Ticket created successfully",
        }),
    };
    Ok(Json(response))
}

pub async fn create_zendesk_ticket(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    trace!(body = %String::from_utf8_lossy(&body), "manual ticket body");
    let payload = validate::<ManualTicketPayload>(&body).map_err(rejected)?;
    let ticket = submit_manual_ticket(&app_state, payload).await?;
    Ok(Json(json!({ "success": true, "ticket": ticket })))
}

pub async fn test_zendesk_flow(State(app_state): State<Arc<AppState>>) -> Response {
    match run_diagnostic_flow(&app_state).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "test_results": report,
                "message": "Zendesk integration test completed successfully",
            })),
        )
            .into_response(),
        Err(failure) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": failure.error,
                "test_results": failure.report,
            })),
        )
            .into_response(),
    }
}
