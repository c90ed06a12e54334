use crate::call_types::{CallEventPayload, CallStatus};
use crate::db_types::IdempotencyRecord;
use crate::error::{handle_error, AppError};
use crate::types::{AppState, ManualTicketPayload, TicketRequest};
use crate::utils::{create_ticket_subject, extract_call_summary, format_call_description};
use crate::zendesk_types::{TicketComment, TicketResult, TicketStatus, TicketUpdate};

use serde::Serialize;
use tracing::{debug, error, info, warn};

pub const DIAGNOSTIC_PHONE: &str = "+15551234567";

/// Terminal, non-error states of a call-ended webhook delivery.
#[derive(Debug)]
pub enum CallEventOutcome {
    Disabled,
    NotEnded(CallStatus),
    AlreadyProcessed(IdempotencyRecord),
    Completed { ticket_id: i64 },
}

/// Task that turns a validated call event into at most one helpdesk ticket per call id.
///
/// Only `ended` deliveries act. A call id already present in the idempotency store
/// short-circuits; otherwise the ticket is created first and the record written after, so a
/// failed creation leaves no record behind and the next delivery can try again.
pub async fn process_call_event(
    app_state: &AppState,
    payload: CallEventPayload,
) -> Result<CallEventOutcome, AppError> {
    let call = payload.call;
    info!(
        call_id = %call.call_id,
        event = ?payload.event,
        status = %call.call_status,
        "received call event"
    );

    if !app_state.config.call_processing_enabled {
        info!(call_id = %call.call_id, "call processing disabled, ignoring event");
        return Ok(CallEventOutcome::Disabled);
    }
    if call.call_status != CallStatus::Ended {
        debug!(call_id = %call.call_id, "call not ended yet");
        return Ok(CallEventOutcome::NotEnded(call.call_status));
    }

    let existing = app_state
        .processed_calls
        .check(&call.call_id)
        .await
        .map_err(|e| {
            error!(error=%e, call_id = %call.call_id, "failed to read idempotency store");
            AppError::Store("Failed to check call processing state")
        })?;
    if let Some(record) = existing {
        info!(call_id = %call.call_id, ticket_id = record.ticket_id, "call already processed");
        return Ok(CallEventOutcome::AlreadyProcessed(record));
    }

    let summary = extract_call_summary(&call);
    let request = TicketRequest::new(
        &create_ticket_subject(&call.from_number, &summary),
        &format_call_description(&call),
        &call.from_number,
        &[],
        false,
        app_state.config.default_tags(),
    );
    let ticket = app_state
        .tickets
        .create_ticket(&request)
        .await
        .map_err(|e| {
            error!(error=%e, call_id = %call.call_id, "failed to create ticket for call");
            AppError::Upstream("Failed to create Zendesk ticket")
        })?;

    match app_state.processed_calls.record(&call.call_id, ticket.id).await {
        Ok(true) => {}
        Ok(false) => warn!(
            call_id = %call.call_id,
            ticket_id = ticket.id,
            "call was recorded concurrently; a duplicate ticket may exist"
        ),
        // The ticket exists either way; a redelivery may duplicate it.
        Err(e) => handle_error(&e),
    }
    info!(call_id = %call.call_id, ticket_id = ticket.id, "ticket created for call");
    Ok(CallEventOutcome::Completed {
        ticket_id: ticket.id,
    })
}

/// Task that creates a ticket straight from a caller-supplied request. No deduplication.
pub async fn submit_manual_ticket(
    app_state: &AppState,
    payload: ManualTicketPayload,
) -> Result<TicketResult, AppError> {
    let request = payload.into_request(app_state.config.default_tags())?;
    info!(requester_phone = %request.requester_phone, "creating manual ticket");
    app_state
        .tickets
        .create_ticket(&request)
        .await
        .map_err(|e| {
            error!(error=%e, "manual ticket creation failed");
            AppError::Upstream("Failed to create Zendesk ticket")
        })
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct DiagnosticReport {
    pub user_search: usize,
    pub ticket_created: bool,
    pub ticket_id: Option<i64>,
    pub ticket_updated: bool,
}

#[derive(Debug)]
pub struct DiagnosticFailure {
    pub report: DiagnosticReport,
    pub error: &'static str,
}

/// Task that walks search → create → update against the live helpdesk. The search result is
/// informational; a failed create or update aborts the run.
pub async fn run_diagnostic_flow(
    app_state: &AppState,
) -> Result<DiagnosticReport, DiagnosticFailure> {
    let mut report = DiagnosticReport::default();

    match app_state.tickets.search_user_by_phone(DIAGNOSTIC_PHONE).await {
        Ok(users) => report.user_search = users.len(),
        Err(e) => warn!(error=%e, "diagnostic user search failed"),
    }

    let request = TicketRequest::new(
        "Test Ticket - Voice Integration",
        "This is a test ticket created by the voice integration system.",
        DIAGNOSTIC_PHONE,
        &["test".to_string(), "voice-integration".to_string()],
        false,
        app_state.config.default_tags(),
    );
    let ticket = match app_state.tickets.create_ticket(&request).await {
        Ok(ticket) => ticket,
        Err(e) => {
            error!(error=%e, "diagnostic ticket creation failed");
            return Err(DiagnosticFailure {
                report,
                error: "Failed to create test ticket",
            });
        }
    };
    report.ticket_created = true;
    report.ticket_id = Some(ticket.id);

    let update = TicketUpdate {
        comment: Some(TicketComment {
            body: "Test ticket updated successfully.".to_string(),
            public: false,
        }),
        tags: Some(vec![
            "test".to_string(),
            "voice-integration".to_string(),
            "updated".to_string(),
        ]),
        status: Some(TicketStatus::Solved),
        ..Default::default()
    };
    if let Err(e) = app_state.tickets.update_ticket(ticket.id, &update).await {
        error!(error=%e, ticket_id = ticket.id, "diagnostic ticket update failed");
        return Err(DiagnosticFailure {
            report,
            error: "Failed to update test ticket",
        });
    }
    report.ticket_updated = true;
    info!(?report, "diagnostic flow complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_types::CallEvent;
    use crate::config::Config;
    use crate::idempotency::{IdempotencyStore, MemoryIdempotencyStore};
    use crate::zendesk::mock::MockTicketApi;
    use crate::zendesk_types::ZendeskUser;

    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn state(tickets: Arc<MockTicketApi>, store: Arc<MemoryIdempotencyStore>) -> AppState {
        AppState {
            config: Config::for_tests("http://unused.invalid"),
            tickets,
            processed_calls: store,
        }
    }

    fn ended_call(call_id: &str) -> CallEventPayload {
        CallEventPayload {
            event: Some("call_ended".into()),
            call: CallEvent {
                call_id: call_id.into(),
                from_number: "+15551234567".into(),
                call_status: CallStatus::Ended,
                start_timestamp: Some(1_640_995_200_000),
                end_timestamp: Some(1_640_995_260_000),
                duration_ms: Some(60_000),
                transcript: Some("User: Hello".into()),
                recording_url: None,
                call_analysis: None,
            },
        }
    }

    #[tokio::test]
    async fn ended_call_creates_ticket_and_record() {
        let tickets = Arc::new(MockTicketApi::returning(999));
        let store = Arc::new(MemoryIdempotencyStore::new());
        let app_state = state(tickets.clone(), store.clone());

        let outcome = process_call_event(&app_state, ended_call("c1")).await.unwrap();
        assert!(matches!(outcome, CallEventOutcome::Completed { ticket_id: 999 }));
        assert_eq!(store.check("c1").await.unwrap().unwrap().ticket_id, 999);

        let created = tickets.created.lock().unwrap();
        assert_eq!(created[0].subject, "Voice Call - +15551234567 - User: Hello");
        assert_eq!(created[0].requester_phone, "+15551234567");
        assert_eq!(created[0].tags, vec!["voice-call", "automated"]);
        assert!(!created[0].public);
    }

    #[tokio::test]
    async fn repeat_delivery_returns_stored_ticket() {
        let tickets = Arc::new(MockTicketApi::returning(999));
        let store = Arc::new(MemoryIdempotencyStore::new());
        let app_state = state(tickets.clone(), store);

        process_call_event(&app_state, ended_call("c1")).await.unwrap();
        match process_call_event(&app_state, ended_call("c1")).await.unwrap() {
            CallEventOutcome::AlreadyProcessed(record) => assert_eq!(record.ticket_id, 999),
            other => panic!("Expected AlreadyProcessed, got {other:?}"),
        }
        assert_eq!(tickets.creates(), 1);
    }

    #[tokio::test]
    async fn unfinished_call_is_ignored() {
        let tickets = Arc::new(MockTicketApi::returning(1));
        let store = Arc::new(MemoryIdempotencyStore::new());
        let app_state = state(tickets.clone(), store.clone());

        let mut payload = ended_call("c2");
        payload.call.call_status = CallStatus::Other("in-progress".into());
        let outcome = process_call_event(&app_state, payload).await.unwrap();
        assert!(matches!(outcome, CallEventOutcome::NotEnded(_)));
        assert_eq!(tickets.creates(), 0);
        assert!(store.check("c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_creation_leaves_no_record() {
        let tickets = Arc::new(MockTicketApi::failing());
        let store = Arc::new(MemoryIdempotencyStore::new());
        let app_state = state(tickets, store.clone());

        let err = process_call_event(&app_state, ended_call("c3")).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert!(store.check("c3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disabled_processing_touches_nothing() {
        let tickets = Arc::new(MockTicketApi::returning(1));
        let store = Arc::new(MemoryIdempotencyStore::new());
        let mut app_state = state(tickets.clone(), store.clone());
        app_state.config.call_processing_enabled = false;

        let outcome = process_call_event(&app_state, ended_call("c4")).await.unwrap();
        assert!(matches!(outcome, CallEventOutcome::Disabled));
        assert_eq!(tickets.creates(), 0);
        assert!(store.check("c4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn diagnostic_flow_reports_each_step() {
        let tickets = Arc::new(MockTicketApi {
            next_ticket_id: 321,
            users: vec![ZendeskUser {
                id: 1,
                name: Some("Jane".into()),
                phone: None,
                email: None,
            }],
            ..Default::default()
        });
        let app_state = state(tickets.clone(), Arc::new(MemoryIdempotencyStore::new()));

        let report = run_diagnostic_flow(&app_state).await.unwrap();
        assert_eq!(
            report,
            DiagnosticReport {
                user_search: 1,
                ticket_created: true,
                ticket_id: Some(321),
                ticket_updated: true,
            }
        );
        assert_eq!(tickets.update_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn diagnostic_search_failure_does_not_block() {
        let tickets = Arc::new(MockTicketApi {
            next_ticket_id: 5,
            fail_search: true,
            ..Default::default()
        });
        let app_state = state(tickets, Arc::new(MemoryIdempotencyStore::new()));
        let report = run_diagnostic_flow(&app_state).await.unwrap();
        assert_eq!(report.user_search, 0);
        assert!(report.ticket_updated);
    }

    #[tokio::test]
    async fn diagnostic_update_failure_aborts() {
        let tickets = Arc::new(MockTicketApi {
            next_ticket_id: 5,
            fail_update: true,
            ..Default::default()
        });
        let app_state = state(tickets, Arc::new(MemoryIdempotencyStore::new()));
        let failure = run_diagnostic_flow(&app_state).await.unwrap_err();
        assert_eq!(failure.error, "Failed to update test ticket");
        assert!(failure.report.ticket_created);
        assert!(!failure.report.ticket_updated);
    }
}
