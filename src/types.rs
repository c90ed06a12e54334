use crate::call_types::CallEventPayload;
use crate::config::{Config, MAX_DESCRIPTION_LENGTH, MAX_SUBJECT_LENGTH};
use crate::error::AppError;
use crate::idempotency::IdempotencyStore;
use crate::utils::{sanitize_tags, truncate, validate_phone_number};
use crate::validate::{FieldKind, FieldRule, RequestSchema};
use crate::zendesk::TicketApi;

use serde::Deserialize;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub tickets: Arc<dyn TicketApi>,
    // call id => ticket created for it
    pub processed_calls: Arc<dyn IdempotencyStore>,
}

/// Normalized input to ticket creation, built fresh for every request.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRequest {
    pub subject: String,
    pub description: String,
    pub requester_phone: String,
    pub tags: Vec<String>,
    pub public: bool,
}

impl TicketRequest {
    /// Bound subject and description lengths and sanitize tags, falling back to
    /// `default_tags` when nothing usable remains.
    pub fn new(
        subject: &str,
        description: &str,
        requester_phone: &str,
        tags: &[String],
        public: bool,
        default_tags: Vec<String>,
    ) -> Self {
        let mut tags = sanitize_tags(tags);
        if tags.is_empty() {
            tags = default_tags;
        }
        Self {
            subject: truncate(subject.trim(), MAX_SUBJECT_LENGTH),
            description: truncate(description, MAX_DESCRIPTION_LENGTH),
            requester_phone: requester_phone.trim().to_string(),
            tags,
            public,
        }
    }
}

/// Body of `POST /create_zendesk_ticket`.
#[derive(Deserialize, Debug)]
pub struct ManualTicketPayload {
    pub subject: String,
    pub description: String,
    pub requester_phone: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub public: Option<bool>,
}

impl ManualTicketPayload {
    pub fn into_request(self, default_tags: Vec<String>) -> Result<TicketRequest, AppError> {
        if !validate_phone_number(&self.requester_phone) {
            return Err(AppError::ClientInput("Invalid phone number format".into()));
        }
        Ok(TicketRequest::new(
            &self.subject,
            &self.description,
            &self.requester_phone,
            self.tags.as_deref().unwrap_or_default(),
            self.public.unwrap_or(false),
            default_tags,
        ))
    }
}

impl RequestSchema for ManualTicketPayload {
    const REQUIRED: &'static [FieldRule] = &[
        FieldRule::new("subject", FieldKind::Text),
        FieldRule::new("description", FieldKind::Text),
        FieldRule::new("requester_phone", FieldKind::Text),
    ];
    const OPTIONAL: &'static [FieldRule] = &[
        FieldRule::new("tags", FieldKind::TextList),
        FieldRule::new("public", FieldKind::Boolean),
    ];
}

impl RequestSchema for CallEventPayload {
    const ROOT: Option<&'static str> = Some("call");
    const REQUIRED: &'static [FieldRule] = &[
        FieldRule::new("call_id", FieldKind::Text),
        FieldRule::new("from_number", FieldKind::Text),
        FieldRule::new("call_status", FieldKind::Text),
    ];
    const OPTIONAL: &'static [FieldRule] = &[
        FieldRule::new("start_timestamp", FieldKind::Integer),
        FieldRule::new("end_timestamp", FieldKind::Integer),
        FieldRule::new("duration_ms", FieldKind::Integer),
        FieldRule::new("transcript", FieldKind::Text),
        FieldRule::new("call_analysis", FieldKind::Object),
    ];
}
