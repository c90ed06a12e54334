use sqlx::types::time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Marker that a ticket was already created for a call. Written once, never updated.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub call_id: String,
    pub ticket_id: i64,
    pub processed_at: OffsetDateTime,
}

impl IdempotencyRecord {
    pub fn new(call_id: &str, ticket_id: i64) -> Self {
        Self {
            call_id: call_id.to_string(),
            ticket_id,
            processed_at: OffsetDateTime::now_utc(),
        }
    }

    /// ISO-8601 rendering of `processed_at`.
    pub fn processed_at_iso(&self) -> String {
        self.processed_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.processed_at.to_string())
    }
}
