//! Ingress validation for JSON request bodies.
//!
//! Each endpoint declares its body as a [`RequestSchema`]: which fields must be present, what
//! JSON type they (and any supplied optional fields) must have, and the typed record serde
//! builds once those checks pass. Rejections name the first offending field.

use crate::error::AppError;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
    TextList,
    Object,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::TextList => value
                .as_array()
                .map_or(false, |items| items.iter().all(Value::is_string)),
            FieldKind::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldRule {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

pub trait RequestSchema: DeserializeOwned {
    /// Key of the nested object holding the fields; `None` when they sit at the top level.
    const ROOT: Option<&'static str> = None;
    const REQUIRED: &'static [FieldRule];
    /// Type-checked only when present and non-null.
    const OPTIONAL: &'static [FieldRule] = &[];
}

fn missing(name: &str) -> AppError {
    AppError::ClientInput(format!("Missing required field: {name}"))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_fields<T: RequestSchema>(scope: &Map<String, Value>) -> Result<(), AppError> {
    for rule in T::REQUIRED {
        let value = match scope.get(rule.name) {
            Some(v) if !is_blank(v) => v,
            _ => return Err(missing(rule.name)),
        };
        if !rule.kind.matches(value) {
            return Err(AppError::ClientInput(format!(
                "Invalid field type: {}",
                rule.name
            )));
        }
    }
    for rule in T::OPTIONAL {
        match scope.get(rule.name) {
            Some(Value::Null) | None => {}
            Some(v) if rule.kind.matches(v) => {}
            Some(_) => {
                return Err(AppError::ClientInput(format!(
                    "Invalid field type: {}",
                    rule.name
                )))
            }
        }
    }
    Ok(())
}

/// Decode and check a raw request body against `T`'s schema.
pub fn validate<T: RequestSchema>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::ClientInput("No data provided".into()));
    }
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error=%e, "request body is not JSON");
        AppError::ClientInput("Invalid JSON payload".into())
    })?;
    let top = match &value {
        Value::Null => return Err(AppError::ClientInput("No data provided".into())),
        Value::Object(map) if map.is_empty() => {
            return Err(AppError::ClientInput("No data provided".into()))
        }
        Value::Object(map) => map,
        _ => return Err(AppError::ClientInput("Invalid JSON payload".into())),
    };
    let scope = match T::ROOT {
        Some(root) => match top.get(root) {
            Some(Value::Object(inner)) => inner,
            _ => return Err(missing(root)),
        },
        None => top,
    };
    check_fields::<T>(scope)?;

    serde_json::from_value(value)
        .map_err(|e| AppError::ClientInput(format!("Invalid payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_types::CallEventPayload;
    use crate::types::ManualTicketPayload;

    fn message<T: RequestSchema + std::fmt::Debug>(body: &str) -> String {
        validate::<T>(body.as_bytes()).unwrap_err().to_string()
    }

    #[test]
    fn empty_body_differs_from_missing_field() {
        assert_eq!(message::<CallEventPayload>(""), "No data provided");
        assert_eq!(message::<CallEventPayload>("  \n"), "No data provided");
        assert_eq!(message::<CallEventPayload>("{}"), "No data provided");
        assert_eq!(message::<CallEventPayload>("null"), "No data provided");
        assert_eq!(
            message::<CallEventPayload>(r#"{"event": "call_ended"}"#),
            "Missing required field: call"
        );
    }

    #[test]
    fn names_first_missing_field() {
        assert_eq!(
            message::<CallEventPayload>(r#"{"call": {"call_id": "c1"}}"#),
            "Missing required field: from_number"
        );
        assert_eq!(
            message::<CallEventPayload>(
                r#"{"call": {"call_id": "", "from_number": "+1555", "call_status": "ended"}}"#
            ),
            "Missing required field: call_id"
        );
        assert_eq!(
            message::<ManualTicketPayload>(
                r#"{"subject": "s", "requester_phone": "+15551234567"}"#
            ),
            "Missing required field: description"
        );
    }

    #[test]
    fn rejects_wrong_types() {
        assert_eq!(
            message::<CallEventPayload>(
                r#"{"call": {"call_id": 7, "from_number": "+1555", "call_status": "ended"}}"#
            ),
            "Invalid field type: call_id"
        );
        assert_eq!(
            message::<ManualTicketPayload>(
                r#"{"subject": "s", "description": "d",
                    "requester_phone": "+15551234567", "tags": "urgent"}"#
            ),
            "Invalid field type: tags"
        );
        assert_eq!(message::<ManualTicketPayload>("[1, 2]"), "Invalid JSON payload");
        assert_eq!(message::<ManualTicketPayload>("{not json"), "Invalid JSON payload");
    }

    #[test]
    fn accepts_complete_call_event() {
        let payload: CallEventPayload = validate(
            br#"{"event": "call_ended", "call": {
                "call_id": "c1", "from_number": "+15551234567", "call_status": "ended",
                "duration_ms": 60000, "transcript": null,
                "call_analysis": {"call_summary": "Customer called for support"}
            }}"#,
        )
        .unwrap();
        assert_eq!(payload.call.call_id, "c1");
        assert_eq!(payload.call.duration_ms, Some(60_000));
        assert_eq!(
            payload.call.call_analysis.unwrap().call_summary.as_deref(),
            Some("Customer called for support")
        );
    }
}
