use crate::call_types::CallEvent;
use crate::config::{MAX_TAG_LENGTH, PHONE_NUMBER_MAX_LENGTH, PHONE_NUMBER_MIN_LENGTH};

use serde_json::Value;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");

/// Strip everything but ASCII digits from a phone number.
pub fn clean_phone_number(phone_number: &str) -> String {
    phone_number.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn validate_phone_number(phone_number: &str) -> bool {
    let digits = clean_phone_number(phone_number).len();
    (PHONE_NUMBER_MIN_LENGTH..=PHONE_NUMBER_MAX_LENGTH).contains(&digits)
}

/// Cut `text` to at most `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Render milliseconds since the epoch as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_ms) * 1_000_000)
        .ok()
        .and_then(|dt| dt.format(TIMESTAMP_FORMAT).ok())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn call_summary(call: &CallEvent) -> Option<&str> {
    call.call_analysis
        .as_ref()
        .and_then(|a| a.call_summary.as_deref())
        .filter(|s| !s.is_empty())
}

/// Short summary for a call: the provider's analysis when present, else the head of the
/// transcript.
pub fn extract_call_summary(call: &CallEvent) -> String {
    if let Some(summary) = call_summary(call) {
        return truncate(summary, 100);
    }
    match call.transcript.as_deref().filter(|t| !t.is_empty()) {
        Some(transcript) if transcript.chars().count() > 100 => {
            let mut head: String = transcript.chars().take(100).collect();
            head.push_str("...");
            head
        }
        Some(transcript) => transcript.to_string(),
        None => "No summary available".to_string(),
    }
}

pub fn create_ticket_subject(from_number: &str, summary: &str) -> String {
    let clean_number = clean_phone_number(from_number);
    let display_number = if clean_number.len() == 10 {
        format!("+{clean_number}")
    } else {
        from_number.to_string()
    };
    let summary_part = if summary.is_empty() {
        "Voice Call".to_string()
    } else {
        truncate(summary, 50)
    };
    format!("Voice Call - {display_number} - {summary_part}")
}

/// `- key: value` lines for the provider's custom analysis fields, skipping empty values.
fn caller_details(call: &CallEvent) -> Option<String> {
    let data = call
        .call_analysis
        .as_ref()
        .and_then(|a| a.custom_analysis_data.as_ref())?;
    let lines: Vec<String> = data
        .iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(format!("- {key}: {s}")),
            other => Some(format!("- {key}: {other}")),
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Ticket body for an ended call.
pub fn format_call_description(call: &CallEvent) -> String {
    let timestamp = |ts: Option<i64>| ts.map_or_else(|| "Unknown".to_string(), format_timestamp);
    let duration = call
        .duration_ms
        .map_or_else(|| "Unknown".to_string(), |ms| format!("{:.1} seconds", ms as f64 / 1000.0));
    let recording = call
        .recording_url
        .as_ref()
        .map(|url| format!("\n- Recording URL: {url}"))
        .unwrap_or_default();
    let caller = caller_details(call)
        .map(|lines| format!("\n\nCaller Details:\n{lines}"))
        .unwrap_or_default();

    format!(
        "Call Information:\n\
         - Call ID: {call_id}\n\
         - From: {from}\n\
         - Status: {status}\n\
         - Summary: {summary}{caller}\n\
         \n\
         Call Details:\n\
         - Start Time: {start}\n\
         - End Time: {end}\n\
         - Duration: {duration}{recording}\n\
         \n\
         Transcript:\n\
         {transcript}",
        call_id = call.call_id,
        from = call.from_number,
        status = call.call_status,
        summary = call_summary(call).unwrap_or("No summary available"),
        start = timestamp(call.start_timestamp),
        end = timestamp(call.end_timestamp),
        transcript = call
            .transcript
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("No transcript available"),
    )
}

/// Lowercase tags, drop characters the helpdesk rejects, and discard empty or over-long ones.
pub fn sanitize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| {
            tag.to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
        })
        .filter(|tag| !tag.is_empty() && tag.chars().count() <= MAX_TAG_LENGTH)
        .collect()
}
