use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status reported by the call-analytics provider. Only `ended` is acted upon; every other
/// value is kept verbatim for logging.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum CallStatus {
    Ended,
    Other(String),
}

impl From<String> for CallStatus {
    fn from(s: String) -> Self {
        if s == "ended" {
            CallStatus::Ended
        } else {
            CallStatus::Other(s)
        }
    }
}

impl From<CallStatus> for String {
    fn from(s: CallStatus) -> Self {
        match s {
            CallStatus::Ended => "ended".to_string(),
            CallStatus::Other(s) => s,
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CallStatus::Ended => write!(f, "ended"),
            CallStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CallAnalysis {
    #[serde(default)]
    pub call_summary: Option<String>,
    #[serde(default)]
    pub custom_analysis_data: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CallEvent {
    pub call_id: String,
    pub from_number: String,
    pub call_status: CallStatus,
    #[serde(default)]
    pub start_timestamp: Option<i64>,
    #[serde(default)]
    pub end_timestamp: Option<i64>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub call_analysis: Option<CallAnalysis>,
}

/// Body of `POST /call_events_manager`.
#[derive(Deserialize, Debug, Clone)]
pub struct CallEventPayload {
    #[serde(default)]
    pub event: Option<String>,
    pub call: CallEvent,
}
