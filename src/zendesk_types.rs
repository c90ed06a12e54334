use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct TicketEnvelope<T> {
    pub ticket: T,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TicketComment {
    pub body: String,
    pub public: bool,
}

/// Inline requester, used when no existing user matches the caller's phone.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewRequester {
    pub phone: String,
    pub name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub subject: String,
    pub comment: TicketComment,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<NewRequester>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Pending,
    Solved,
    Closed,
}

/// Partial ticket update; only populated fields are sent.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<TicketComment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
}

/// The slice of a helpdesk ticket this service passes back to its callers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TicketResult {
    pub id: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub requester_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct TicketResponse {
    #[serde(default)]
    pub ticket: Option<TicketResult>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ZendeskUser {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UserSearchResponse {
    #[serde(default)]
    pub results: Vec<ZendeskUser>,
}

#[derive(Deserialize, Debug)]
pub struct UserTicketsResponse {
    #[serde(default)]
    pub tickets: Vec<TicketResult>,
}
