use crate::config::Config;
use crate::error::ZendeskError;
use crate::types::TicketRequest;
use crate::utils::clean_phone_number;
use crate::zendesk_types::{
    NewRequester, NewTicket, TicketComment, TicketEnvelope, TicketResponse, TicketResult,
    TicketStatus, TicketUpdate, UserSearchResponse, UserTicketsResponse, ZendeskUser,
};

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

/// Name given to requesters created inline because no user matched the caller's phone.
pub const NEW_CALLER_NAME: &str = "New Caller - Voice Agent";

/// Internal note left on tickets closed during user cleanup.
pub const CLEANUP_CLOSE_NOTE: &str = "Ticket closed automatically as part of user cleanup.";

/// Operations this service needs from the helpdesk. None of them retry.
#[async_trait]
pub trait TicketApi: Send + Sync {
    async fn create_ticket(&self, request: &TicketRequest) -> Result<TicketResult, ZendeskError>;

    /// Users whose phone matches `phone` digit for digit. A number with no digits matches
    /// nobody.
    async fn search_user_by_phone(&self, phone: &str) -> Result<Vec<ZendeskUser>, ZendeskError>;

    async fn update_ticket(
        &self,
        ticket_id: i64,
        update: &TicketUpdate,
    ) -> Result<TicketResult, ZendeskError>;

    /// Users whose name starts with `prefix`.
    async fn search_users_by_name_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<ZendeskUser>, ZendeskError>;

    /// Tickets requested by `user_id`, in any status.
    async fn user_tickets(&self, user_id: i64) -> Result<Vec<TicketResult>, ZendeskError>;

    async fn delete_user(&self, user_id: i64) -> Result<(), ZendeskError>;

    /// Name of the first user registered under `phone`.
    async fn user_name_by_phone(&self, phone: &str) -> Result<Option<String>, ZendeskError> {
        let users = self.search_user_by_phone(phone).await?;
        let name = users
            .first()
            .map(|u| u.name.clone().unwrap_or_else(|| "Name not available".to_string()));
        info!(phone, found = name.is_some(), "looked up user name by phone");
        Ok(name)
    }

    async fn close_ticket(&self, ticket_id: i64) -> Result<TicketResult, ZendeskError> {
        let update = TicketUpdate {
            comment: Some(TicketComment {
                body: CLEANUP_CLOSE_NOTE.to_string(),
                public: false,
            }),
            status: Some(TicketStatus::Closed),
            ..Default::default()
        };
        self.update_ticket(ticket_id, &update).await
    }

    /// Close every ticket the user still has open, then delete the user. Stops at the first
    /// ticket that fails to close and leaves the user in place.
    async fn delete_user_with_tickets(&self, user_id: i64) -> Result<(), ZendeskError> {
        let tickets = self.user_tickets(user_id).await?;
        for ticket in tickets.iter().filter(|t| t.status != "closed") {
            info!(user_id, ticket_id = ticket.id, "closing ticket before user deletion");
            self.close_ticket(ticket.id).await.map_err(|e| {
                error!(error=%e, user_id, ticket_id = ticket.id, "failed to close ticket");
                e
            })?;
        }
        info!(user_id, "all tickets closed, deleting user");
        self.delete_user(user_id).await
    }
}

/// Pick the requester for a new ticket: the first user with a real name, otherwise the first
/// user found.
pub fn select_requester(users: &[ZendeskUser]) -> Option<&ZendeskUser> {
    users
        .iter()
        .find(|u| {
            u.name
                .as_deref()
                .map_or(false, |n| !n.is_empty() && !n.eq_ignore_ascii_case("customer"))
        })
        .or_else(|| users.first())
}

pub struct ZendeskClient {
    http_client: reqwest::Client,
    base_url: String,
    email: String,
    api_token: String,
}

impl ZendeskClient {
    pub fn new(config: &Config) -> Result<Self, ZendeskError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.zendesk_request_timeout)
            .build()?;
        info!(domain = %config.zendesk_domain, "initialized zendesk client");
        Ok(Self {
            http_client,
            base_url: config.zendesk_base_url.trim_end_matches('/').to_string(),
            email: config.zendesk_email.clone(),
            api_token: config.zendesk_api_token.clone(),
        })
    }

    fn username(&self) -> String {
        format!("{}/token", self.email)
    }

    async fn search_users(&self, query: &str) -> Result<Vec<ZendeskUser>, ZendeskError> {
        let url = format!("{}/search.json", self.base_url);
        let resp = self
            .http_client
            .get(url)
            .basic_auth(self.username(), Some(&self.api_token))
            .query(&[("query", query)])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            error!(%status, query, "zendesk user search failed");
            return Err(ZendeskError::Status { status, body });
        }
        let users = resp.json::<UserSearchResponse>().await?.results;
        info!(count = users.len(), "zendesk user search complete");
        for user in &users {
            debug!(user_id = user.id, name = ?user.name, "found user");
        }
        Ok(users)
    }

    async fn read_ticket(resp: reqwest::Response) -> Result<TicketResult, ZendeskError> {
        let status = resp.status();
        let body = resp.text().await?;
        debug!(%status, "zendesk response");
        trace!(body=%body, "zendesk response body");
        if !status.is_success() {
            return Err(ZendeskError::Status { status, body });
        }
        if body.trim().is_empty() {
            return Err(ZendeskError::EmptyResponse);
        }
        let parsed: Option<TicketResponse> = serde_json::from_str(&body)?;
        parsed
            .and_then(|r| r.ticket)
            .ok_or(ZendeskError::EmptyResponse)
    }
}

#[async_trait]
impl TicketApi for ZendeskClient {
    async fn create_ticket(&self, request: &TicketRequest) -> Result<TicketResult, ZendeskError> {
        info!(requester_phone = %request.requester_phone, "creating zendesk ticket");
        debug!(subject = %request.subject, tags = ?request.tags, "ticket content");

        let users = match self.search_user_by_phone(&request.requester_phone).await {
            Ok(users) => users,
            Err(e) => {
                warn!(error=%e, "user lookup failed; creating ticket with a new requester");
                Vec::new()
            }
        };
        let (requester_id, requester) = match select_requester(&users) {
            Some(user) => {
                info!(user_id = user.id, "creating ticket for existing user");
                (Some(user.id), None)
            }
            None => {
                info!("no existing user found, creating ticket with new user");
                let requester = NewRequester {
                    phone: request.requester_phone.clone(),
                    name: NEW_CALLER_NAME.to_string(),
                };
                (None, Some(requester))
            }
        };
        let payload = TicketEnvelope {
            ticket: NewTicket {
                subject: request.subject.clone(),
                comment: TicketComment {
                    body: request.description.clone(),
                    public: request.public,
                },
                tags: request.tags.clone(),
                requester_id,
                requester,
            },
        };

        let url = format!("{}/tickets.json", self.base_url);
        let resp = self
            .http_client
            .post(url)
            .basic_auth(self.username(), Some(&self.api_token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, "failed to send ticket create request to zendesk");
                ZendeskError::from(e)
            })?;
        let ticket = Self::read_ticket(resp).await.map_err(|e| {
            error!(error=%e, "zendesk rejected ticket creation");
            e
        })?;
        info!(ticket_id = ticket.id, "created zendesk ticket");
        Ok(ticket)
    }

    async fn search_user_by_phone(&self, phone: &str) -> Result<Vec<ZendeskUser>, ZendeskError> {
        let clean_phone = clean_phone_number(phone);
        if clean_phone.is_empty() {
            debug!(phone, "phone has no digits; skipping user search");
            return Ok(Vec::new());
        }
        debug!(phone, clean_phone = %clean_phone, "searching zendesk users by phone");
        self.search_users(&format!("type:user phone:{clean_phone}")).await
    }

    async fn update_ticket(
        &self,
        ticket_id: i64,
        update: &TicketUpdate,
    ) -> Result<TicketResult, ZendeskError> {
        info!(ticket_id, "updating zendesk ticket");
        let url = format!("{}/tickets/{ticket_id}.json", self.base_url);
        let resp = self
            .http_client
            .put(url)
            .basic_auth(self.username(), Some(&self.api_token))
            .json(&TicketEnvelope { ticket: update })
            .send()
            .await?;
        let ticket = Self::read_ticket(resp).await.map_err(|e| {
            error!(error=%e, ticket_id, "zendesk rejected ticket update");
            e
        })?;
        info!(ticket_id, status = %ticket.status, "updated zendesk ticket");
        Ok(ticket)
    }

    async fn search_users_by_name_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<ZendeskUser>, ZendeskError> {
        debug!(prefix, "searching zendesk users by name prefix");
        self.search_users(&format!("type:user name:\"{prefix}*\"")).await
    }

    async fn user_tickets(&self, user_id: i64) -> Result<Vec<TicketResult>, ZendeskError> {
        let url = format!("{}/users/{user_id}/tickets/requested.json", self.base_url);
        let resp = self
            .http_client
            .get(url)
            .basic_auth(self.username(), Some(&self.api_token))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            error!(%status, user_id, "failed to list user tickets");
            return Err(ZendeskError::Status { status, body });
        }
        let tickets = resp.json::<UserTicketsResponse>().await?.tickets;
        info!(user_id, count = tickets.len(), "listed user tickets");
        Ok(tickets)
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), ZendeskError> {
        let url = format!("{}/users/{user_id}.json", self.base_url);
        let resp = self
            .http_client
            .delete(url)
            .basic_auth(self.username(), Some(&self.api_token))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            error!(%status, user_id, "zendesk rejected user deletion");
            return Err(ZendeskError::Status { status, body });
        }
        info!(user_id, "deleted zendesk user");
        Ok(())
    }
}
