//! Client side of the customer and sales-admin chat views.
//!
//! A view opens one [`ChatSession`] when it mounts, passes it to whatever
//! renders the conversation, and closes it on teardown. Outgoing messages go
//! to the transcript endpoint first and then to the chat service; a failed
//! transcript append is logged and does not hold the message back.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::stream::StreamUserClient;
use crate::types::{ChatCredentials, JoinBody};

const SERVICE: &str = "facade";

/// Transcript author written by the customer view.
pub const CUSTOMER_AUTHOR: &str = "Customer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRole {
    Customer,
    SalesAdmin,
}

/// HTTP client for this service's own endpoints.
#[derive(Debug, Clone)]
pub struct FacadeClient {
    http: Client,
    base_url: String,
}

impl FacadeClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamStatus {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json(&self, rb: reqwest::RequestBuilder, body: &impl Serialize) -> Result<Response> {
        let response = rb
            .json(body)
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))?;
        Self::check(response).await
    }

    pub async fn join(&self, body: &JoinBody) -> Result<ChatCredentials> {
        let response = self
            .send_json(self.http.post(format!("{}/join", self.base_url)), body)
            .await?;
        response
            .json::<ChatCredentials>()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))
    }

    pub async fn append_transcript(&self, lead_id: &str, author: &str, text: &str) -> Result<()> {
        self.send_json(
            self.http.put(format!("{}/transcript", self.base_url)),
            &json!({ "leadId": lead_id, "author": author, "message": { "text": text } }),
        )
        .await?;
        Ok(())
    }

    pub async fn list_leads(&self) -> Result<Vec<Value>> {
        let response = self
            .http
            .get(format!("{}/getleads", self.base_url))
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))?;
        Self::check(response)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))
    }
}

/// Delivery path for a message once it has been mirrored.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, channel_id: &str, text: &str) -> Result<Value>;
}

#[async_trait]
impl MessageSink for StreamUserClient {
    async fn deliver(&self, channel_id: &str, text: &str) -> Result<Value> {
        self.send_message(channel_id, text).await
    }
}

pub struct ChatSession {
    facade: FacadeClient,
    sink: Box<dyn MessageSink>,
    credentials: ChatCredentials,
    role: ViewRole,
    lead_id: String,
    closed: bool,
}

impl ChatSession {
    /// Request credentials for `username` and connect to the chat service at
    /// `stream_base_url` with them.
    pub async fn open(
        facade: FacadeClient,
        stream_base_url: &str,
        role: ViewRole,
        username: &str,
        lead_id: &str,
    ) -> Result<Self> {
        let credentials = facade
            .join(&JoinBody {
                username: Some(username.to_string()),
                lead_id: Some(lead_id.to_string()),
                is_sales_admin: Some(role == ViewRole::SalesAdmin),
            })
            .await?;
        let sink = StreamUserClient::new(
            facade.http.clone(),
            stream_base_url,
            &credentials.api_key,
            &credentials.token,
        );
        Ok(Self::with_sink(facade, Box::new(sink), credentials, role, lead_id))
    }

    pub fn with_sink(
        facade: FacadeClient,
        sink: Box<dyn MessageSink>,
        credentials: ChatCredentials,
        role: ViewRole,
        lead_id: &str,
    ) -> Self {
        tracing::debug!(
            user_id = %credentials.user_id,
            channel_id = %credentials.channel_id,
            ?role,
            "chat session opened"
        );
        Self {
            facade,
            sink,
            credentials,
            role,
            lead_id: lead_id.to_string(),
            closed: false,
        }
    }

    pub fn credentials(&self) -> &ChatCredentials {
        &self.credentials
    }

    pub fn role(&self) -> ViewRole {
        self.role
    }

    /// Name the transcript shows for this view's lines.
    pub fn author(&self) -> &str {
        match self.role {
            ViewRole::Customer => CUSTOMER_AUTHOR,
            ViewRole::SalesAdmin => &self.credentials.user_name,
        }
    }

    /// Mirror `text` into the lead transcript, then deliver it.
    pub async fn send(&self, text: &str) -> Result<Value> {
        if let Err(err) = self
            .facade
            .append_transcript(&self.lead_id, self.author(), text)
            .await
        {
            tracing::warn!(lead_id = %self.lead_id, error = %err, "transcript mirror failed");
        }
        self.sink.deliver(&self.credentials.channel_id, text).await
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            tracing::debug!(
                user_id = %self.credentials.user_id,
                channel_id = %self.credentials.channel_id,
                "chat session closed"
            );
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.release();
    }
}
