//! Stream Chat REST API: the server-side directory calls used when issuing
//! credentials, and the user-side message send used by chat views.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Map, Value};

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::token;
use crate::types::ChatUser;

const SERVICE: &str = "stream";

pub const CHANNEL_TYPE: &str = "messaging";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub created_by_id: String,
}

/// Server-side operations against the hosted chat directory.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Create or update user records.
    async fn upsert_users(&self, users: &[ChatUser]) -> Result<()>;

    /// Create the channel if it does not exist yet and return its id.
    async fn get_or_create_channel(&self, channel: &ChannelSpec) -> Result<String>;

    /// Add users to a channel's member list. Existing members are left as is.
    async fn add_members(&self, channel_id: &str, user_ids: &[String]) -> Result<()>;

    /// Mint a session token scoped to `user_id`.
    fn create_token(&self, user_id: &str) -> Result<String>;

    fn api_key(&self) -> &str;
}

async fn check(endpoint: &str, response: Response) -> Result<Response> {
    let status = response.status();
    tracing::debug!(endpoint, status = status.as_u16(), "stream call");
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

#[derive(Debug, Clone)]
pub struct StreamChatClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    token_ttl_seconds: Option<i64>,
}

impl StreamChatClient {
    pub fn new(cfg: &StreamConfig) -> Self {
        Self::with_client(Client::new(), cfg)
    }

    pub fn with_client(http: Client, cfg: &StreamConfig) -> Self {
        Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            token_ttl_seconds: cfg.token_ttl_seconds,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn decorate(&self, rb: RequestBuilder) -> Result<RequestBuilder> {
        let server_token = token::server_token(&self.api_secret)?;
        Ok(rb
            .query(&[("api_key", self.api_key.as_str())])
            .header("Authorization", server_token)
            .header("stream-auth-type", "jwt"))
    }

    async fn post(&self, endpoint: &str, path: &str, body: &Value) -> Result<Response> {
        let response = self
            .decorate(self.http.post(self.url(path)))?
            .json(body)
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))?;
        check(endpoint, response).await
    }
}

#[async_trait]
impl ChatDirectory for StreamChatClient {
    async fn upsert_users(&self, users: &[ChatUser]) -> Result<()> {
        let users = users
            .iter()
            .map(|user| -> Result<(String, Value)> {
                Ok((user.id.clone(), serde_json::to_value(user)?))
            })
            .collect::<Result<Map<String, Value>>>()?;
        self.post("POST /users", "/users", &json!({ "users": users }))
            .await?;
        Ok(())
    }

    async fn get_or_create_channel(&self, channel: &ChannelSpec) -> Result<String> {
        let response = self
            .post(
                "POST /channels/{type}/{id}/query",
                &format!("/channels/{CHANNEL_TYPE}/{}/query", channel.id),
                &json!({
                    "data": {
                        "name": channel.name,
                        "created_by_id": channel.created_by_id,
                    },
                    "state": false,
                    "watch": false,
                    "presence": false,
                }),
            )
            .await?;
        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))?;
        Ok(payload
            .pointer("/channel/id")
            .and_then(Value::as_str)
            .unwrap_or(channel.id.as_str())
            .to_string())
    }

    async fn add_members(&self, channel_id: &str, user_ids: &[String]) -> Result<()> {
        self.post(
            "POST /channels/{type}/{id}",
            &format!("/channels/{CHANNEL_TYPE}/{channel_id}"),
            &json!({ "add_members": user_ids }),
        )
        .await?;
        Ok(())
    }

    fn create_token(&self, user_id: &str) -> Result<String> {
        token::user_token(&self.api_secret, user_id, self.token_ttl_seconds)
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// User-side connection to the chat service, authenticated with a session
/// token rather than the app secret.
#[derive(Debug, Clone)]
pub struct StreamUserClient {
    http: Client,
    base_url: String,
    api_key: String,
    user_token: String,
}

impl StreamUserClient {
    pub fn new(http: Client, base_url: &str, api_key: &str, user_token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            user_token: user_token.to_string(),
        }
    }

    pub async fn send_message(&self, channel_id: &str, text: &str) -> Result<Value> {
        let response = self
            .http
            .post(format!(
                "{}/channels/{CHANNEL_TYPE}/{channel_id}/message",
                self.base_url
            ))
            .query(&[("api_key", self.api_key.as_str())])
            .header("Authorization", &self.user_token)
            .header("stream-auth-type", "jwt")
            .json(&json!({ "message": { "text": text } }))
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))?;
        let response = check("POST /channels/{type}/{id}/message", response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))
    }
}
