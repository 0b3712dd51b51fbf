//! Chat session credential issuance.

use std::sync::Arc;

use regex::Regex;

use crate::config::ChannelStrategy;
use crate::error::{Error, Result};
use crate::stream::{ChannelSpec, ChatDirectory};
use crate::types::{ChatCredentials, ChatUser};

pub const CHANNEL_DISPLAY_NAME: &str = "Sales Chat";
pub const SALES_ADMIN_NAME: &str = "Sales Admin";

#[derive(Debug, Clone, Default)]
pub struct JoinRequest {
    pub username: String,
    pub lead_id: Option<String>,
    pub is_sales_admin: bool,
}

fn validate_username(value: &str) -> Result<String> {
    let username = value.trim();
    if username.is_empty() {
        return Err(Error::MalformedInput("username is required".to_string()));
    }
    let valid = Regex::new(r"^[A-Za-z0-9@_\-]{1,64}$")
        .map(|re| re.is_match(username))
        .unwrap_or(false);
    if !valid {
        return Err(Error::MalformedInput(format!(
            "username `{username}` may only contain letters, digits, @, _ and -"
        )));
    }
    Ok(username.to_string())
}

/// Longest channel id the chat service accepts.
const MAX_CHANNEL_ID_LEN: usize = 64;

/// Encode `value` into the channel id alphabet `[A-Za-z0-9_-]` without
/// losing information. Letters, digits and `-` pass through, `_` becomes
/// `__` and every other byte becomes `_` plus two hex digits, so distinct
/// inputs always give distinct ids.
fn channel_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' => encoded.push(char::from(byte)),
            b'_' => encoded.push_str("__"),
            other => encoded.push_str(&format!("_{other:02x}")),
        }
    }
    encoded
}

pub fn channel_key(strategy: &ChannelStrategy, request: &JoinRequest) -> Result<String> {
    let key = match strategy {
        ChannelStrategy::Fixed(name) => channel_component(name.trim()),
        ChannelStrategy::Username => channel_component(&request.username),
        ChannelStrategy::Lead => {
            let lead_id = request
                .lead_id
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    Error::MalformedInput("leadId is required for lead channels".to_string())
                })?;
            format!("lead-{}", channel_component(lead_id))
        }
    };
    if key.is_empty() {
        return Err(Error::MalformedInput("channel key is empty".to_string()));
    }
    if key.len() > MAX_CHANNEL_ID_LEN {
        return Err(Error::MalformedInput(format!(
            "channel key `{key}` is longer than {MAX_CHANNEL_ID_LEN} characters"
        )));
    }
    Ok(key)
}

pub struct CredentialIssuer {
    directory: Arc<dyn ChatDirectory>,
    strategy: ChannelStrategy,
    sales_admin_id: String,
}

impl CredentialIssuer {
    pub fn new(
        directory: Arc<dyn ChatDirectory>,
        strategy: ChannelStrategy,
        sales_admin_id: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            strategy,
            sales_admin_id: sales_admin_id.into(),
        }
    }

    fn sales_admin(&self) -> ChatUser {
        ChatUser {
            id: self.sales_admin_id.clone(),
            name: SALES_ADMIN_NAME.to_string(),
            role: "admin".to_string(),
        }
    }

    /// Register the participant, make sure their channel exists with them in
    /// it, and mint their token. Nothing is rolled back if a later step fails.
    pub async fn issue(&self, request: &JoinRequest) -> Result<ChatCredentials> {
        let username = validate_username(&request.username)?;
        let request = JoinRequest {
            username: username.clone(),
            ..request.clone()
        };
        let key = channel_key(&self.strategy, &request)?;

        let admin = self.sales_admin();
        let participant = if request.is_sales_admin {
            admin.clone()
        } else {
            ChatUser {
                id: username.clone(),
                name: username,
                role: "user".to_string(),
            }
        };

        let mut users = vec![participant.clone()];
        if participant.id != admin.id {
            users.push(admin.clone());
        }
        self.directory.upsert_users(&users).await?;

        let channel_id = self
            .directory
            .get_or_create_channel(&ChannelSpec {
                id: key,
                name: CHANNEL_DISPLAY_NAME.to_string(),
                created_by_id: admin.id,
            })
            .await?;
        self.directory
            .add_members(&channel_id, &[participant.id.clone()])
            .await?;

        let token = self.directory.create_token(&participant.id)?;
        tracing::info!(
            user_id = %participant.id,
            channel_id = %channel_id,
            sales_admin = request.is_sales_admin,
            "chat credentials issued"
        );

        Ok(ChatCredentials {
            user_id: participant.id,
            user_name: participant.name,
            channel_id,
            token,
            api_key: self.directory.api_key().to_string(),
        })
    }
}
