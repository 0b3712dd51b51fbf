use std::env;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 7000;
pub const DEFAULT_STREAM_BASE_URL: &str = "https://chat.stream-io-api.com";
pub const DEFAULT_CRM_BASE_URL: &str = "https://api.getbase.com/v2";
pub const DEFAULT_CHANNEL_NAME: &str = "livechat";
pub const DEFAULT_SALES_ADMIN_ID: &str = "sales-admin";

/// How a conversation's channel key is derived from a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStrategy {
    /// Every participant lands in the same channel.
    Fixed(String),
    /// One channel per customer username.
    Username,
    /// One channel per CRM lead.
    Lead,
}

impl ChannelStrategy {
    pub fn parse(kind: &str, fixed_name: &str) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed(fixed_name.to_string())),
            "" | "username" => Ok(Self::Username),
            "lead" => Ok(Self::Lead),
            other => Err(Error::Config(format!(
                "unknown CHANNEL_STRATEGY `{other}` (expected fixed, username or lead)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    pub token_ttl_seconds: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub token: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub stream: StreamConfig,
    pub crm: CrmConfig,
    pub channel_strategy: ChannelStrategy,
    pub sales_admin_id: String,
}

fn required(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(Error::Config(format!("{key} must be set"))),
    }
}

fn optional(key: &str, fallback: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let token_ttl_seconds = match env::var("STREAM_TOKEN_TTL_SECONDS") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("STREAM_TOKEN_TTL_SECONDS is not a number: {raw}"))
            })?),
            _ => None,
        };

        let stream = StreamConfig {
            api_key: required("STREAM_API_KEY")?,
            api_secret: required("STREAM_API_SECRET")?,
            base_url: optional("STREAM_BASE_URL", DEFAULT_STREAM_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            token_ttl_seconds,
        };

        let crm = CrmConfig {
            token: required("ZENDESK_CRM_TOKEN")?,
            base_url: optional("CRM_BASE_URL", DEFAULT_CRM_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        };

        let channel_strategy = ChannelStrategy::parse(
            &optional("CHANNEL_STRATEGY", "username"),
            &optional("CHANNEL_NAME", DEFAULT_CHANNEL_NAME),
        )?;

        Ok(Self {
            port,
            stream,
            crm,
            channel_strategy,
            sales_admin_id: optional("SALES_ADMIN_ID", DEFAULT_SALES_ADMIN_ID),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_strategy_parses_known_kinds() {
        assert_eq!(
            ChannelStrategy::parse("fixed", "livechat").expect("fixed"),
            ChannelStrategy::Fixed("livechat".to_string())
        );
        assert_eq!(
            ChannelStrategy::parse(" Username ", "x").expect("username"),
            ChannelStrategy::Username
        );
        assert_eq!(
            ChannelStrategy::parse("lead", "x").expect("lead"),
            ChannelStrategy::Lead
        );
    }

    #[test]
    fn channel_strategy_rejects_unknown_kind() {
        let err = ChannelStrategy::parse("per-team", "x").expect_err("unknown");
        assert!(err.to_string().contains("per-team"));
    }
}
