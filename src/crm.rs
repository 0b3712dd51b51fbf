//! CRM lead access (Zendesk Sell REST API).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::{json, Value};

use crate::config::CrmConfig;
use crate::error::{Error, Result};

const SERVICE: &str = "crm";

/// The slice of the CRM this service touches: a lead's free-text
/// description and the lead listing.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Current description of a lead; an absent description reads as `""`.
    async fn read_description(&self, lead_id: &str) -> Result<String>;

    /// Replace the description of a lead.
    async fn write_description(&self, lead_id: &str, description: &str) -> Result<()>;

    /// Lead records as the CRM returns them.
    async fn list_leads(&self) -> Result<Vec<Value>>;
}

#[derive(Debug, Clone)]
pub struct ZendeskSellClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ZendeskSellClient {
    pub fn new(cfg: &CrmConfig) -> Self {
        Self::with_client(Client::new(), cfg)
    }

    pub fn with_client(http: Client, cfg: &CrmConfig) -> Self {
        Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        }
    }

    /// `{base}/leads/{id}` with the id percent-encoded as one path segment.
    fn lead_url(&self, lead_id: &str) -> Result<Url> {
        if matches!(lead_id, "" | "." | "..") {
            return Err(Error::MalformedInput(format!(
                "lead id `{lead_id}` is not a path segment"
            )));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid CRM base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("CRM base url `{}` cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push("leads")
            .push(lead_id);
        Ok(url)
    }

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.bearer_auth(&self.token)
            .header("Accept", "application/json")
    }

    async fn send(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let response = self
            .decorate(rb)
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))?;

        let status = response.status();
        tracing::debug!(endpoint, status = status.as_u16(), "crm call");
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
}

#[async_trait]
impl LeadStore for ZendeskSellClient {
    async fn read_description(&self, lead_id: &str) -> Result<String> {
        let response = self
            .send("GET /leads/{id}", self.http.get(self.lead_url(lead_id)?))
            .await?;
        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))?;
        Ok(payload
            .pointer("/data/description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string())
    }

    async fn write_description(&self, lead_id: &str, description: &str) -> Result<()> {
        self.send(
            "PUT /leads/{id}",
            self.http
                .put(self.lead_url(lead_id)?)
                .json(&json!({ "data": { "description": description } })),
        )
        .await?;
        Ok(())
    }

    async fn list_leads(&self) -> Result<Vec<Value>> {
        let response = self
            .send("GET /leads", self.http.get(format!("{}/leads", self.base_url)))
            .await?;
        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| Error::upstream(SERVICE, e))?;
        let items = payload
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::upstream(SERVICE, "lead listing without `items`"))?;
        Ok(items
            .iter()
            .map(|item| item.get("data").cloned().unwrap_or_else(|| item.clone()))
            .collect())
    }
}
