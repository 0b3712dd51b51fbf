use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::credentials::{CredentialIssuer, JoinRequest};
use crate::crm::{LeadStore, ZendeskSellClient};
use crate::error::{ApiError, Error, Result};
use crate::stream::{ChatDirectory, StreamChatClient};
use crate::transcript;
use crate::types::{ChatCredentials, JoinBody, LeadDescQuery, TranscriptBody};

pub struct AppState {
    pub leads: Arc<dyn LeadStore>,
    pub issuer: CredentialIssuer,
}

impl AppState {
    pub fn new(leads: Arc<dyn LeadStore>, issuer: CredentialIssuer) -> Self {
        Self { leads, issuer }
    }

    pub fn from_config(config: &Config) -> Self {
        let directory: Arc<dyn ChatDirectory> = Arc::new(StreamChatClient::new(&config.stream));
        let leads: Arc<dyn LeadStore> = Arc::new(ZendeskSellClient::new(&config.crm));
        Self::new(
            leads,
            CredentialIssuer::new(
                directory,
                config.channel_strategy.clone(),
                config.sales_admin_id.clone(),
            ),
        )
    }
}

fn parsed<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| Error::MalformedInput(rejection.body_text()))
}

async fn join(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<JoinBody>, JsonRejection>,
) -> std::result::Result<Json<ChatCredentials>, ApiError> {
    let body = parsed(body)?;
    let request = JoinRequest {
        username: body.username.unwrap_or_default(),
        lead_id: body.lead_id,
        is_sales_admin: body.is_sales_admin.unwrap_or(false),
    };
    let credentials = state.issuer.issue(&request).await?;
    Ok(Json(credentials))
}

async fn append_transcript(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<TranscriptBody>, JsonRejection>,
) -> std::result::Result<Json<Value>, ApiError> {
    let entry = parsed(body)?.into_entry().ok_or_else(|| {
        Error::MalformedInput("leadId, author and message.text are required".to_string())
    })?;
    transcript::append(state.leads.as_ref(), &entry).await?;
    Ok(Json(json!({})))
}

async fn get_leads(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<Vec<Value>>, ApiError> {
    Ok(Json(state.leads.list_leads().await?))
}

async fn get_lead_desc(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<LeadDescQuery>, QueryRejection>,
) -> std::result::Result<Json<String>, ApiError> {
    let Query(query) = query.map_err(|rejection| Error::MalformedInput(rejection.body_text()))?;
    let lead_id = query
        .lead_id
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::MalformedInput("leadId is required".to_string()))?;
    let description = transcript::lead_description(state.leads.as_ref(), lead_id.trim()).await?;
    Ok(Json(description))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true, "now": Utc::now().to_rfc3339() }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/join", post(join))
        .route("/stream-chat-credentials", post(join))
        .route("/transcript", put(append_transcript))
        .route("/updateDesc", put(append_transcript))
        .route("/getleads", get(get_leads))
        .route("/getLeadDesc", get(get_lead_desc))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    let port = config.port;
    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("lead chat server running at http://localhost:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}
