//! Axum-based HTTP host surface
//!
//! Exposes loaded accounts, their latest snapshots and entity states, and
//! forwards entity actions and refresh requests.

use crate::coordinator::UpdateStatus;
use crate::entities::{EntityAction, EntityState};
use crate::error::ChargeSyncError;
use crate::setup::{AccountContext, AccountManager};
use axum::body::Bytes;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<AccountManager>,
}

/// Optional JSON body of an entity action
#[derive(Debug, Default, Deserialize)]
pub struct ActionBody {
    pub option: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AccountSummary {
    entry_id: String,
    title: String,
    poll_interval: u64,
    chargers: Vec<String>,
    status: UpdateStatus,
}

/// Crate error rendered as an HTTP response
pub struct ApiFailure(pub ChargeSyncError);

impl From<ChargeSyncError> for ApiFailure {
    fn from(err: ChargeSyncError) -> Self {
        ApiFailure(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChargeSyncError::Validation { .. } => StatusCode::BAD_REQUEST,
            ChargeSyncError::NotFound { .. } => StatusCode::NOT_FOUND,
            ChargeSyncError::Auth { .. } => StatusCode::UNAUTHORIZED,
            ChargeSyncError::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        (status, Json(serde_json::json!({"error": self.0.to_string()}))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiFailure>;

async fn account(state: &AppState, entry_id: &str) -> ApiResult<Arc<AccountContext>> {
    state
        .manager
        .account(entry_id)
        .await
        .ok_or_else(|| ChargeSyncError::not_found(format!("Account {}", entry_id)).into())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn list_accounts(State(state): State<AppState>) -> impl IntoResponse {
    let summaries: Vec<AccountSummary> = state
        .manager
        .accounts()
        .await
        .iter()
        .map(|ctx| {
            let coordinator = ctx.coordinator();
            AccountSummary {
                entry_id: ctx.entry_id().to_string(),
                title: ctx.title().to_string(),
                poll_interval: coordinator.poll_interval().seconds(),
                chargers: coordinator
                    .latest()
                    .map(|s| s.charger_ids().map(|id| id.to_string()).collect())
                    .unwrap_or_default(),
                status: coordinator.status(),
            }
        })
        .collect();
    Json(summaries)
}

async fn get_snapshot(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> ApiResult<Response> {
    let ctx = account(&state, &entry_id).await?;
    let snapshot = ctx
        .coordinator()
        .latest()
        .ok_or_else(|| ChargeSyncError::not_ready("No snapshot published yet"))?;
    Ok(Json(snapshot.as_ref()).into_response())
}

async fn list_entities(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> ApiResult<Json<Vec<EntityState>>> {
    let ctx = account(&state, &entry_id).await?;
    Ok(Json(ctx.entities().iter().map(|e| e.state()).collect()))
}

async fn refresh(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> ApiResult<Json<UpdateStatus>> {
    let ctx = account(&state, &entry_id).await?;
    ctx.coordinator().refresh().await?;
    Ok(Json(ctx.coordinator().status()))
}

fn parse_action(action: &str, body: &Bytes) -> Result<EntityAction, ChargeSyncError> {
    let body: ActionBody = if body.is_empty() {
        ActionBody::default()
    } else {
        serde_json::from_slice(body)
            .map_err(|e| ChargeSyncError::validation("body".to_string(), e.to_string()))?
    };
    match action {
        "turn_on" => Ok(EntityAction::TurnOn),
        "turn_off" => Ok(EntityAction::TurnOff),
        "press" => Ok(EntityAction::Press),
        "select" => body
            .option
            .map(EntityAction::SelectOption)
            .ok_or_else(|| ChargeSyncError::validation("option", "Missing option")),
        "set_value" => body
            .value
            .map(EntityAction::SetValue)
            .ok_or_else(|| ChargeSyncError::validation("value", "Missing value")),
        other => Err(ChargeSyncError::validation(
            "action".to_string(),
            format!("Unknown action {}", other),
        )),
    }
}

async fn entity_action(
    State(state): State<AppState>,
    Path((entry_id, unique_id, action)): Path<(String, String, String)>,
    body: Bytes,
) -> ApiResult<Json<EntityState>> {
    let ctx = account(&state, &entry_id).await?;
    let action = parse_action(&action, &body)?;
    let entity = ctx
        .entity(&unique_id, Some(&action))
        .ok_or_else(|| {
            ChargeSyncError::not_found(format!("Entity {} accepting {}", unique_id, action))
        })?;
    entity.perform(action).await?;
    Ok(Json(entity.state()))
}

async fn events(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> ApiResult<Response> {
    let ctx = account(&state, &entry_id).await?;
    let coordinator = Arc::clone(ctx.coordinator());
    let stream = coordinator.updates().filter_map(move |snapshot| {
        let snapshot = snapshot?;
        let payload = serde_json::json!({
            "generation": snapshot.generation,
            "fetched_at": snapshot.fetched_at,
            "status": coordinator.status(),
        });
        Some(Ok::<Event, std::convert::Infallible>(
            Event::default().event("snapshot").data(payload.to_string()),
        ))
    });
    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/accounts", get(list_accounts))
        .route("/api/accounts/{entry_id}/snapshot", get(get_snapshot))
        .route("/api/accounts/{entry_id}/entities", get(list_entities))
        .route("/api/accounts/{entry_id}/events", get(events))
        .route("/api/accounts/{entry_id}/refresh", post(refresh))
        .route(
            "/api/accounts/{entry_id}/entities/{unique_id}/{action}",
            post(entity_action),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(manager: Arc<AccountManager>, host: &str, port: u16) -> anyhow::Result<()> {
    let router = router(AppState { manager });
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .unwrap_or_else(|_| ([127, 0, 0, 1], port).into());
    tracing::info!("HTTP server listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;
    Ok(())
}
