//! Studio service routes

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use common::models::GenerationRequest;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    middleware::require_credential,
    models::{
        BalanceResponse, CreateGenerationRequest, CredentialResponse, GenerationAccepted,
        ScriptRequest, ScriptResponse, TopUpRequest, TopUpResponse, VideoListResponse, VideoQuery,
    },
    state::AppState,
};

/// Create the router for the studio service
pub fn create_router(state: AppState) -> Router {
    let gated_routes = Router::new()
        .route("/generations", post(create_generation))
        .route("/scripts", post(draft_script))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_credential,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/credentials", get(credential_status))
        .route("/credentials/select", post(select_credential))
        .route("/credits", get(get_balance))
        .route("/credits/top-up", post(top_up))
        .route(
            "/generations/current",
            get(current_generation).delete(cancel_generation),
        )
        .route("/videos", get(list_videos))
        .merge(gated_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "studio-service"
    }))
}

pub async fn credential_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(CredentialResponse {
        usable: state.session.capability().is_usable().await,
    })
}

/// Ask for a credential and re-check it with the configured retry policy
pub async fn select_credential(State(state): State<AppState>) -> impl IntoResponse {
    let usable = state.session.capability().select_credential().await;
    info!(usable, "Credential selection finished");
    Json(CredentialResponse { usable })
}

pub async fn get_balance(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.session.ledger();
    Json(BalanceResponse {
        balance: ledger.balance().await,
        pending: ledger.pending().await,
    })
}

/// Simulated payment: every unit buys ten credits, zero is a no-op
pub async fn top_up(
    State(state): State<AppState>,
    Json(payload): Json<TopUpRequest>,
) -> ApiResult<impl IntoResponse> {
    let added = state.session.top_up(payload.amount).await?;

    Ok(Json(TopUpResponse {
        added,
        balance: state.session.balance().await,
    }))
}

pub async fn draft_script(
    State(state): State<AppState>,
    Json(payload): Json<ScriptRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.topic.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Please enter a topic or basic idea first.".to_string(),
        ));
    }

    let script = state
        .session
        .draft_script(&payload.topic)
        .await
        .ok_or(ApiError::NoScript)?;

    Ok(Json(ScriptResponse { script }))
}

/// Submit a generation job.
///
/// Submission is awaited so its failures reach the caller; polling then runs
/// in the background until the job settles.
pub async fn create_generation(
    State(state): State<AppState>,
    Json(payload): Json<CreateGenerationRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = GenerationRequest::try_from(payload)?;
    let pending = state.session.begin(request).await?;

    let accepted = GenerationAccepted {
        operation: pending.job().operation.clone(),
        cost: pending.cost(),
        balance: state.session.balance().await,
    };

    tokio::spawn(async move {
        match pending.complete().await {
            Ok(video) => info!(id = %video.id, "Generation finished"),
            Err(e) => warn!(
                refunded = e.refunds_reservation(),
                "Generation failed: {}", e
            ),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

pub async fn current_generation(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.status())
}

/// Stop waiting for the active generation; its credits are refunded
pub async fn cancel_generation(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    if !state.session.cancel_active() {
        return Err(ApiError::NotFound("No generation in progress".to_string()));
    }

    Ok(StatusCode::ACCEPTED)
}

/// Gallery listing with pagination, newest first
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<VideoQuery>,
) -> impl IntoResponse {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let (items, total) = state.session.gallery().page(page, limit).await;

    Json(VideoListResponse {
        items,
        page,
        limit,
        total,
    })
}
