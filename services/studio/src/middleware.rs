//! Credential middleware gating calls to the generative API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Reject the request unless a usable API credential is selected
pub async fn require_credential(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(e) = state.session.capability().ensure().await {
        warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
        return Err(e.into());
    }

    Ok(next.run(req).await)
}
