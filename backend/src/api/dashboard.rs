use axum::extract::State;
use axum::Json;

use super::{ApiError, AppState};
use crate::identity::Identity;

#[tracing::instrument(skip(state))]
pub async fn stats(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<common::DashboardStats>, ApiError> {
    Ok(Json(state.gateway.dashboard(identity.owner()).await?))
}
