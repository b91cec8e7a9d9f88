//! Entry handlers

use axum::{extract::State, Json};

use crate::dto::entries::JoinedEntryResponse;
use crate::{AppState, error::ApiError};

/// Lists every entry, newest first, with current account names
pub async fn list_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<JoinedEntryResponse>>, ApiError> {
    let entries = state.service.all_entries().await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
