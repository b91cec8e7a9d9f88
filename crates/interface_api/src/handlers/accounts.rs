//! Account handlers

use axum::{extract::{Path, State}, http::StatusCode, Json};
use uuid::Uuid;

use crate::auth::DeleteAuthorized;
use crate::dto::accounts::*;
use crate::dto::entries::EntryResponse;
use crate::extract::ValidatedJson;
use crate::{AppState, error::ApiError};

/// Opens a new account with a zero balance
pub async fn create_account(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account = state.service.open_account(&request.name).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Lists active accounts
pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let accounts = state.service.list_active().await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// Gets an account by ID, deleted or not
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.service.get_account(id.into()).await?;
    Ok(Json(account.into()))
}

/// Renames an active account
pub async fn rename_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RenameAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.service.rename_account(id.into(), &request.name).await?;
    Ok(Json(account.into()))
}

/// Soft-deletes an account; requires the delete password
pub async fn delete_account(
    _authorized: DeleteAuthorized,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    let deleted = state.service.soft_delete(id.into()).await?;
    Ok(Json(DeleteAccountResponse { id, deleted }))
}

/// Deposits into an account
pub async fn credit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreditRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .service
        .credit(id.into(), request.amount, request.date, request.label)
        .await?;
    Ok(Json(account.into()))
}

/// Withdraws from an account
pub async fn debit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<DebitRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.service.debit(id.into(), request.amount, request.date).await?;
    Ok(Json(account.into()))
}

/// Lists one account's entries, newest first
pub async fn list_account_entries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    let entries = state.service.entries_for(id.into()).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
