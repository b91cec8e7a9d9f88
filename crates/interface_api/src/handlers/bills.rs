//! Bill handlers

use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use uuid::Uuid;

use crate::dto::bills::*;
use crate::extract::{IdempotencyHeader, ValidatedJson};
use crate::{AppState, error::ApiError};

/// Settles a bill
///
/// Responds 201 for a fresh settlement and 200 when the idempotency key
/// replays an earlier one.
pub async fn settle_bill(
    State(state): State<AppState>,
    IdempotencyHeader(key): IdempotencyHeader,
    ValidatedJson(request): ValidatedJson<SettleBillRequest>,
) -> Result<(StatusCode, Json<SettlementResponse>), ApiError> {
    let settlement = request.into_settlement(key)?;
    let receipt = state.service.settle_bill(settlement).await?;

    let status = if receipt.replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(receipt.into())))
}

/// Shows what a surcharge would do to a set of shares
pub async fn tax_preview(
    ValidatedJson(request): ValidatedJson<TaxPreviewRequest>,
) -> Result<Json<TaxPreviewResponse>, ApiError> {
    Ok(Json(request.preview()?))
}

/// Reconstructs a bill from its shop label and date
pub async fn find_bill(
    State(state): State<AppState>,
    Query(query): Query<BillQuery>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill = state.service.reconstruct_bill(&query.shop, query.date).await?;
    Ok(Json(bill.into()))
}

/// Reconstructs a bill from its settlement id
pub async fn get_settlement(
    State(state): State<AppState>,
    Path(settlement_id): Path<Uuid>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill = state.service.reconstruct_settlement(settlement_id.into()).await?;
    Ok(Json(bill.into()))
}

/// Reports accounts whose stored balance drifted from their entries
pub async fn reconcile(
    State(state): State<AppState>,
) -> Result<Json<Vec<DiscrepancyResponse>>, ApiError> {
    let discrepancies = state.service.reconcile().await?;
    Ok(Json(discrepancies.into_iter().map(Into::into).collect()))
}
