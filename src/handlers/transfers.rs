use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::BusinessId;
use crate::domain::{ReviewDecision, TransferRequest};
use crate::error::AppError;
use crate::AppState;

pub async fn submit_transfer(
    State(state): State<AppState>,
    BusinessId(business_id): BusinessId,
    Json(mut request): Json<TransferRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.business_id = business_id;
    let transfer = state.transfers.submit(request).await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

pub async fn get_transfer(
    State(state): State<AppState>,
    BusinessId(business_id): BusinessId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state.transfers.get(business_id, id).await?;
    Ok(Json(transfer))
}

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    pub decision: ReviewDecision,
}

pub async fn review_transfer(
    State(state): State<AppState>,
    BusinessId(business_id): BusinessId,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewPayload>,
) -> Result<impl IntoResponse, AppError> {
    let transfer = state
        .transfers
        .close_review(business_id, id, payload.decision)
        .await?;
    Ok(Json(transfer))
}
