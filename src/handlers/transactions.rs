use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::BusinessId;
use crate::domain::TransactionFilter;
use crate::error::AppError;
use crate::AppState;

pub async fn list_transactions(
    State(state): State<AppState>,
    BusinessId(business_id): BusinessId,
    Query(mut filter): Query<TransactionFilter>,
) -> Result<impl IntoResponse, AppError> {
    filter.business_id = business_id;
    let limit = filter.limit();
    let offset = filter.offset();
    let transactions = state.queries.list(filter).await?;

    Ok(Json(json!({
        "transactions": transactions,
        "limit": limit,
        "offset": offset,
    })))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    BusinessId(business_id): BusinessId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.queries.get(business_id, id).await?;
    Ok(Json(view))
}
