use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        CreateTransactionRequest, DeletedResponse, TransactionResponse, TransactionStats,
        UpdateTransactionRequest,
    },
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::{ApiJson, AppError},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list).post(create))
        .route("/transactions/stats", get(stats))
        .route("/transactions/:id", put(update).delete(remove))
}

/// Ids that are not UUIDs can't name a stored transaction.
fn transaction_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Transaction"))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let items = services::list(state.store.as_ref(), user.id).await?;
    Ok(Json(items.into_iter().map(TransactionResponse::from).collect()))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let tx = services::create(state.store.as_ref(), user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(tx.into())))
}

#[instrument(skip_all, fields(user_id = %user.id, transaction_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateTransactionRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    let id = transaction_id(&id)?;
    let tx = services::update(state.store.as_ref(), user.id, id, payload).await?;
    Ok(Json(tx.into()))
}

#[instrument(skip_all, fields(user_id = %user.id, transaction_id = %id))]
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = transaction_id(&id)?;
    services::delete(state.store.as_ref(), user.id, id).await?;
    Ok(Json(DeletedResponse {
        message: "Transaction deleted successfully",
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<TransactionStats>, AppError> {
    Ok(Json(services::stats(state.store.as_ref(), user.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_not_found() {
        assert!(matches!(
            transaction_id("not-a-uuid"),
            Err(AppError::NotFound("Transaction"))
        ));
        let id = Uuid::new_v4();
        assert_eq!(transaction_id(&id.to_string()).unwrap(), id);
    }
}
