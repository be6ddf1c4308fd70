use crate::models::{Account, AccountRequest};
use crate::service::{AccountError, AccountService};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use common::{AppState, auth::CurrentUser};
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AccountError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AccountError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AccountError::NotFound => (StatusCode::NOT_FOUND, "Account not found".to_string()),
            AccountError::Infrastructure(e) => {
                tracing::error!("Account infrastructure error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn accounts_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/balance", get(total_balance))
        .route("/{id}", get(get_account).put(update_account).delete(delete_account))
        .with_state(state)
}

async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Account>>, AccountError> {
    let accounts = AccountService::list_accounts(&state.db, user.id).await?;
    Ok(Json(accounts))
}

async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<AccountRequest>,
) -> Result<impl IntoResponse, AccountError> {
    let account = AccountService::create_account(&state.db, user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AccountError> {
    let account = AccountService::get_account(&state.db, user.id, id).await?;
    Ok(Json(account))
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<AccountRequest>,
) -> Result<Json<Account>, AccountError> {
    let account = AccountService::update_account(&state.db, user.id, id, payload).await?;
    Ok(Json(account))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AccountError> {
    AccountService::delete_account(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn total_balance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AccountError> {
    let total = AccountService::total_balance(&state.db, user.id).await?;
    Ok(Json(json!({ "balance": total })))
}
