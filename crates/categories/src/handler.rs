use crate::budget_service::{BudgetError, BudgetService};
use crate::models::{Budget, BudgetRequest, Category, CategoryRequest, CategoryType};
use crate::service::{CategoryError, CategoryService};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use common::{AppState, auth::CurrentUser};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for CategoryError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            CategoryError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            CategoryError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            CategoryError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Default categories cannot be modified".to_string(),
            ),
            CategoryError::NotFound => (StatusCode::NOT_FOUND, "Category not found".to_string()),
            CategoryError::Infrastructure(e) => {
                tracing::error!("Category infrastructure error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl IntoResponse for BudgetError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            BudgetError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            BudgetError::NotFound => (StatusCode::NOT_FOUND, "Budget not found".to_string()),
            BudgetError::Infrastructure(e) => {
                tracing::error!("Budget infrastructure error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn categories_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/{id}", get(get_category).put(update_category).delete(delete_category))
        .with_state(state)
}

pub fn budgets_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_budgets).post(create_budget))
        .route("/{id}", get(get_budget).put(update_budget).delete(delete_budget))
        .with_state(state)
}

#[derive(Deserialize)]
struct CategoryQuery {
    #[serde(rename = "type")]
    category_type: Option<CategoryType>,
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<CategoryQuery>,
) -> Result<Json<Vec<Category>>, CategoryError> {
    let categories = CategoryService::list_categories(&state.db, user.id, params.category_type).await?;
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, CategoryError> {
    let category = CategoryService::create_category(&state.db, user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, CategoryError> {
    let category = CategoryService::get_category(&state.db, user.id, id).await?;
    Ok(Json(category))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryRequest>,
) -> Result<Json<Category>, CategoryError> {
    let category = CategoryService::update_category(&state.db, user.id, id, payload).await?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, CategoryError> {
    CategoryService::delete_category(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_budgets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Budget>>, BudgetError> {
    let budgets = BudgetService::list_budgets(&state.db, user.id).await?;
    Ok(Json(budgets))
}

async fn create_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<BudgetRequest>,
) -> Result<impl IntoResponse, BudgetError> {
    let budget = BudgetService::create_budget(&state.db, user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(budget)))
}

async fn get_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Budget>, BudgetError> {
    let budget = BudgetService::get_budget(&state.db, user.id, id).await?;
    Ok(Json(budget))
}

async fn update_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<BudgetRequest>,
) -> Result<Json<Budget>, BudgetError> {
    let budget = BudgetService::update_budget(&state.db, user.id, id, payload).await?;
    Ok(Json(budget))
}

async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, BudgetError> {
    BudgetService::delete_budget(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
