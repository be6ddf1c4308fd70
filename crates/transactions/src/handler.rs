use crate::models::{DateRange, Transaction, TransactionDraft, TransactionFilter};
use crate::reports::{BudgetProgress, CategoryBreakdown, Dashboard, MonthHistory, MonthlyTrends, ReportService};
use crate::service::{TransactionError, TransactionService};
use crate::stats::TransactionStats;
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use common::{AppState, auth::CurrentUser};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for TransactionError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            TransactionError::Validation(errors) => {
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": errors }))).into_response();
            }
            TransactionError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            TransactionError::NotFound => (StatusCode::NOT_FOUND, "Transaction not found".to_string()),
            TransactionError::Infrastructure(e) => {
                tracing::error!("Transaction infrastructure error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn transactions_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route(
            "/{id}",
            get(get_transaction).put(update_transaction).delete(delete_transaction),
        )
        .with_state(state)
}

pub fn reports_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/stats", get(stats))
        .route("/budgets", get(budget_progress))
        .route("/budgets/history", get(budget_history))
        .route("/categories", get(category_breakdown))
        .route("/trends", get(monthly_trends))
        .with_state(state)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Either bound may be omitted; it then falls back to the current month's edge.
#[derive(Deserialize)]
struct PeriodQuery {
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

impl PeriodQuery {
    fn resolve(&self, today: NaiveDate) -> Result<DateRange, TransactionError> {
        let month = DateRange::month_containing(today);
        DateRange::new(self.date_from.unwrap_or(month.start), self.date_to.unwrap_or(month.end))
            .map_err(TransactionError::InvalidInput)
    }
}

#[derive(Deserialize)]
struct MonthsQuery {
    months: Option<u32>,
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, TransactionError> {
    let transactions = TransactionService::list_transactions(&state.db, user.id, filter).await?;
    Ok(Json(transactions))
}

async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(draft): Json<TransactionDraft>,
) -> Result<impl IntoResponse, TransactionError> {
    let transaction = TransactionService::create_transaction(&state.db, user.id, draft).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, TransactionError> {
    let transaction = TransactionService::get_transaction(&state.db, user.id, id).await?;
    Ok(Json(transaction))
}

async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(draft): Json<TransactionDraft>,
) -> Result<Json<Transaction>, TransactionError> {
    let transaction = TransactionService::update_transaction(&state.db, user.id, id, draft).await?;
    Ok(Json(transaction))
}

async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, TransactionError> {
    TransactionService::delete_transaction(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Dashboard>, TransactionError> {
    let dashboard = ReportService::dashboard(&state.db, user.id, today()).await?;
    Ok(Json(dashboard))
}

async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<TransactionStats>, TransactionError> {
    let period = params.resolve(today())?;
    let stats = ReportService::transaction_stats(&state.db, user.id, period).await?;
    Ok(Json(stats))
}

async fn budget_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<BudgetProgress>>, TransactionError> {
    let progress = ReportService::budget_progress(&state.db, user.id).await?;
    Ok(Json(progress))
}

async fn budget_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<MonthsQuery>,
) -> Result<Json<Vec<MonthHistory>>, TransactionError> {
    let months = params.months.unwrap_or(3);
    let history = ReportService::budget_history(&state.db, user.id, months, today()).await?;
    Ok(Json(history))
}

async fn category_breakdown(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<Vec<CategoryBreakdown>>, TransactionError> {
    let period = params.resolve(today())?;
    let breakdown = ReportService::category_breakdown(&state.db, user.id, period).await?;
    Ok(Json(breakdown))
}

async fn monthly_trends(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<MonthsQuery>,
) -> Result<Json<MonthlyTrends>, TransactionError> {
    let months = params.months.unwrap_or(6);
    let trends = ReportService::monthly_trends(&state.db, user.id, months, today()).await?;
    Ok(Json(trends))
}
