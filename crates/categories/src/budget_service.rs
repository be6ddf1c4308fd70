use crate::budget_repository::BudgetRepository;
use crate::models::{Budget, BudgetRequest, CategoryType};
use crate::repository::CategoryRepository;
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Budget not found")]
    NotFound,
}

impl From<RepositoryError> for BudgetError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => BudgetError::NotFound,
            RepositoryError::CheckViolation(msg) => BudgetError::InvalidInput(msg),
            RepositoryError::Infrastructure(e) => BudgetError::Infrastructure(e.to_string()),
            _ => BudgetError::Infrastructure(err.to_string()),
        }
    }
}

pub struct BudgetService;

impl BudgetService {
    fn normalize(req: BudgetRequest) -> Result<BudgetRequest, BudgetError> {
        BudgetRequest::new(
            req.category_id,
            req.name,
            req.allocated,
            req.alert_threshold,
            req.start_date,
            req.end_date,
        )
        .map_err(BudgetError::InvalidInput)
    }

    async fn ensure_expense_category(
        conn: &mut database::Connection,
        user_id: i64,
        category_id: i64,
    ) -> Result<(), BudgetError> {
        let mut repo = CategoryRepository::new(conn);
        let category = repo
            .find_visible(user_id, category_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| BudgetError::InvalidInput("Invalid category ID".into()))?;

        if category.category_type != CategoryType::Expense {
            return Err(BudgetError::InvalidInput(
                "Budgets can only track expense categories".into(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn create_budget(db: &Database, user_id: i64, req: BudgetRequest) -> Result<Budget, BudgetError> {
        let req = Self::normalize(req)?;

        let mut uow = db.begin().await?;
        Self::ensure_expense_category(uow.connection(), user_id, req.category_id).await?;

        let mut repo = BudgetRepository::new(uow.connection());
        let id = repo.create(user_id, &req).await?;
        let budget = repo.find_by_id(user_id, id).await?.ok_or(BudgetError::NotFound)?;

        uow.commit().await?;
        Ok(budget)
    }

    #[instrument(skip(db))]
    pub async fn update_budget(
        db: &Database,
        user_id: i64,
        id: i64,
        req: BudgetRequest,
    ) -> Result<Budget, BudgetError> {
        let req = Self::normalize(req)?;

        let mut uow = db.begin().await?;
        Self::ensure_expense_category(uow.connection(), user_id, req.category_id).await?;

        let mut repo = BudgetRepository::new(uow.connection());
        repo.update(user_id, id, &req).await?;
        let budget = repo.find_by_id(user_id, id).await?.ok_or(BudgetError::NotFound)?;

        uow.commit().await?;
        Ok(budget)
    }

    #[instrument(skip(db))]
    pub async fn delete_budget(db: &Database, user_id: i64, id: i64) -> Result<(), BudgetError> {
        let mut uow = db.begin().await?;
        let mut repo = BudgetRepository::new(uow.connection());

        repo.deactivate(user_id, id).await?;

        uow.commit().await?;
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn list_budgets(db: &Database, user_id: i64) -> Result<Vec<Budget>, BudgetError> {
        let mut uow = db.begin().await?;
        let mut repo = BudgetRepository::new(uow.connection());

        let budgets = repo.list_active(user_id).await?;
        Ok(budgets)
    }

    #[instrument(skip(db))]
    pub async fn get_budget(db: &Database, user_id: i64, id: i64) -> Result<Budget, BudgetError> {
        let mut uow = db.begin().await?;
        let mut repo = BudgetRepository::new(uow.connection());

        repo.find_by_id(user_id, id).await?.ok_or(BudgetError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryRequest;
    use crate::service::CategoryService;
    use chrono::NaiveDate;
    use database::{get_test_db, insert_test_user};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup() -> (Database, i64) {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        uow.commit().await.unwrap();
        (db, user_id)
    }

    async fn category_id(db: &Database, user_id: i64, name: &str) -> i64 {
        CategoryService::list_categories(db, user_id, None)
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.name == name)
            .unwrap()
            .id
    }

    fn request(category_id: i64, allocated: i64) -> BudgetRequest {
        BudgetRequest {
            category_id,
            name: None,
            allocated,
            alert_threshold: 80,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 1, 31),
        }
    }

    #[tokio::test]
    async fn test_create_budget_for_expense_category() {
        let (db, user_id) = setup().await;
        let food = category_id(&db, user_id, "Food & Dining").await;

        let budget = BudgetService::create_budget(&db, user_id, request(food, 80000)).await.unwrap();
        assert_eq!(budget.allocated, 80000);
        assert_eq!(BudgetService::list_budgets(&db, user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_income_category_rejected() {
        let (db, user_id) = setup().await;
        let salary = category_id(&db, user_id, "Salary").await;

        let result = BudgetService::create_budget(&db, user_id, request(salary, 1000)).await;
        assert!(matches!(result, Err(BudgetError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unknown_or_inactive_category_rejected() {
        let (db, user_id) = setup().await;
        let result = BudgetService::create_budget(&db, user_id, request(99999, 1000)).await;
        assert!(matches!(result, Err(BudgetError::InvalidInput(_))));

        let pets = CategoryService::create_category(
            &db,
            user_id,
            CategoryRequest {
                name: "Pets".into(),
                icon: None,
                color: None,
                category_type: CategoryType::Expense,
            },
        )
        .await
        .unwrap();
        CategoryService::delete_category(&db, user_id, pets.id).await.unwrap();

        let result = BudgetService::create_budget(&db, user_id, request(pets.id, 1000)).await;
        assert!(matches!(result, Err(BudgetError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete_budget() {
        let (db, user_id) = setup().await;
        let food = category_id(&db, user_id, "Food & Dining").await;
        let budget = BudgetService::create_budget(&db, user_id, request(food, 80000)).await.unwrap();

        let mut update = request(food, 85000);
        update.alert_threshold = 90;
        let updated = BudgetService::update_budget(&db, user_id, budget.id, update).await.unwrap();
        assert_eq!(updated.allocated, 85000);
        assert_eq!(updated.alert_threshold, 90);

        BudgetService::delete_budget(&db, user_id, budget.id).await.unwrap();
        assert!(BudgetService::list_budgets(&db, user_id).await.unwrap().is_empty());
        let again = BudgetService::delete_budget(&db, user_id, budget.id).await;
        assert!(matches!(again, Err(BudgetError::NotFound)));
    }
}
