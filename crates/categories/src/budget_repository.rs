use crate::models::{Budget, BudgetRequest};
use chrono::NaiveDate;
use database::{self, RepositoryError};
use sqlx::FromRow;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(FromRow)]
struct BudgetRecord {
    id: i64,
    user_id: i64,
    category_id: i64,
    name: Option<String>,
    allocated: i64,
    alert_threshold: i64,
    start_date: String,
    end_date: String,
    is_active: bool,
}

fn parse_date(value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| RepositoryError::InvalidRecord(format!("bad budget date '{value}': {e}")))
}

impl TryFrom<BudgetRecord> for Budget {
    type Error = RepositoryError;

    fn try_from(record: BudgetRecord) -> Result<Self, Self::Error> {
        Ok(Budget {
            id: record.id,
            user_id: record.user_id,
            category_id: record.category_id,
            name: record.name,
            allocated: record.allocated,
            alert_threshold: u8::try_from(record.alert_threshold)
                .map_err(|e| RepositoryError::InvalidRecord(e.to_string()))?,
            start_date: parse_date(&record.start_date)?,
            end_date: parse_date(&record.end_date)?,
            is_active: record.is_active,
        })
    }
}

const SELECT_BUDGET: &str = "SELECT id, user_id, category_id, name, allocated, alert_threshold, \
     start_date, end_date, is_active FROM budgets";

pub(crate) struct BudgetRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> BudgetRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, user_id: i64, req: &BudgetRequest) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO budgets (user_id, category_id, name, allocated, alert_threshold, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(req.category_id)
        .bind(req.name.as_deref())
        .bind(req.allocated)
        .bind(i64::from(req.alert_threshold))
        .bind(req.start_date.format(DATE_FORMAT).to_string())
        .bind(req.end_date.format(DATE_FORMAT).to_string())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn list_active(&mut self, user_id: i64) -> Result<Vec<Budget>, RepositoryError> {
        let records = sqlx::query_as::<_, BudgetRecord>(&format!(
            "{SELECT_BUDGET} WHERE user_id = $1 AND is_active = 1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Budget::try_from).collect()
    }

    pub async fn find_by_id(&mut self, user_id: i64, id: i64) -> Result<Option<Budget>, RepositoryError> {
        let record = sqlx::query_as::<_, BudgetRecord>(&format!(
            "{SELECT_BUDGET} WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Budget::try_from).transpose()
    }

    pub async fn update(&mut self, user_id: i64, id: i64, req: &BudgetRequest) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE budgets SET
                category_id = $1, name = $2, allocated = $3, alert_threshold = $4,
                start_date = $5, end_date = $6, updated_at = CURRENT_TIMESTAMP
            WHERE id = $7 AND user_id = $8 AND is_active = 1
            "#,
        )
        .bind(req.category_id)
        .bind(req.name.as_deref())
        .bind(req.allocated)
        .bind(i64::from(req.alert_threshold))
        .bind(req.start_date.format(DATE_FORMAT).to_string())
        .bind(req.end_date.format(DATE_FORMAT).to_string())
        .bind(id)
        .bind(user_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn deactivate(&mut self, user_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE budgets SET is_active = 0, updated_at = CURRENT_TIMESTAMP \
             WHERE id = $1 AND user_id = $2 AND is_active = 1",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{get_test_db, insert_test_user};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn food_category(conn: &mut database::Connection) -> i64 {
        sqlx::query_scalar("SELECT id FROM categories WHERE name = 'Food & Dining' AND is_default = 1")
            .fetch_one(&mut *conn)
            .await
            .unwrap()
    }

    fn january(category_id: i64, allocated: i64) -> BudgetRequest {
        BudgetRequest::new(category_id, None, allocated, 80, date(2025, 1, 1), date(2025, 1, 31)).unwrap()
    }

    #[tokio::test]
    async fn test_create_budget() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        let cat_id = food_category(uow.connection()).await;
        let mut repo = BudgetRepository::new(uow.connection());

        let id = repo.create(user_id, &january(cat_id, 80000)).await.unwrap();
        let budget = repo.find_by_id(user_id, id).await.unwrap().unwrap();

        assert_eq!(budget.category_id, cat_id);
        assert_eq!(budget.allocated, 80000);
        assert_eq!(budget.alert_threshold, 80);
        assert_eq!(budget.start_date, date(2025, 1, 1));
        assert_eq!(budget.end_date, date(2025, 1, 31));
        assert!(budget.is_active);
    }

    #[tokio::test]
    async fn test_update_replaces_whole_record() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        let cat_id = food_category(uow.connection()).await;
        let mut repo = BudgetRepository::new(uow.connection());

        let id = repo.create(user_id, &january(cat_id, 80000)).await.unwrap();
        let update =
            BudgetRequest::new(cat_id, Some("Groceries".into()), 90000, 95, date(2025, 2, 1), date(2025, 2, 28))
                .unwrap();
        repo.update(user_id, id, &update).await.unwrap();

        let budget = repo.find_by_id(user_id, id).await.unwrap().unwrap();
        assert_eq!(budget.name.as_deref(), Some("Groceries"));
        assert_eq!(budget.allocated, 90000);
        assert_eq!(budget.alert_threshold, 95);
        assert_eq!(budget.start_date, date(2025, 2, 1));
    }

    #[tokio::test]
    async fn test_deactivate_budget() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        let cat_id = food_category(uow.connection()).await;
        let mut repo = BudgetRepository::new(uow.connection());

        let keep = repo.create(user_id, &january(cat_id, 100)).await.unwrap();
        let gone = repo.create(user_id, &january(cat_id, 200)).await.unwrap();
        repo.deactivate(user_id, gone).await.unwrap();

        let active = repo.list_active(user_id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep);
    }

    #[tokio::test]
    async fn test_budgets_are_scoped_to_owner() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let owner = insert_test_user(uow.connection(), "owner@example.com").await;
        let other = insert_test_user(uow.connection(), "other@example.com").await;
        let cat_id = food_category(uow.connection()).await;
        let mut repo = BudgetRepository::new(uow.connection());

        let id = repo.create(owner, &january(cat_id, 100)).await.unwrap();
        assert!(repo.find_by_id(other, id).await.unwrap().is_none());
        assert!(matches!(repo.deactivate(other, id).await, Err(RepositoryError::NotFound)));
    }
}
