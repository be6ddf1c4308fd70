use crate::models::{Category, CategoryRequest, CategoryType};
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct CategoryRecord {
    id: i64,
    user_id: Option<i64>,
    name: String,
    icon: String,
    color: String,
    category_type: String,
    is_default: bool,
    is_active: bool,
}

impl TryFrom<CategoryRecord> for Category {
    type Error = RepositoryError;

    fn try_from(record: CategoryRecord) -> Result<Self, Self::Error> {
        Ok(Category {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            icon: record.icon,
            color: record.color,
            category_type: record
                .category_type
                .parse()
                .map_err(RepositoryError::InvalidRecord)?,
            is_default: record.is_default,
            is_active: record.is_active,
        })
    }
}

const SELECT_CATEGORY: &str =
    "SELECT id, user_id, name, icon, color, category_type, is_default, is_active FROM categories";

pub(crate) struct CategoryRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    /// `req.color` must already be resolved.
    pub async fn create(&mut self, user_id: i64, req: &CategoryRequest, color: &str) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO categories (user_id, name, icon, color, category_type) \
             VALUES ($1, $2, COALESCE($3, 'DollarSign'), $4, $5) RETURNING id",
        )
        .bind(user_id)
        .bind(&req.name)
        .bind(req.icon.as_deref())
        .bind(color)
        .bind(req.category_type.as_str())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Active categories the user can see: their own plus the system defaults.
    pub async fn list_visible(
        &mut self,
        user_id: i64,
        category_type: Option<CategoryType>,
    ) -> Result<Vec<Category>, RepositoryError> {
        let records = sqlx::query_as::<_, CategoryRecord>(&format!(
            "{SELECT_CATEGORY} WHERE (user_id = $1 OR is_default = 1) AND is_active = 1 \
             AND ($2 IS NULL OR category_type = $2) ORDER BY name"
        ))
        .bind(user_id)
        .bind(category_type.map(|t| t.as_str()))
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Category::try_from).collect()
    }

    pub async fn find_visible(&mut self, user_id: i64, id: i64) -> Result<Option<Category>, RepositoryError> {
        let record = sqlx::query_as::<_, CategoryRecord>(&format!(
            "{SELECT_CATEGORY} WHERE id = $1 AND (user_id = $2 OR is_default = 1)"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Category::try_from).transpose()
    }

    /// Only the user's own, non-default rows are touched.
    pub async fn update(
        &mut self,
        user_id: i64,
        id: i64,
        req: &CategoryRequest,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE categories SET name = $1, icon = COALESCE($2, icon), color = COALESCE($3, color), \
             category_type = $4, updated_at = CURRENT_TIMESTAMP \
             WHERE id = $5 AND user_id = $6 AND is_default = 0 AND is_active = 1",
        )
        .bind(&req.name)
        .bind(req.icon.as_deref())
        .bind(req.color.as_deref())
        .bind(req.category_type.as_str())
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
            "UPDATE categories SET is_active = 0, updated_at = CURRENT_TIMESTAMP \
             WHERE id = $1 AND user_id = $2 AND is_default = 0 AND is_active = 1",
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

    fn request(name: &str, category_type: CategoryType) -> CategoryRequest {
        CategoryRequest::new(name.to_string(), None, None, category_type).unwrap()
    }

    #[tokio::test]
    async fn test_create_category() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        let mut repo = CategoryRepository::new(uow.connection());

        let id = repo.create(user_id, &request("Pets", CategoryType::Expense), "#ff0000").await.unwrap();
        assert!(id > 0);

        let cat = repo.find_visible(user_id, id).await.unwrap().unwrap();
        assert_eq!(cat.name, "Pets");
        assert_eq!(cat.color, "#ff0000");
        assert_eq!(cat.icon, "DollarSign");
        assert_eq!(cat.user_id, Some(user_id));
        assert_eq!(cat.category_type, CategoryType::Expense);
        assert!(!cat.is_default);
        assert!(cat.is_active);
    }

    #[tokio::test]
    async fn test_defaults_are_visible_to_everyone() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        let mut repo = CategoryRepository::new(uow.connection());

        let all = repo.list_visible(user_id, None).await.unwrap();
        assert!(all.iter().any(|c| c.name == "Salary" && c.is_default));
        assert!(all.iter().any(|c| c.name == "Food & Dining" && c.is_default));

        let income = repo.list_visible(user_id, Some(CategoryType::Income)).await.unwrap();
        assert!(!income.is_empty());
        assert!(income.iter().all(|c| c.category_type == CategoryType::Income));
    }

    #[tokio::test]
    async fn test_other_users_categories_are_hidden() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let owner = insert_test_user(uow.connection(), "owner@example.com").await;
        let other = insert_test_user(uow.connection(), "other@example.com").await;
        let mut repo = CategoryRepository::new(uow.connection());

        let id = repo.create(owner, &request("Private", CategoryType::Expense), "#000").await.unwrap();

        assert!(repo.find_visible(other, id).await.unwrap().is_none());
        assert!(!repo.list_visible(other, None).await.unwrap().iter().any(|c| c.id == id));
    }

    #[tokio::test]
    async fn test_update_category() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        let mut repo = CategoryRepository::new(uow.connection());

        let id = repo.create(user_id, &request("Original", CategoryType::Expense), "#000000").await.unwrap();

        let update = CategoryRequest::new("Updated".into(), Some("Star".into()), None, CategoryType::Income).unwrap();
        repo.update(user_id, id, &update).await.unwrap();

        let cat = repo.find_visible(user_id, id).await.unwrap().unwrap();
        assert_eq!(cat.name, "Updated");
        assert_eq!(cat.icon, "Star");
        // colour kept when not supplied
        assert_eq!(cat.color, "#000000");
        assert_eq!(cat.category_type, CategoryType::Income);
    }

    #[tokio::test]
    async fn test_defaults_cannot_be_changed() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        let mut repo = CategoryRepository::new(uow.connection());

        let default = repo
            .list_visible(user_id, None)
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.is_default)
            .unwrap();

        let result = repo.update(user_id, default.id, &request("Mine now", CategoryType::Expense)).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
        let result = repo.deactivate(user_id, default.id).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_deactivate_category() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        let mut repo = CategoryRepository::new(uow.connection());

        let id = repo.create(user_id, &request("Delete Me", CategoryType::Expense), "#fff").await.unwrap();
        repo.deactivate(user_id, id).await.unwrap();

        assert!(!repo.list_visible(user_id, None).await.unwrap().iter().any(|c| c.id == id));
        let stored = repo.find_visible(user_id, id).await.unwrap().unwrap();
        assert!(!stored.is_active);
    }
}
