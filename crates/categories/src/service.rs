use crate::models::{Category, CategoryRequest, CategoryType};
use crate::repository::CategoryRepository;
use database::{Database, RepositoryError};
use rand::seq::SliceRandom;
use tracing::instrument;

const PASTEL_COLORS: [&str; 20] = [
    "#FFB3BA", "#FFDFBA", "#FFFFBA", "#BAFFC9", "#BAE1FF",
    "#E2F0CB", "#FDFD96", "#FFC3A0", "#FFD1DC", "#D4F0F0",
    "#CCE2CB", "#B6CFB6", "#97C1A9", "#FCB7AF", "#FFDAC1",
    "#E7FFAC", "#FFABAB", "#D5AAFF", "#85E3FF", "#B9F6CA",
];

#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Category already exists: {0}")]
    Conflict(String),
    #[error("Default categories cannot be modified")]
    Forbidden,
    #[error("Category not found")]
    NotFound,
}

impl From<RepositoryError> for CategoryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => CategoryError::NotFound,
            RepositoryError::UniqueViolation(msg) => CategoryError::Conflict(msg),
            RepositoryError::CheckViolation(msg) => CategoryError::InvalidInput(msg),
            RepositoryError::Infrastructure(e) => CategoryError::Infrastructure(e.to_string()),
            _ => CategoryError::Infrastructure(err.to_string()),
        }
    }
}

pub struct CategoryService;

impl CategoryService {
    fn random_pastel_color() -> String {
        let mut rng = rand::thread_rng();
        PASTEL_COLORS.choose(&mut rng).unwrap_or(&"#FFFFFF").to_string()
    }

    #[instrument(skip(db))]
    pub async fn create_category(
        db: &Database,
        user_id: i64,
        req: CategoryRequest,
    ) -> Result<Category, CategoryError> {
        let req = CategoryRequest::new(req.name, req.icon, req.color, req.category_type)
            .map_err(CategoryError::InvalidInput)?;
        let color = req.color.clone().unwrap_or_else(Self::random_pastel_color);

        let mut uow = db.begin().await?;
        let mut repo = CategoryRepository::new(uow.connection());

        let id = repo.create(user_id, &req, &color).await?;
        let category = repo.find_visible(user_id, id).await?.ok_or(CategoryError::NotFound)?;

        uow.commit().await?;

        Ok(category)
    }

    #[instrument(skip(db))]
    pub async fn update_category(
        db: &Database,
        user_id: i64,
        id: i64,
        req: CategoryRequest,
    ) -> Result<Category, CategoryError> {
        let req = CategoryRequest::new(req.name, req.icon, req.color, req.category_type)
            .map_err(CategoryError::InvalidInput)?;

        let mut uow = db.begin().await?;
        let mut repo = CategoryRepository::new(uow.connection());

        Self::ensure_user_owned(&mut repo, user_id, id).await?;
        repo.update(user_id, id, &req).await?;
        let category = repo.find_visible(user_id, id).await?.ok_or(CategoryError::NotFound)?;

        uow.commit().await?;
        Ok(category)
    }

    #[instrument(skip(db))]
    pub async fn delete_category(db: &Database, user_id: i64, id: i64) -> Result<(), CategoryError> {
        let mut uow = db.begin().await?;
        let mut repo = CategoryRepository::new(uow.connection());

        Self::ensure_user_owned(&mut repo, user_id, id).await?;
        repo.deactivate(user_id, id).await?;

        uow.commit().await?;
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn list_categories(
        db: &Database,
        user_id: i64,
        category_type: Option<CategoryType>,
    ) -> Result<Vec<Category>, CategoryError> {
        let mut uow = db.begin().await?;
        let mut repo = CategoryRepository::new(uow.connection());

        let categories = repo.list_visible(user_id, category_type).await?;
        Ok(categories)
    }

    /// Resolves a category visible to the user, including deactivated ones.
    #[instrument(skip(db))]
    pub async fn get_category(db: &Database, user_id: i64, id: i64) -> Result<Category, CategoryError> {
        let mut uow = db.begin().await?;
        let mut repo = CategoryRepository::new(uow.connection());

        repo.find_visible(user_id, id).await?.ok_or(CategoryError::NotFound)
    }

    async fn ensure_user_owned(
        repo: &mut CategoryRepository<'_>,
        user_id: i64,
        id: i64,
    ) -> Result<(), CategoryError> {
        let existing = repo.find_visible(user_id, id).await?.ok_or(CategoryError::NotFound)?;
        if existing.is_default {
            tracing::warn!(category_id = id, "Attempt to modify a default category");
            return Err(CategoryError::Forbidden);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{get_test_db, insert_test_user};

    async fn setup() -> (Database, i64) {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = insert_test_user(uow.connection(), "a@example.com").await;
        uow.commit().await.unwrap();
        (db, user_id)
    }

    fn request(name: &str) -> CategoryRequest {
        CategoryRequest {
            name: name.into(),
            icon: None,
            color: None,
            category_type: CategoryType::Expense,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_pastel_color() {
        let (db, user_id) = setup().await;
        let cat = CategoryService::create_category(&db, user_id, request("Books")).await.unwrap();
        assert!(PASTEL_COLORS.contains(&cat.color.as_str()));
    }

    #[tokio::test]
    async fn test_defaults_are_forbidden() {
        let (db, user_id) = setup().await;
        let default = CategoryService::list_categories(&db, user_id, None)
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.is_default)
            .unwrap();

        let result = CategoryService::update_category(&db, user_id, default.id, request("Renamed")).await;
        assert!(matches!(result, Err(CategoryError::Forbidden)));

        let result = CategoryService::delete_category(&db, user_id, default.id).await;
        assert!(matches!(result, Err(CategoryError::Forbidden)));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name() {
        let (db, user_id) = setup().await;
        let result = CategoryService::create_category(&db, user_id, request("  ")).await;
        assert!(matches!(result, Err(CategoryError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete_own_category() {
        let (db, user_id) = setup().await;
        let cat = CategoryService::create_category(&db, user_id, request("Hobbies")).await.unwrap();

        CategoryService::delete_category(&db, user_id, cat.id).await.unwrap();

        let listed = CategoryService::list_categories(&db, user_id, None).await.unwrap();
        assert!(!listed.iter().any(|c| c.id == cat.id));
        // still resolvable for history
        assert!(!CategoryService::get_category(&db, user_id, cat.id).await.unwrap().is_active);
    }
}
