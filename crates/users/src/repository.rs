use crate::models::User;
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password_hash: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            email: record.email,
            password_hash: record.password_hash,
        }
    }
}

pub(crate) struct UserRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> UserRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, email: &str, password_hash: &str) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record.map(|r| r.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = UserRepository::new(uow.connection());

        let id = repo.create("sam@example.com", "hash").await.unwrap();
        let user = repo.find_by_email("sam@example.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.password_hash, "hash");

        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = UserRepository::new(uow.connection());

        repo.create("sam@example.com", "hash").await.unwrap();
        let result = repo.create("sam@example.com", "other").await;
        assert!(matches!(result, Err(RepositoryError::UniqueViolation(_))));
    }
}
