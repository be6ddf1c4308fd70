use crate::models::{Credentials, User};
use crate::repository::UserRepository;
use database::{Database, RepositoryError};
use tracing::instrument;
use validator::Validate;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Email is already registered")]
    Conflict,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Database error: {0}")]
    Infrastructure(String),
}

impl From<RepositoryError> for UserError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation(_) => UserError::Conflict,
            _ => UserError::Infrastructure(err.to_string()),
        }
    }
}

pub struct UserService;

impl UserService {
    #[instrument(skip(db, credentials), fields(email = %credentials.email))]
    pub async fn register(db: &Database, credentials: Credentials) -> Result<i64, UserError> {
        credentials
            .validate()
            .map_err(|e| UserError::InvalidInput(e.to_string()))?;

        let hash = bcrypt::hash(&credentials.password, HASH_COST)
            .map_err(|e| UserError::Infrastructure(e.to_string()))?;

        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        let id = repo.create(&credentials.normalized_email(), &hash).await?;

        uow.commit().await?;
        tracing::info!(user_id = id, "Registered user");

        Ok(id)
    }

    #[instrument(skip(db, credentials), fields(email = %credentials.email))]
    pub async fn authenticate(db: &Database, credentials: &Credentials) -> Result<User, UserError> {
        let mut uow = db.begin().await?;
        let mut repo = UserRepository::new(uow.connection());

        let user = repo
            .find_by_email(&credentials.normalized_email())
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        let matches = bcrypt::verify(&credentials.password, &user.password_hash)
            .map_err(|e| UserError::Infrastructure(e.to_string()))?;

        if !matches {
            tracing::warn!("Password mismatch");
            return Err(UserError::InvalidCredentials);
        }

        Ok(user)
    }
}
