use crate::models::{Account, AccountRequest};
use crate::repository::AccountRepository;
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Account not found")]
    NotFound,
    #[error("Account already exists: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => AccountError::NotFound,
            RepositoryError::UniqueViolation(msg) => AccountError::Conflict(msg),
            RepositoryError::CheckViolation(msg) => AccountError::InvalidInput(msg),
            RepositoryError::Infrastructure(e) => AccountError::Infrastructure(e.to_string()),
            _ => AccountError::Infrastructure(err.to_string()),
        }
    }
}

pub struct AccountService;

impl AccountService {
    #[instrument(skip(db))]
    pub async fn create_account(db: &Database, user_id: i64, req: AccountRequest) -> Result<Account, AccountError> {
        let req = AccountRequest::new(req.name, req.kind, req.balance).map_err(AccountError::InvalidInput)?;

        let mut uow = db.begin().await?;
        let mut repo = AccountRepository::new(uow.connection());

        let id = repo.create(user_id, &req).await?;
        let account = repo.find_by_id(user_id, id).await?.ok_or(AccountError::NotFound)?;

        uow.commit().await?;

        Ok(account)
    }

    #[instrument(skip(db))]
    pub async fn list_accounts(db: &Database, user_id: i64) -> Result<Vec<Account>, AccountError> {
        let mut uow = db.begin().await?;
        let mut repo = AccountRepository::new(uow.connection());

        let accounts = repo.list_active(user_id).await?;
        Ok(accounts)
    }

    /// Looks up an account the user owns. Deactivated accounts are still returned
    /// so that history referencing them keeps resolving.
    #[instrument(skip(db))]
    pub async fn get_account(db: &Database, user_id: i64, id: i64) -> Result<Account, AccountError> {
        let mut uow = db.begin().await?;
        let mut repo = AccountRepository::new(uow.connection());

        repo.find_by_id(user_id, id).await?.ok_or(AccountError::NotFound)
    }

    #[instrument(skip(db))]
    pub async fn update_account(
        db: &Database,
        user_id: i64,
        id: i64,
        req: AccountRequest,
    ) -> Result<Account, AccountError> {
        let req = AccountRequest::new(req.name, req.kind, req.balance).map_err(AccountError::InvalidInput)?;

        let mut uow = db.begin().await?;
        let mut repo = AccountRepository::new(uow.connection());

        repo.update(user_id, id, &req).await?;
        let account = repo.find_by_id(user_id, id).await?.ok_or(AccountError::NotFound)?;

        uow.commit().await?;
        Ok(account)
    }

    #[instrument(skip(db))]
    pub async fn delete_account(db: &Database, user_id: i64, id: i64) -> Result<(), AccountError> {
        let mut uow = db.begin().await?;
        let mut repo = AccountRepository::new(uow.connection());

        repo.deactivate(user_id, id).await?;

        uow.commit().await?;
        Ok(())
    }

    /// Sum of active account balances in cents.
    #[instrument(skip(db))]
    pub async fn total_balance(db: &Database, user_id: i64) -> Result<i64, AccountError> {
        let mut uow = db.begin().await?;
        let mut repo = AccountRepository::new(uow.connection());

        let total = repo.total_balance(user_id).await?;
        Ok(total)
    }
}
