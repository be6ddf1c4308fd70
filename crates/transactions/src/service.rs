use crate::models::{
    CreateTransactionRequest, Transaction, TransactionDraft, TransactionFilter, TransactionKind, TransactionType,
};
use crate::repository::TransactionRepository;
use crate::validation::DraftErrors;
use accounts::service::{AccountError, AccountService};
use categories::budget_service::BudgetError;
use categories::models::CategoryType;
use categories::service::{CategoryError, CategoryService};
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction form has invalid fields")]
    Validation(DraftErrors),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Transaction not found")]
    NotFound,
}

impl From<RepositoryError> for TransactionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => TransactionError::NotFound,
            RepositoryError::CheckViolation(msg) => TransactionError::InvalidInput(msg),
            RepositoryError::Infrastructure(e) => TransactionError::Infrastructure(e.to_string()),
            _ => TransactionError::Infrastructure(err.to_string()),
        }
    }
}

impl From<AccountError> for TransactionError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound => TransactionError::InvalidInput("Invalid account ID".into()),
            AccountError::Infrastructure(e) => TransactionError::Infrastructure(e),
            other => TransactionError::InvalidInput(other.to_string()),
        }
    }
}

impl From<CategoryError> for TransactionError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::NotFound => TransactionError::InvalidInput("Invalid category ID".into()),
            CategoryError::Infrastructure(e) => TransactionError::Infrastructure(e),
            other => TransactionError::InvalidInput(other.to_string()),
        }
    }
}

impl From<BudgetError> for TransactionError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::Infrastructure(e) => TransactionError::Infrastructure(e),
            BudgetError::NotFound => TransactionError::NotFound,
            BudgetError::InvalidInput(msg) => TransactionError::InvalidInput(msg),
        }
    }
}

pub struct TransactionService;

impl TransactionService {
    fn prepare(draft: &TransactionDraft) -> Result<CreateTransactionRequest, TransactionError> {
        CreateTransactionRequest::from_draft(draft).map_err(|errors| {
            tracing::info!(fields = ?errors.fields().collect::<Vec<_>>(), "Rejected transaction draft");
            TransactionError::Validation(errors)
        })
    }

    /// Accounts must be the user's and still active; the category must be visible,
    /// active, and of the matching type.
    async fn check_references(db: &Database, user_id: i64, kind: TransactionKind) -> Result<(), TransactionError> {
        for account_id in kind.account_ids() {
            let account = AccountService::get_account(db, user_id, account_id).await?;
            if !account.is_active {
                return Err(TransactionError::InvalidInput(format!(
                    "Account '{}' is no longer active",
                    account.name
                )));
            }
        }

        if let Some(category_id) = kind.category_id() {
            let category = CategoryService::get_category(db, user_id, category_id).await?;
            if !category.is_active {
                return Err(TransactionError::InvalidInput(format!(
                    "Category '{}' is no longer active",
                    category.name
                )));
            }

            let expected = match kind.transaction_type() {
                TransactionType::Income => CategoryType::Income,
                _ => CategoryType::Expense,
            };
            if category.category_type != expected {
                return Err(TransactionError::InvalidInput(format!(
                    "Category '{}' cannot be used for {} transactions",
                    category.name,
                    kind.transaction_type()
                )));
            }
        }

        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn create_transaction(
        db: &Database,
        user_id: i64,
        draft: TransactionDraft,
    ) -> Result<Transaction, TransactionError> {
        let req = Self::prepare(&draft)?;
        Self::check_references(db, user_id, req.kind()).await?;

        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        let id = repo.create(user_id, &req).await?;
        let transaction = repo.find_by_id(user_id, id).await?.ok_or(TransactionError::NotFound)?;

        uow.commit().await?;
        Ok(transaction)
    }

    #[instrument(skip(db))]
    pub async fn update_transaction(
        db: &Database,
        user_id: i64,
        id: i64,
        draft: TransactionDraft,
    ) -> Result<Transaction, TransactionError> {
        let req = Self::prepare(&draft)?;
        Self::check_references(db, user_id, req.kind()).await?;

        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        repo.update(user_id, id, &req).await?;
        let transaction = repo.find_by_id(user_id, id).await?.ok_or(TransactionError::NotFound)?;

        uow.commit().await?;
        Ok(transaction)
    }

    #[instrument(skip(db))]
    pub async fn get_transaction(db: &Database, user_id: i64, id: i64) -> Result<Transaction, TransactionError> {
        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        repo.find_by_id(user_id, id).await?.ok_or(TransactionError::NotFound)
    }

    #[instrument(skip(db))]
    pub async fn list_transactions(
        db: &Database,
        user_id: i64,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, TransactionError> {
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
            if from > to {
                return Err(TransactionError::InvalidInput(
                    "date_from must not be after date_to".into(),
                ));
            }
        }

        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        let transactions = repo.list(user_id, &filter).await?;
        Ok(transactions)
    }

    #[instrument(skip(db))]
    pub async fn delete_transaction(db: &Database, user_id: i64, id: i64) -> Result<(), TransactionError> {
        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        repo.delete(user_id, id).await?;

        uow.commit().await?;
        Ok(())
    }
}
