use crate::models::{Account, AccountRequest};
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct AccountRecord {
    id: i64,
    user_id: i64,
    name: String,
    account_type: String,
    balance: i64,
    is_active: bool,
}

impl TryFrom<AccountRecord> for Account {
    type Error = RepositoryError;

    fn try_from(record: AccountRecord) -> Result<Self, Self::Error> {
        Ok(Account {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            kind: record
                .account_type
                .parse()
                .map_err(RepositoryError::InvalidRecord)?,
            balance: record.balance,
            is_active: record.is_active,
        })
    }
}

const SELECT_ACCOUNT: &str =
    "SELECT id, user_id, name, account_type, balance, is_active FROM accounts";

pub(crate) struct AccountRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> AccountRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, user_id: i64, req: &AccountRequest) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO accounts (user_id, name, account_type, balance) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(user_id)
        .bind(&req.name)
        .bind(req.kind.as_str())
        .bind(req.balance)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn list_active(&mut self, user_id: i64) -> Result<Vec<Account>, RepositoryError> {
        let records = sqlx::query_as::<_, AccountRecord>(&format!(
            "{SELECT_ACCOUNT} WHERE user_id = $1 AND is_active = 1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Account::try_from).collect()
    }

    pub async fn find_by_id(&mut self, user_id: i64, id: i64) -> Result<Option<Account>, RepositoryError> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "{SELECT_ACCOUNT} WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Account::try_from).transpose()
    }

    pub async fn update(&mut self, user_id: i64, id: i64, req: &AccountRequest) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE accounts SET name = $1, account_type = $2, balance = $3, updated_at = CURRENT_TIMESTAMP \
             WHERE id = $4 AND user_id = $5 AND is_active = 1",
        )
        .bind(&req.name)
        .bind(req.kind.as_str())
        .bind(req.balance)
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
            "UPDATE accounts SET is_active = 0, updated_at = CURRENT_TIMESTAMP \
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

    pub async fn total_balance(&mut self, user_id: i64) -> Result<i64, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(balance), 0) FROM accounts WHERE user_id = $1 AND is_active = 1",
        )
        .bind(user_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(total)
    }
}
