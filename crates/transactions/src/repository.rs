use crate::models::{
    CreateTransactionRequest, DATE_FORMAT, LedgerEntry, LedgerQuery, TIME_FORMAT, Transaction, TransactionFilter,
    TransactionKind, TransactionType,
};
use chrono::{NaiveDate, NaiveTime};
use database::{self, RepositoryError};
use sqlx::{FromRow, QueryBuilder};

#[derive(FromRow)]
struct TransactionRecord {
    id: i64,
    user_id: i64,
    transaction_type: String,
    amount: i64,
    category_id: Option<i64>,
    account_id: i64,
    to_account_id: Option<i64>,
    description: Option<String>,
    notes: Option<String>,
    transaction_date: String,
    transaction_time: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = RepositoryError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        let missing = |column: &str| RepositoryError::InvalidRecord(format!("transaction {} has no {column}", record.id));

        let kind = match record
            .transaction_type
            .parse::<TransactionType>()
            .map_err(RepositoryError::InvalidRecord)?
        {
            TransactionType::Income => TransactionKind::Income {
                category_id: record.category_id.ok_or_else(|| missing("category_id"))?,
                account_id: record.account_id,
            },
            TransactionType::Expense => TransactionKind::Expense {
                category_id: record.category_id.ok_or_else(|| missing("category_id"))?,
                account_id: record.account_id,
            },
            TransactionType::Transfer => TransactionKind::Transfer {
                from_account_id: record.account_id,
                to_account_id: record.to_account_id.ok_or_else(|| missing("to_account_id"))?,
            },
        };

        Ok(Transaction {
            id: record.id,
            user_id: record.user_id,
            kind,
            amount: record.amount,
            date: NaiveDate::parse_from_str(&record.transaction_date, DATE_FORMAT)
                .map_err(|e| RepositoryError::InvalidRecord(e.to_string()))?,
            time: NaiveTime::parse_from_str(&record.transaction_time, TIME_FORMAT)
                .map_err(|e| RepositoryError::InvalidRecord(e.to_string()))?,
            status: record.status.parse().map_err(RepositoryError::InvalidRecord)?,
            description: record.description,
            notes: record.notes,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(FromRow)]
struct LedgerRecord {
    transaction_type: String,
    category_id: Option<i64>,
    amount: Option<i64>,
}

impl From<LedgerRecord> for LedgerEntry {
    fn from(record: LedgerRecord) -> Self {
        LedgerEntry {
            kind: record.transaction_type.parse().ok(),
            category_id: record.category_id,
            amount: record.amount,
        }
    }
}

const SELECT_TRANSACTION: &str = "SELECT id, user_id, transaction_type, amount, category_id, account_id, \
     to_account_id, description, notes, transaction_date, transaction_time, status, created_at, updated_at \
     FROM transactions";

/// Makes `%`, `_` and `\` match literally in a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) struct TransactionRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> TransactionRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, user_id: i64, req: &CreateTransactionRequest) -> Result<i64, RepositoryError> {
        let kind = req.kind();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO transactions (user_id, transaction_type, amount, category_id, account_id, to_account_id, \
             description, notes, transaction_date, transaction_time, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
        )
        .bind(user_id)
        .bind(kind.transaction_type().as_str())
        .bind(req.amount())
        .bind(kind.category_id())
        .bind(kind.account_id())
        .bind(kind.to_account_id())
        .bind(req.description())
        .bind(req.notes())
        .bind(req.date().format(DATE_FORMAT).to_string())
        .bind(req.time().format(TIME_FORMAT).to_string())
        .bind(req.status().as_str())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn update(
        &mut self,
        user_id: i64,
        id: i64,
        req: &CreateTransactionRequest,
    ) -> Result<(), RepositoryError> {
        let kind = req.kind();
        let result = sqlx::query(
            "UPDATE transactions SET transaction_type = $1, amount = $2, category_id = $3, account_id = $4, \
             to_account_id = $5, description = $6, notes = $7, transaction_date = $8, transaction_time = $9, \
             status = $10, updated_at = CURRENT_TIMESTAMP WHERE id = $11 AND user_id = $12",
        )
        .bind(kind.transaction_type().as_str())
        .bind(req.amount())
        .bind(kind.category_id())
        .bind(kind.account_id())
        .bind(kind.to_account_id())
        .bind(req.description())
        .bind(req.notes())
        .bind(req.date().format(DATE_FORMAT).to_string())
        .bind(req.time().format(TIME_FORMAT).to_string())
        .bind(req.status().as_str())
        .bind(id)
        .bind(user_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn find_by_id(&mut self, user_id: i64, id: i64) -> Result<Option<Transaction>, RepositoryError> {
        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            "{SELECT_TRANSACTION} WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Transaction::try_from).transpose()
    }

    /// Newest first. Every filter field that is set narrows the result.
    pub async fn list(&mut self, user_id: i64, filter: &TransactionFilter) -> Result<Vec<Transaction>, RepositoryError> {
        let mut qb = QueryBuilder::<database::Driver>::new(SELECT_TRANSACTION);
        qb.push(" WHERE user_id = ").push_bind(user_id);

        if let Some(transaction_type) = filter.transaction_type {
            qb.push(" AND transaction_type = ").push_bind(transaction_type.as_str());
        }
        if let Some(category_id) = filter.category_id {
            qb.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND transaction_date >= ").push_bind(from.format(DATE_FORMAT).to_string());
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND transaction_date <= ").push_bind(to.format(DATE_FORMAT).to_string());
        }
        if let Some(min) = filter.amount_min {
            qb.push(" AND amount >= ").push_bind(min);
        }
        if let Some(max) = filter.amount_max {
            qb.push(" AND amount <= ").push_bind(max);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            qb.push(" AND (LOWER(COALESCE(description, '')) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR LOWER(COALESCE(notes, '')) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        qb.push(" ORDER BY transaction_date DESC, transaction_time DESC, id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit.max(0));
        }

        let records = qb
            .build_query_as::<TransactionRecord>()
            .fetch_all(&mut *self.conn)
            .await?;

        records.into_iter().map(Transaction::try_from).collect()
    }

    /// Completed rows in the query's period, reduced to what the aggregations need.
    pub async fn ledger_entries(
        &mut self,
        user_id: i64,
        query: &LedgerQuery,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let mut qb = QueryBuilder::<database::Driver>::new(
            "SELECT transaction_type, category_id, amount FROM transactions WHERE status = 'completed' AND user_id = ",
        );
        qb.push_bind(user_id);
        qb.push(" AND transaction_date >= ")
            .push_bind(query.period.start.format(DATE_FORMAT).to_string());
        qb.push(" AND transaction_date <= ")
            .push_bind(query.period.end.format(DATE_FORMAT).to_string());

        if let Some(transaction_type) = query.transaction_type {
            qb.push(" AND transaction_type = ").push_bind(transaction_type.as_str());
        }
        if let Some(category_id) = query.category_id {
            qb.push(" AND category_id = ").push_bind(category_id);
        }

        let records = qb.build_query_as::<LedgerRecord>().fetch_all(&mut *self.conn).await?;
        Ok(records.into_iter().map(LedgerEntry::from).collect())
    }

    pub async fn delete(&mut self, user_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
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
