use crate::validation::{self, DraftErrors};
use chrono::{Datelike, Months, NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(format!("unknown transaction type '{other}'")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            other => Err(format!("unknown transaction status '{other}'")),
        }
    }
}

/// Which account and category references a transaction carries depends on its type.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credits `account_id`.
    Income { category_id: i64, account_id: i64 },
    /// Debits `account_id`.
    Expense { category_id: i64, account_id: i64 },
    Transfer { from_account_id: i64, to_account_id: i64 },
}

impl TransactionKind {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            TransactionKind::Income { .. } => TransactionType::Income,
            TransactionKind::Expense { .. } => TransactionType::Expense,
            TransactionKind::Transfer { .. } => TransactionType::Transfer,
        }
    }

    pub fn category_id(&self) -> Option<i64> {
        match *self {
            TransactionKind::Income { category_id, .. } | TransactionKind::Expense { category_id, .. } => {
                Some(category_id)
            }
            TransactionKind::Transfer { .. } => None,
        }
    }

    /// The account stored in the primary account column.
    pub fn account_id(&self) -> i64 {
        match *self {
            TransactionKind::Income { account_id, .. } | TransactionKind::Expense { account_id, .. } => account_id,
            TransactionKind::Transfer { from_account_id, .. } => from_account_id,
        }
    }

    pub fn to_account_id(&self) -> Option<i64> {
        match *self {
            TransactionKind::Transfer { to_account_id, .. } => Some(to_account_id),
            _ => None,
        }
    }

    pub fn account_ids(&self) -> Vec<i64> {
        let mut ids = vec![self.account_id()];
        ids.extend(self.to_account_id());
        ids
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub kind: TransactionKind,
    /// Cents, always positive; direction comes from `kind`.
    pub amount: i64,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: TransactionStatus,
    pub created_at: String,
    pub updated_at: String,
}

fn amount_from_text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Text(String),
        Number(f64),
    }

    Ok(match Option::<RawAmount>::deserialize(deserializer)? {
        Some(RawAmount::Text(s)) => s,
        Some(RawAmount::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

/// Unsaved transaction form state, exactly as the user entered it.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct TransactionDraft {
    #[serde(rename = "type", default)]
    pub transaction_type: TransactionType,
    #[serde(default, deserialize_with = "amount_from_text_or_number")]
    pub amount: String,
    pub category: Option<i64>,
    pub from_account: Option<i64>,
    pub to_account: Option<i64>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: TransactionStatus,
}

/// A validated draft, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTransactionRequest {
    kind: TransactionKind,
    amount: i64,
    description: Option<String>,
    notes: Option<String>,
    date: NaiveDate,
    time: NaiveTime,
    status: TransactionStatus,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl CreateTransactionRequest {
    pub fn from_draft(draft: &TransactionDraft) -> Result<Self, DraftErrors> {
        let errors = validation::validate(draft);
        if !errors.is_empty() {
            return Err(errors);
        }
        Self::build(draft).ok_or(errors)
    }

    fn build(draft: &TransactionDraft) -> Option<Self> {
        let kind = match draft.transaction_type {
            TransactionType::Income => TransactionKind::Income {
                category_id: draft.category?,
                account_id: draft.to_account?,
            },
            TransactionType::Expense => TransactionKind::Expense {
                category_id: draft.category?,
                account_id: draft.from_account?,
            },
            TransactionType::Transfer => TransactionKind::Transfer {
                from_account_id: draft.from_account?,
                to_account_id: draft.to_account?,
            },
        };

        Some(Self {
            kind,
            amount: validation::parse_amount(&draft.amount)?,
            description: non_blank(&draft.description),
            notes: non_blank(&draft.notes),
            date: validation::parse_date(&draft.date)?,
            time: validation::parse_time(&draft.time)?,
            status: draft.status,
        })
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }
}

/// Inclusive on both ends.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err("date_from must not be after date_to".to_string());
        }
        Ok(Self { start, end })
    }

    pub fn month_containing(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(date);
        Self { start, end }
    }

    pub fn previous_month(&self) -> Self {
        Self::month_containing(self.start.pred_opt().unwrap_or(self.start))
    }

    /// The `count` calendar months ending with the month containing `today`, oldest first.
    pub fn trailing_months(today: NaiveDate, count: u32) -> Vec<Self> {
        let mut months = Vec::with_capacity(count as usize);
        let mut current = Self::month_containing(today);
        for _ in 0..count {
            months.push(current);
            current = current.previous_month();
        }
        months.reverse();
        months
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// `YYYY-MM` of the start date.
    pub fn month_label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

/// Transaction listing filter. Every field narrows the result.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct TransactionFilter {
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub category_id: Option<i64>,
    pub status: Option<TransactionStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub amount_min: Option<i64>,
    pub amount_max: Option<i64>,
    /// Case-insensitive match on description or notes.
    pub search: Option<String>,
    pub limit: Option<i64>,
}

/// Query for the aggregation inputs. Only completed transactions are ever returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerQuery {
    pub period: DateRange,
    pub transaction_type: Option<TransactionType>,
    pub category_id: Option<i64>,
}

impl LedgerQuery {
    pub fn period(period: DateRange) -> Self {
        Self {
            period,
            transaction_type: None,
            category_id: None,
        }
    }

    pub fn category_expenses(category_id: i64, period: DateRange) -> Self {
        Self {
            period,
            transaction_type: Some(TransactionType::Expense),
            category_id: Some(category_id),
        }
    }
}

/// The minimal row shape the aggregation functions reduce.
/// `kind` is `None` for types this build does not know; `amount` is `None` when missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerEntry {
    pub kind: Option<TransactionType>,
    pub category_id: Option<i64>,
    pub amount: Option<i64>,
}

impl From<&Transaction> for LedgerEntry {
    fn from(t: &Transaction) -> Self {
        LedgerEntry {
            kind: Some(t.kind.transaction_type()),
            category_id: t.kind.category_id(),
            amount: Some(t.amount),
        }
    }
}
