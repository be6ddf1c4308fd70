//! Field-level checks for the add/edit transaction form.
//!
//! Every rule is evaluated independently so the form can show all problems at once.

use crate::models::{DATE_FORMAT, TIME_FORMAT, TransactionDraft, TransactionType};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    Amount,
    Category,
    FromAccount,
    ToAccount,
    Date,
    Time,
}

#[derive(Debug, Serialize, Default, PartialEq, Eq, Clone)]
#[serde(transparent)]
pub struct DraftErrors(BTreeMap<DraftField, &'static str>);

impl DraftErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: DraftField) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn contains(&self, field: DraftField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = DraftField> + '_ {
        self.0.keys().copied()
    }

    fn insert(&mut self, field: DraftField, message: &'static str) {
        self.0.insert(field, message);
    }
}

/// Positive amount in whole cents. Anything that rounds to zero is rejected.
pub fn parse_amount(raw: &str) -> Option<i64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    let cents = (value * 100.0).round();
    if cents < 1.0 || cents > i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).ok()
}

/// Returns one message per invalid field; an empty result means the draft can be saved.
pub fn validate(draft: &TransactionDraft) -> DraftErrors {
    let mut errors = DraftErrors::default();
    let is_transfer = draft.transaction_type == TransactionType::Transfer;
    let is_income = draft.transaction_type == TransactionType::Income;

    if parse_amount(&draft.amount).is_none() {
        errors.insert(DraftField::Amount, "Please enter a valid amount");
    }

    if !is_transfer && draft.category.is_none() {
        errors.insert(DraftField::Category, "Please select a category");
    }

    // Income only credits an account, so it has no source.
    if !is_income && draft.from_account.is_none() {
        let message = if is_transfer {
            "Please select source account"
        } else {
            "Please select an account"
        };
        errors.insert(DraftField::FromAccount, message);
    }

    if is_income || is_transfer {
        match (draft.from_account, draft.to_account) {
            (_, None) if is_transfer => {
                errors.insert(DraftField::ToAccount, "Please select destination account");
            }
            (_, None) => errors.insert(DraftField::ToAccount, "Please select an account"),
            (Some(from), Some(to)) if is_transfer && from == to => {
                errors.insert(
                    DraftField::ToAccount,
                    "Source and destination accounts must be different",
                );
            }
            _ => {}
        }
    }

    if draft.date.trim().is_empty() {
        errors.insert(DraftField::Date, "Please select a date");
    } else if parse_date(&draft.date).is_none() {
        errors.insert(DraftField::Date, "Please enter a valid date");
    }

    if draft.time.trim().is_empty() {
        errors.insert(DraftField::Time, "Please select a time");
    } else if parse_time(&draft.time).is_none() {
        errors.insert(DraftField::Time, "Please enter a valid time");
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(transaction_type: TransactionType) -> TransactionDraft {
        TransactionDraft {
            transaction_type,
            amount: "50".into(),
            date: "2025-03-01".into(),
            time: "08:15".into(),
            ..Default::default()
        }
    }

    fn fields(errors: &DraftErrors) -> Vec<DraftField> {
        errors.fields().collect()
    }

    #[test]
    fn test_complete_expense_is_valid() {
        let mut d = draft(TransactionType::Expense);
        d.category = Some(1);
        d.from_account = Some(7);
        assert!(validate(&d).is_empty());
    }

    #[test]
    fn test_transfer_to_same_account() {
        let mut d = draft(TransactionType::Transfer);
        d.from_account = Some(1);
        d.to_account = Some(1);

        let errors = validate(&d);
        assert_eq!(fields(&errors), vec![DraftField::ToAccount]);
        assert_eq!(
            errors.get(DraftField::ToAccount),
            Some("Source and destination accounts must be different")
        );
    }

    #[test]
    fn test_income_with_zero_amount_and_no_account() {
        let mut d = draft(TransactionType::Income);
        d.amount = "0".into();
        d.category = Some(9);

        let errors = validate(&d);
        assert_eq!(fields(&errors), vec![DraftField::Amount, DraftField::ToAccount]);
        assert!(!errors.contains(DraftField::Category));
        assert!(!errors.contains(DraftField::FromAccount));
        assert_eq!(errors.get(DraftField::ToAccount), Some("Please select an account"));
    }

    #[test]
    fn test_transfer_never_requires_category() {
        let d = draft(TransactionType::Transfer);
        let errors = validate(&d);
        assert!(!errors.contains(DraftField::Category));
        assert_eq!(errors.get(DraftField::FromAccount), Some("Please select source account"));
        assert_eq!(errors.get(DraftField::ToAccount), Some("Please select destination account"));
    }

    #[test]
    fn test_expense_ignores_destination_account() {
        let d = draft(TransactionType::Expense);
        let errors = validate(&d);
        assert_eq!(fields(&errors), vec![DraftField::Category, DraftField::FromAccount]);
        assert_eq!(errors.get(DraftField::FromAccount), Some("Please select an account"));
    }

    #[test]
    fn test_all_rules_reported_together() {
        let d = TransactionDraft {
            transaction_type: TransactionType::Expense,
            ..Default::default()
        };
        let errors = validate(&d);
        assert_eq!(
            fields(&errors),
            vec![
                DraftField::Amount,
                DraftField::Category,
                DraftField::FromAccount,
                DraftField::Date,
                DraftField::Time,
            ]
        );
        assert_eq!(errors.get(DraftField::Date), Some("Please select a date"));
        assert_eq!(errors.get(DraftField::Time), Some("Please select a time"));
    }

    #[test]
    fn test_amount_rules() {
        assert_eq!(parse_amount("12.34"), Some(1234));
        assert_eq!(parse_amount(" 7 "), Some(700));
        assert_eq!(parse_amount("0.01"), Some(1));
        assert_eq!(parse_amount("0.001"), None);
        assert_eq!(parse_amount("-5"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn test_malformed_date_and_time() {
        let mut d = draft(TransactionType::Expense);
        d.category = Some(1);
        d.from_account = Some(1);
        d.date = "03/01/2025".into();
        d.time = "25:99".into();

        let errors = validate(&d);
        assert_eq!(errors.get(DraftField::Date), Some("Please enter a valid date"));
        assert_eq!(errors.get(DraftField::Time), Some("Please enter a valid time"));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let mut d = draft(TransactionType::Transfer);
        d.amount = "x".into();
        d.from_account = Some(2);
        assert_eq!(validate(&d), validate(&d));
    }

    #[test]
    fn test_errors_serialize_as_field_map() {
        let d = draft(TransactionType::Income);
        let value = serde_json::to_value(validate(&d)).unwrap();
        assert_eq!(value["category"], "Please select a category");
        assert_eq!(value["to_account"], "Please select an account");
    }
}
