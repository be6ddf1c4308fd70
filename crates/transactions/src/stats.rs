//! Pure reductions over ledger entries. None of these fail: missing amounts count as
//! zero and unknown transaction types are skipped.

use crate::models::{DateRange, LedgerEntry, TransactionType};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
pub struct TransactionStats {
    /// The bounds the caller filtered by; not re-applied here.
    pub period: DateRange,
    pub income: i64,
    pub expenses: i64,
    pub transfers: i64,
    pub savings: i64,
    pub count: usize,
}

/// Totals per transaction type. `entries` must already be limited to one user's
/// completed transactions inside `period`.
pub fn compute_transaction_stats(entries: &[LedgerEntry], period: DateRange) -> TransactionStats {
    let mut income = 0i64;
    let mut expenses = 0i64;
    let mut transfers = 0i64;

    for entry in entries {
        let amount = entry.amount.unwrap_or(0);
        match entry.kind {
            Some(TransactionType::Income) => income = income.saturating_add(amount),
            Some(TransactionType::Expense) => expenses = expenses.saturating_add(amount.saturating_abs()),
            Some(TransactionType::Transfer) => transfers = transfers.saturating_add(amount),
            None => {}
        }
    }

    TransactionStats {
        period,
        income,
        expenses,
        transfers,
        savings: income.saturating_sub(expenses),
        count: entries.len(),
    }
}

/// Spent amount for one budget. `entries` must already be limited to completed expenses
/// of `category_id` inside `period`; this only sums them.
pub fn compute_budget_spending(entries: &[LedgerEntry], category_id: i64, period: DateRange) -> i64 {
    tracing::trace!(category_id, ?period, entries = entries.len(), "summing budget spending");
    entries
        .iter()
        .map(|e| e.amount.unwrap_or(0).saturating_abs())
        .fold(0i64, i64::saturating_add)
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CategoryShare {
    pub category_id: i64,
    pub total: i64,
    pub percentage: f64,
}

/// Expense totals grouped by category, largest first. Entries without a category or
/// of another type are left out.
pub fn expense_breakdown(entries: &[LedgerEntry]) -> Vec<CategoryShare> {
    let mut totals: HashMap<i64, i64> = HashMap::new();
    for entry in entries {
        if let (Some(TransactionType::Expense), Some(category_id)) = (entry.kind, entry.category_id) {
            let total = totals.entry(category_id).or_default();
            *total = total.saturating_add(entry.amount.unwrap_or(0).saturating_abs());
        }
    }

    let grand_total: i64 = totals.values().copied().fold(0, i64::saturating_add);
    let mut shares: Vec<CategoryShare> = totals
        .into_iter()
        .map(|(category_id, total)| CategoryShare {
            category_id,
            total,
            percentage: if grand_total > 0 {
                total as f64 / grand_total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    shares.sort_by(|a, b| b.total.cmp(&a.total).then(a.category_id.cmp(&b.category_id)));
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn january() -> DateRange {
        DateRange::month_containing(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    }

    fn entry(kind: TransactionType, amount: i64) -> LedgerEntry {
        LedgerEntry {
            kind: Some(kind),
            category_id: None,
            amount: Some(amount),
        }
    }

    fn expense(category_id: i64, amount: i64) -> LedgerEntry {
        LedgerEntry {
            kind: Some(TransactionType::Expense),
            category_id: Some(category_id),
            amount: Some(amount),
        }
    }

    #[test]
    fn test_stats_by_type() {
        let entries = vec![
            entry(TransactionType::Income, 100_000),
            entry(TransactionType::Expense, 20_000),
            entry(TransactionType::Expense, 5_000),
            entry(TransactionType::Transfer, 30_000),
        ];

        let stats = compute_transaction_stats(&entries, january());
        assert_eq!(stats.income, 100_000);
        assert_eq!(stats.expenses, 25_000);
        assert_eq!(stats.transfers, 30_000);
        assert_eq!(stats.savings, 75_000);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.period, january());
    }

    #[test]
    fn test_stats_empty_is_all_zero() {
        let stats = compute_transaction_stats(&[], january());
        assert_eq!(
            (stats.income, stats.expenses, stats.transfers, stats.savings, stats.count),
            (0, 0, 0, 0, 0)
        );
    }

    #[test]
    fn test_negative_expense_counts_as_absolute() {
        let stats = compute_transaction_stats(&[entry(TransactionType::Expense, -4_200)], january());
        assert_eq!(stats.expenses, 4_200);
        assert_eq!(stats.savings, -4_200);
    }

    #[test]
    fn test_unknown_kind_and_missing_amount() {
        let entries = vec![
            LedgerEntry { kind: None, category_id: None, amount: Some(9_999) },
            LedgerEntry { kind: Some(TransactionType::Income), category_id: None, amount: None },
            entry(TransactionType::Income, 500),
        ];

        let stats = compute_transaction_stats(&entries, january());
        assert_eq!(stats.income, 500);
        assert_eq!(stats.expenses, 0);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn test_savings_is_income_minus_expenses() {
        let entries = vec![
            entry(TransactionType::Income, 1_000),
            entry(TransactionType::Expense, 3_000),
        ];
        let stats = compute_transaction_stats(&entries, january());
        assert_eq!(stats.savings, stats.income - stats.expenses);
        assert_eq!(stats.savings, -2_000);
    }

    #[test]
    fn test_budget_spending_sums_absolute_amounts() {
        let entries = vec![expense(4, 40_000), expense(4, 25_000), expense(4, -5_000)];
        assert_eq!(compute_budget_spending(&entries, 4, january()), 70_000);
    }

    #[test]
    fn test_budget_spending_empty_is_zero() {
        assert_eq!(compute_budget_spending(&[], 4, january()), 0);
    }

    #[test]
    fn test_budget_spending_missing_amount_is_zero() {
        let entries = vec![
            LedgerEntry { kind: Some(TransactionType::Expense), category_id: Some(4), amount: None },
            expense(4, 1_000),
        ];
        assert_eq!(compute_budget_spending(&entries, 4, january()), 1_000);
    }

    #[test]
    fn test_expense_breakdown_shares() {
        let entries = vec![
            expense(1, 3_000),
            expense(2, 1_000),
            expense(1, 4_000),
            entry(TransactionType::Income, 50_000),
            entry(TransactionType::Expense, 2_000),
        ];

        let shares = expense_breakdown(&entries);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].category_id, 1);
        assert_eq!(shares[0].total, 7_000);
        assert!((shares[0].percentage - 87.5).abs() < 1e-9);
        assert_eq!(shares[1].total, 1_000);
        assert!((shares[1].percentage - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_expense_breakdown_empty() {
        assert!(expense_breakdown(&[]).is_empty());
    }
}
