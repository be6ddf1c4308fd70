//! Derived figures for the dashboard, budget and report screens. Spent amounts
//! are always recomputed from completed transactions, never read from storage.

use crate::models::{DateRange, LedgerEntry, LedgerQuery, Transaction, TransactionFilter, TransactionType};
use crate::repository::TransactionRepository;
use crate::service::{TransactionError, TransactionService};
use crate::stats::{self, TransactionStats};
use accounts::service::AccountService;
use categories::budget_service::BudgetService;
use categories::evaluation::{self, BudgetEvaluation, BudgetStatus, Trend};
use categories::models::{Budget, Category};
use categories::service::{CategoryError, CategoryService};
use chrono::NaiveDate;
use database::Database;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

pub const MAX_REPORT_MONTHS: u32 = 24;
const RECENT_TRANSACTIONS: i64 = 5;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BudgetProgress {
    #[serde(flatten)]
    pub budget: Budget,
    pub category_name: String,
    pub category_color: String,
    pub spent: i64,
    pub remaining: i64,
    /// Unclamped; `evaluation.percentage` is the display value.
    pub utilization: f64,
    pub evaluation: BudgetEvaluation,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CategoryMonth {
    pub category_id: i64,
    pub category_name: String,
    pub allocated: i64,
    pub spent: i64,
    pub status: BudgetStatus,
    /// Spending compared with the month before.
    pub trend: Trend,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MonthHistory {
    pub month: String,
    pub period: DateRange,
    pub categories: Vec<CategoryMonth>,
    pub total_allocated: i64,
    pub total_spent: i64,
    pub savings: i64,
    pub status: BudgetStatus,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CategoryBreakdown {
    pub category_id: i64,
    pub category_name: String,
    pub category_color: String,
    pub total: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MonthTotals {
    pub month: String,
    pub period: DateRange,
    pub income: i64,
    pub expenses: i64,
    pub savings: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MonthlyTrends {
    pub months: Vec<MonthTotals>,
    /// Expenses of the last month compared with the first.
    pub expense_trend: Trend,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Dashboard {
    pub stats: TransactionStats,
    pub total_balance: i64,
    pub recent_transactions: Vec<Transaction>,
    pub budgets: Vec<BudgetProgress>,
}

pub struct ReportService;

impl ReportService {
    async fn ledger(db: &Database, user_id: i64, query: LedgerQuery) -> Result<Vec<LedgerEntry>, TransactionError> {
        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        let entries = repo.ledger_entries(user_id, &query).await?;
        Ok(entries)
    }

    /// Visible categories by id, plus any deactivated ones among `ids` that
    /// history still points at.
    async fn categories_by_id(
        db: &Database,
        user_id: i64,
        ids: Vec<i64>,
    ) -> Result<HashMap<i64, Category>, TransactionError> {
        let mut by_id: HashMap<i64, Category> = CategoryService::list_categories(db, user_id, None)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        for id in ids {
            if by_id.contains_key(&id) {
                continue;
            }
            match CategoryService::get_category(db, user_id, id).await {
                Ok(category) => {
                    by_id.insert(id, category);
                }
                Err(CategoryError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(by_id)
    }

    #[instrument(skip(db))]
    pub async fn transaction_stats(
        db: &Database,
        user_id: i64,
        period: DateRange,
    ) -> Result<TransactionStats, TransactionError> {
        let entries = Self::ledger(db, user_id, LedgerQuery::period(period)).await?;
        Ok(stats::compute_transaction_stats(&entries, period))
    }

    #[instrument(skip(db))]
    pub async fn budget_spending(
        db: &Database,
        user_id: i64,
        category_id: i64,
        period: DateRange,
    ) -> Result<i64, TransactionError> {
        let entries = Self::ledger(db, user_id, LedgerQuery::category_expenses(category_id, period)).await?;
        Ok(stats::compute_budget_spending(&entries, category_id, period))
    }

    /// Every active budget measured over its own period, most utilized first.
    #[instrument(skip(db))]
    pub async fn budget_progress(db: &Database, user_id: i64) -> Result<Vec<BudgetProgress>, TransactionError> {
        let budgets = BudgetService::list_budgets(db, user_id).await?;
        let categories = Self::categories_by_id(db, user_id, budgets.iter().map(|b| b.category_id).collect()).await?;

        let mut progress = Vec::with_capacity(budgets.len());
        for budget in budgets {
            let period = DateRange {
                start: budget.start_date,
                end: budget.end_date,
            };
            let spent = Self::budget_spending(db, user_id, budget.category_id, period).await?;
            let category = categories.get(&budget.category_id);

            progress.push(BudgetProgress {
                category_name: category.map(|c| c.name.clone()).unwrap_or_default(),
                category_color: category.map(|c| c.color.clone()).unwrap_or_default(),
                spent,
                remaining: budget.allocated.saturating_sub(spent),
                utilization: evaluation::utilization(budget.allocated, spent),
                evaluation: evaluation::evaluate_budget(budget.allocated, spent, budget.alert_threshold),
                budget,
            });
        }

        progress.sort_by(|a, b| b.utilization.total_cmp(&a.utilization));
        Ok(progress)
    }

    /// Per-category spending against allocation for the `months` calendar months
    /// ending with the one containing `today`, newest first.
    #[instrument(skip(db))]
    pub async fn budget_history(
        db: &Database,
        user_id: i64,
        months: u32,
        today: NaiveDate,
    ) -> Result<Vec<MonthHistory>, TransactionError> {
        let months = months.clamp(1, MAX_REPORT_MONTHS);
        let budgets = BudgetService::list_budgets(db, user_id).await?;

        let mut allocated: BTreeMap<i64, i64> = BTreeMap::new();
        for budget in &budgets {
            let total = allocated.entry(budget.category_id).or_default();
            *total = total.saturating_add(budget.allocated);
        }
        let categories = Self::categories_by_id(db, user_id, allocated.keys().copied().collect()).await?;

        // One extra leading month so the oldest reported month has a trend baseline.
        let periods = DateRange::trailing_months(today, months + 1);
        let mut spent_by_month: Vec<BTreeMap<i64, i64>> = Vec::with_capacity(periods.len());
        for period in &periods {
            let query = LedgerQuery {
                period: *period,
                transaction_type: Some(TransactionType::Expense),
                category_id: None,
            };
            let entries = Self::ledger(db, user_id, query).await?;

            let spent = allocated
                .keys()
                .map(|&category_id| {
                    let in_category: Vec<LedgerEntry> = entries
                        .iter()
                        .filter(|e| e.category_id == Some(category_id))
                        .copied()
                        .collect();
                    (category_id, stats::compute_budget_spending(&in_category, category_id, *period))
                })
                .collect();
            spent_by_month.push(spent);
        }

        let mut history = Vec::with_capacity(months as usize);
        for (i, period) in periods.iter().enumerate().skip(1) {
            let previous = &spent_by_month[i - 1];
            let current = &spent_by_month[i];

            let rows: Vec<CategoryMonth> = allocated
                .iter()
                .map(|(&category_id, &allocated)| {
                    let spent = current.get(&category_id).copied().unwrap_or(0);
                    let before = previous.get(&category_id).copied().unwrap_or(0);
                    CategoryMonth {
                        category_id,
                        category_name: categories.get(&category_id).map(|c| c.name.clone()).unwrap_or_default(),
                        allocated,
                        spent,
                        status: evaluation::classify_utilization(evaluation::utilization(allocated, spent)),
                        trend: evaluation::classify_trend(before, spent),
                    }
                })
                .collect();

            let total_allocated = rows.iter().map(|r| r.allocated).fold(0, i64::saturating_add);
            let total_spent = rows.iter().map(|r| r.spent).fold(0, i64::saturating_add);

            history.push(MonthHistory {
                month: period.month_label(),
                period: *period,
                categories: rows,
                total_allocated,
                total_spent,
                savings: total_allocated.saturating_sub(total_spent),
                status: evaluation::classify_utilization(evaluation::utilization(total_allocated, total_spent)),
            });
        }

        history.reverse();
        Ok(history)
    }

    #[instrument(skip(db))]
    pub async fn category_breakdown(
        db: &Database,
        user_id: i64,
        period: DateRange,
    ) -> Result<Vec<CategoryBreakdown>, TransactionError> {
        let query = LedgerQuery {
            period,
            transaction_type: Some(TransactionType::Expense),
            category_id: None,
        };
        let entries = Self::ledger(db, user_id, query).await?;
        let shares = stats::expense_breakdown(&entries);
        let categories = Self::categories_by_id(db, user_id, shares.iter().map(|s| s.category_id).collect()).await?;

        Ok(shares
            .into_iter()
            .map(|share| {
                let category = categories.get(&share.category_id);
                CategoryBreakdown {
                    category_id: share.category_id,
                    category_name: category.map(|c| c.name.clone()).unwrap_or_default(),
                    category_color: category.map(|c| c.color.clone()).unwrap_or_default(),
                    total: share.total,
                    percentage: share.percentage,
                }
            })
            .collect())
    }

    /// Oldest month first.
    #[instrument(skip(db))]
    pub async fn monthly_trends(
        db: &Database,
        user_id: i64,
        months: u32,
        today: NaiveDate,
    ) -> Result<MonthlyTrends, TransactionError> {
        let months = months.clamp(1, MAX_REPORT_MONTHS);

        let mut totals = Vec::with_capacity(months as usize);
        for period in DateRange::trailing_months(today, months) {
            let stats = Self::transaction_stats(db, user_id, period).await?;
            totals.push(MonthTotals {
                month: period.month_label(),
                period,
                income: stats.income,
                expenses: stats.expenses,
                savings: stats.savings,
            });
        }

        let first = totals.first().map(|m| m.expenses).unwrap_or(0);
        let last = totals.last().map(|m| m.expenses).unwrap_or(0);

        Ok(MonthlyTrends {
            months: totals,
            expense_trend: evaluation::classify_trend(first, last),
        })
    }

    #[instrument(skip(db))]
    pub async fn dashboard(db: &Database, user_id: i64, today: NaiveDate) -> Result<Dashboard, TransactionError> {
        let stats = Self::transaction_stats(db, user_id, DateRange::month_containing(today)).await?;
        let total_balance = AccountService::total_balance(db, user_id).await?;
        let recent_transactions = TransactionService::list_transactions(
            db,
            user_id,
            TransactionFilter {
                limit: Some(RECENT_TRANSACTIONS),
                ..Default::default()
            },
        )
        .await?;
        let budgets = Self::budget_progress(db, user_id).await?;

        Ok(Dashboard {
            stats,
            total_balance,
            recent_transactions,
            budgets,
        })
    }
}
