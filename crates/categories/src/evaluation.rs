//! Budget utilization tiers and period-over-period trends.
//!
//! Two thresholds coexist here: the fixed 80%/100% tier boundaries drive
//! [`BudgetStatus`], while a budget's own `alert_threshold` only decides
//! [`alert_reached`].

use serde::Serialize;

/// Upper bound (inclusive) of the `Good` tier, in percent.
pub const GOOD_TIER_LIMIT: f64 = 80.0;
/// Upper bound (inclusive) of the `Warning` tier, in percent.
pub const WARNING_TIER_LIMIT: f64 = 100.0;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Good,
    Warning,
    Over,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct BudgetEvaluation {
    /// Utilization clamped to `0..=100` for progress display.
    pub percentage: f64,
    pub status: BudgetStatus,
    pub alert_reached: bool,
}

/// Spent as a percentage of allocated, unclamped. Zero when nothing is allocated.
pub fn utilization(allocated: i64, spent: i64) -> f64 {
    if allocated <= 0 {
        return 0.0;
    }
    spent as f64 * 100.0 / allocated as f64
}

pub fn classify_utilization(ratio: f64) -> BudgetStatus {
    if ratio <= GOOD_TIER_LIMIT {
        BudgetStatus::Good
    } else if ratio <= WARNING_TIER_LIMIT {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Over
    }
}

/// True once utilization reaches the budget's alert threshold.
/// A budget with nothing allocated never alerts.
pub fn alert_reached(allocated: i64, spent: i64, alert_threshold: u8) -> bool {
    allocated > 0 && utilization(allocated, spent) >= f64::from(alert_threshold)
}

pub fn evaluate_budget(allocated: i64, spent: i64, alert_threshold: u8) -> BudgetEvaluation {
    let ratio = utilization(allocated, spent);

    BudgetEvaluation {
        percentage: ratio.clamp(0.0, 100.0),
        status: classify_utilization(ratio),
        alert_reached: alert_reached(allocated, spent, alert_threshold),
    }
}

pub fn classify_trend<T: PartialOrd>(previous: T, current: T) -> Trend {
    if current > previous {
        Trend::Up
    } else if current < previous {
        Trend::Down
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_allocation_is_not_divided() {
        let eval = evaluate_budget(0, 12345, 80);
        assert_eq!(eval.percentage, 0.0);
        assert_eq!(eval.status, BudgetStatus::Good);
        assert!(!eval.alert_reached);
    }

    #[test]
    fn test_warning_tier() {
        let eval = evaluate_budget(800, 650, 80);
        assert_eq!(eval.percentage, 81.25);
        assert_eq!(eval.status, BudgetStatus::Warning);
    }

    #[test]
    fn test_overspend_is_clamped_but_over() {
        let eval = evaluate_budget(800, 1000, 80);
        assert_eq!(eval.percentage, 100.0);
        assert_eq!(eval.status, BudgetStatus::Over);
    }

    #[test]
    fn test_tier_boundaries_are_inclusive() {
        assert_eq!(evaluate_budget(100, 80, 50).status, BudgetStatus::Good);
        assert_eq!(evaluate_budget(100, 100, 50).status, BudgetStatus::Warning);
        assert_eq!(evaluate_budget(10000, 10001, 50).status, BudgetStatus::Over);
        assert_eq!(evaluate_budget(100, 0, 50).status, BudgetStatus::Good);
    }

    #[test]
    fn test_alert_threshold_is_independent_of_tiers() {
        // 70% spent: still in the good tier, but past a 60% alert
        let eval = evaluate_budget(1000, 700, 60);
        assert_eq!(eval.status, BudgetStatus::Good);
        assert!(eval.alert_reached);

        // 90% spent: warning tier, but below a 95% alert
        let eval = evaluate_budget(1000, 900, 95);
        assert_eq!(eval.status, BudgetStatus::Warning);
        assert!(!eval.alert_reached);
    }

    #[test]
    fn test_alert_fires_at_exact_threshold() {
        assert!(alert_reached(1000, 800, 80));
        assert!(!alert_reached(1000, 799, 80));
    }

    #[test]
    fn test_classify_trend() {
        assert_eq!(classify_trend(100, 100), Trend::Stable);
        assert_eq!(classify_trend(100, 150), Trend::Up);
        assert_eq!(classify_trend(150, 100), Trend::Down);
        assert_eq!(classify_trend(1.5, 1.25), Trend::Down);
    }

    #[test]
    fn test_utilization_unclamped() {
        assert_eq!(utilization(800, 1000), 125.0);
        assert_eq!(utilization(-5, 10), 0.0);
    }
}
