use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(CategoryType::Income),
            "expense" => Ok(CategoryType::Expense),
            other => Err(format!("unknown category type '{other}'")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Category {
    pub id: i64,
    /// `None` for system defaults shared by every user.
    pub user_id: Option<i64>,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub category_type: CategoryType,
    pub is_default: bool,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 50, message = "Category name must be 1-50 characters"))]
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub category_type: CategoryType,
}

impl CategoryRequest {
    pub fn new(
        name: String,
        icon: Option<String>,
        color: Option<String>,
        category_type: CategoryType,
    ) -> Result<Self, String> {
        let req = Self {
            name: name.trim().to_string(),
            icon: icon.filter(|i| !i.trim().is_empty()),
            color: color.filter(|c| !c.trim().is_empty()),
            category_type,
        };
        req.validate().map_err(|e| e.to_string())?;
        Ok(req)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub name: Option<String>,
    /// Cents.
    pub allocated: i64,
    /// Percent of `allocated` at which the user wants to be alerted.
    pub alert_threshold: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

/// Full-record payload for both create and update.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct BudgetRequest {
    pub category_id: i64,
    #[validate(length(max = 100, message = "Budget name cannot exceed 100 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "Budget amount must be greater than 0"))]
    pub allocated: i64,
    #[serde(default = "default_alert_threshold")]
    #[validate(range(max = 100, message = "Alert threshold must be between 0 and 100"))]
    pub alert_threshold: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn default_alert_threshold() -> u8 {
    80
}

impl BudgetRequest {
    pub fn new(
        category_id: i64,
        name: Option<String>,
        allocated: i64,
        alert_threshold: u8,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, String> {
        let req = Self {
            category_id,
            name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            allocated,
            alert_threshold,
            start_date,
            end_date,
        };
        req.validate().map_err(|e| e.to_string())?;

        if req.start_date > req.end_date {
            return Err("Budget start date must not be after its end date".to_string());
        }

        Ok(req)
    }
}
