use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Bank,
    Cash,
    Credit,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Bank => "bank",
            AccountKind::Cash => "cash",
            AccountKind::Credit => "credit",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank" => Ok(AccountKind::Bank),
            "cash" => Ok(AccountKind::Cash),
            "credit" => Ok(AccountKind::Credit),
            other => Err(format!("unknown account type '{other}'")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: AccountKind,
    /// Cents. Credit accounts may be negative.
    pub balance: i64,
    pub is_active: bool,
}

/// Full-record payload for both create and update.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct AccountRequest {
    #[validate(length(min = 1, max = 100, message = "Account name must be 1-100 characters"))]
    pub name: String,
    pub kind: AccountKind,
    #[serde(default)]
    pub balance: i64,
}

impl AccountRequest {
    pub fn new(name: String, kind: AccountKind, balance: i64) -> Result<Self, String> {
        let req = Self {
            name: name.trim().to_string(),
            kind,
            balance,
        };
        req.validate().map_err(|e| e.to_string())?;
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_request_trims_name() {
        let req = AccountRequest::new("  Checking ".into(), AccountKind::Bank, 1000).unwrap();
        assert_eq!(req.name, "Checking");
    }

    #[test]
    fn test_account_request_empty_name() {
        assert!(AccountRequest::new("   ".into(), AccountKind::Cash, 0).is_err());
    }

    #[test]
    fn test_account_kind_round_trips_through_str() {
        for kind in [AccountKind::Bank, AccountKind::Cash, AccountKind::Credit] {
            assert_eq!(kind.as_str().parse::<AccountKind>().unwrap(), kind);
        }
        assert!("credit_card".parse::<AccountKind>().is_err());
    }
}
