use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl Credentials {
    /// Emails are matched case-insensitively.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}
