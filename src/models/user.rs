use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::task::Task;

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Represents a user entity as stored in the database.
///
/// The password hash is never serialized into API responses.
#[derive(Debug, Serialize, Clone, FromRow)]
pub struct User {
    /// Unique identifier for the user.
    pub id: i32,
    /// Globally unique username.
    pub username: String,
    /// Globally unique email address.
    pub email: String,
    /// bcrypt hash of the user's password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Inactive accounts cannot authenticate.
    pub is_active: bool,
    /// Timestamp of account creation.
    pub created_at: DateTime<Utc>,
}

/// Input structure for creating a user.
///
/// Password length policy (8 chars minimum, 72 bytes maximum) is enforced by
/// the password module at hashing time.
#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    /// Must be between 3 and 50 characters, alphanumeric, underscores, or hyphens.
    #[validate(
        length(min = 3, max = 50),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Partial update for a user; omitted fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(
        length(min = 3, max = 50),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Query parameters for listing users.
#[derive(Debug, Deserialize, Validate)]
pub struct UserQuery {
    /// Number of records to skip. Defaults to 0.
    #[validate(range(min = 0))]
    pub skip: Option<i64>,
    /// Maximum number of records to return. Defaults to 100, capped at 1000.
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<i64>,
    /// Case-insensitive substring filter on the username.
    pub username: Option<String>,
    /// Case-insensitive substring filter on the email.
    pub email: Option<String>,
}

/// A user together with the tasks assigned to it.
#[derive(Debug, Serialize)]
pub struct UserWithTasks {
    #[serde(flatten)]
    pub user: User,
    pub tasks: Vec<Task>,
}
