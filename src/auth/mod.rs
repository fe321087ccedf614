pub mod extractors;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims, TokenType};

/// Name of the httpOnly cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Name of the httpOnly cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username of the account to authenticate.
    #[validate(length(min = 1))]
    pub username: String,
    /// Password of the account.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Represents the payload for a password change request.
#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Response body returned by login and refresh.
///
/// Both tokens are also delivered as httpOnly cookies; the JSON body exists
/// for clients that prefer bearer headers.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_login_request_validation() {
        let valid_login = LoginRequest {
            username: "alice".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid_login.validate().is_ok());

        let empty_username = LoginRequest {
            username: "".to_string(),
            password: "password123".to_string(),
        };
        assert!(empty_username.validate().is_err());

        let empty_password = LoginRequest {
            username: "alice".to_string(),
            password: "".to_string(),
        };
        assert!(empty_password.validate().is_err());
    }

    #[test]
    fn test_token_response_defaults_bearer() {
        let response = TokenResponse::new("acc".into(), "ref".into());
        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.access_token, "acc");
        assert_eq!(response.refresh_token, "ref");
    }
}
