use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Access token lifetime in minutes.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 30;
/// Refresh token lifetime in days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Distinguishes short-lived access tokens from long-lived refresh tokens.
///
/// Serialized lowercase into the `"type"` claim so that a refresh token can
/// never be replayed where an access token is expected, and vice versa.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn lifetime(self) -> chrono::Duration {
        match self {
            TokenType::Access => chrono::Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
            TokenType::Refresh => chrono::Duration::days(REFRESH_TOKEN_TTL_DAYS),
        }
    }
}

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's unique identifier.
    pub sub: i32,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Whether this is an access or a refresh token.
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Generates a signed JWT of the given type for a user ID.
///
/// Access tokens expire after 30 minutes, refresh tokens after 7 days.
/// Requires the `JWT_SECRET` environment variable for signing.
///
/// # Returns
/// The JWT string, or `AppError::InternalServerError` if `JWT_SECRET` is not
/// set or encoding fails.
pub fn generate_token(user_id: i32, token_type: TokenType) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expiration = now
        .checked_add_signed(token_type.lifetime())
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        exp: expiration,
        iat: now.timestamp() as usize,
        token_type,
    };

    let secret = jwt_secret()?;

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies a JWT string and decodes its claims.
///
/// Default validation checks apply (signature, expiration), and the `"type"`
/// claim must match `expected_type`.
///
/// # Returns
/// The decoded `Claims` if the token is valid.
/// Returns `AppError::InternalServerError` if `JWT_SECRET` is not set, and
/// `AppError::Unauthorized` if the token is malformed, its signature is
/// invalid, it has expired, or its type does not match.
pub fn verify_token(token: &str, expected_type: TokenType) -> Result<Claims, AppError> {
    let secret = jwt_secret()?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    if claims.token_type != expected_type {
        return Err(AppError::Unauthorized(format!(
            "Invalid token type. Expected {:?}, got {:?}",
            expected_type, claims.token_type
        )));
    }

    Ok(claims)
}

fn jwt_secret() -> Result<String, AppError> {
    std::env::var("JWT_SECRET")
        .map_err(|_| AppError::InternalServerError("JWT_SECRET not set".into()))
}
