use crate::error::AppError;
use bcrypt::{hash, verify, DEFAULT_COST};

/// Minimum password length in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;
/// bcrypt silently truncates input beyond 72 bytes, so longer passwords are rejected.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hashes a password with bcrypt after enforcing the length policy.
///
/// Fails with `AppError::BadRequest` when the password is shorter than 8
/// characters or longer than 72 UTF-8 bytes.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_length(password)?;
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

fn validate_password_length(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }

    let password_bytes = password.len();
    if password_bytes > MAX_PASSWORD_BYTES {
        return Err(AppError::BadRequest(format!(
            "Password too long ({} bytes). Maximum is {} bytes",
            password_bytes, MAX_PASSWORD_BYTES
        )));
    }

    Ok(())
}
