use crate::{
    auth::{
        generate_token, hash_password, verify_password, verify_token, AuthenticatedUser,
        LoginRequest, PasswordChange, TokenResponse, TokenType, ACCESS_TOKEN_COOKIE,
        REFRESH_TOKEN_COOKIE,
    },
    auth::token::{ACCESS_TOKEN_TTL_MINUTES, REFRESH_TOKEN_TTL_DAYS},
    error::AppError,
    models::User,
};
use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Builds an httpOnly authentication cookie scoped to the whole site.
fn auth_cookie(name: &'static str, token: &str, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(name, token.to_owned())
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

fn token_cookies(access: &str, refresh_value: &str) -> (Cookie<'static>, Cookie<'static>) {
    (
        auth_cookie(ACCESS_TOKEN_COOKIE, access, ACCESS_TOKEN_TTL_MINUTES * 60),
        auth_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh_value,
            REFRESH_TOKEN_TTL_DAYS * 24 * 60 * 60,
        ),
    )
}

async fn fetch_active_user(pool: &PgPool, user_id: i32) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, is_active, created_at \
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match user {
        Some(user) if user.is_active => Ok(user),
        _ => Err(AppError::Unauthorized("User not found or inactive".into())),
    }
}

/// Login user
///
/// Authenticates by username and password, sets httpOnly cookies with both
/// tokens, and returns them in the body as well. The failure message never
/// reveals whether the username exists.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    credentials: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    credentials.validate()?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, is_active, created_at \
         FROM users WHERE username = $1",
    )
    .bind(&credentials.username)
    .fetch_optional(&**pool)
    .await?;

    let user = match user {
        Some(user) => user,
        None => {
            return Err(AppError::Unauthorized(
                "Incorrect username or password".into(),
            ))
        }
    };

    if !verify_password(&credentials.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Incorrect username or password".into(),
        ));
    }

    if !user.is_active {
        return Err(AppError::Unauthorized("User account is inactive".into()));
    }

    let access_token = generate_token(user.id, TokenType::Access)?;
    let refresh_token = generate_token(user.id, TokenType::Refresh)?;
    let (access_cookie, refresh_cookie) = token_cookies(&access_token, &refresh_token);

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(TokenResponse::new(access_token, refresh_token)))
}

/// Logout user
///
/// Clears both authentication cookies.
#[post("/logout")]
pub async fn logout() -> impl Responder {
    HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(removal_cookie(REFRESH_TOKEN_COOKIE))
        .json(json!({ "message": "Successfully logged out" }))
}

/// Refresh tokens
///
/// Verifies the `refresh_token` cookie, re-checks that the user still exists
/// and is active, and rotates both tokens.
#[post("/refresh")]
pub async fn refresh(
    pool: web::Data<PgPool>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let refresh_token = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Refresh token missing".into()))?;

    let claims = verify_token(&refresh_token, TokenType::Refresh)?;
    let user = fetch_active_user(&pool, claims.sub).await?;

    let access_token = generate_token(user.id, TokenType::Access)?;
    let refresh_token = generate_token(user.id, TokenType::Refresh)?;
    let (access_cookie, refresh_cookie) = token_cookies(&access_token, &refresh_token);

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(TokenResponse::new(access_token, refresh_token)))
}

/// Get the current authenticated user.
#[get("/me")]
pub async fn me(auth: AuthenticatedUser) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(auth.0))
}

/// Change the current user's password.
///
/// The current password must match, and the new password must satisfy the
/// length policy enforced by the password module.
#[post("/change-password")]
pub async fn change_password(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    password_data: web::Json<PasswordChange>,
) -> Result<impl Responder, AppError> {
    if !verify_password(&password_data.current_password, &auth.0.password_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let new_hash = hash_password(&password_data.new_password)?;

    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&new_hash)
        .bind(auth.id())
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Password changed successfully" })))
}
