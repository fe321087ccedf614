use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;

use crate::auth::token::{verify_token, TokenType};
use crate::auth::ACCESS_TOKEN_COOKIE;
use crate::error::AppError;
use crate::models::User;

/// Extracts the authenticated user for a request.
///
/// The access token is taken from the `Authorization: Bearer` header, falling
/// back to the `access_token` cookie when the header is absent. The token is
/// verified as an access token and the referenced user is loaded from the
/// database.
///
/// Fails with `AppError::Unauthorized` when the token is missing or invalid,
/// or when the user does not exist or is inactive.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

/// Pulls the raw access token out of a request. The bearer header takes
/// precedence over the cookie.
pub fn token_from_request(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string());

    bearer.or_else(|| {
        req.cookie(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let pool = req
                .app_data::<web::Data<PgPool>>()
                .ok_or_else(|| {
                    AppError::InternalServerError("Database pool not configured".into())
                })?
                .clone();

            let token = token_from_request(&req)
                .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

            let claims = verify_token(&token, TokenType::Access)?;

            let user = sqlx::query_as::<_, User>(
                "SELECT id, username, email, password_hash, is_active, created_at \
                 FROM users WHERE id = $1",
            )
            .bind(claims.sub)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(AppError::from)?;

            match user {
                Some(user) if user.is_active => Ok(AuthenticatedUser(user)),
                _ => Err(AppError::Unauthorized("User not found or inactive".into()).into()),
            }
        })
    }
}
