use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use dotenv::dotenv;
use serde_json::json;
use sqlx::PgPool;
use taskboard::auth::TokenResponse;
use taskboard::routes;
use taskboard::routes::health;

/// Connects to the test database, or returns `None` (skipping the test) when
/// `DATABASE_URL` is not configured.
async fn test_pool() -> Option<PgPool> {
    dotenv().ok();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "integration-test-secret");
    }
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping DB-backed test");
            return None;
        }
    };
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

async fn cleanup_user(pool: &PgPool, username: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(username)
        .execute(pool)
        .await;
}

#[actix_rt::test]
async fn test_login_and_me_flow() {
    let Some(pool) = test_pool().await else { return };
    cleanup_user(&pool, "auth_flow_user").await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(Logger::default())
            .service(health::health)
            .service(web::scope("/api/v1").configure(routes::config)),
    )
    .await;

    // Create a user through the public endpoint
    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(json!({
            "username": "auth_flow_user",
            "email": "auth_flow_user@example.com",
            "password": "Password123!"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::CREATED,
        "User creation failed. Body: {:?}",
        String::from_utf8_lossy(&body)
    );
    let user: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(
        user.get("password_hash").is_none(),
        "Password hash must never be serialized"
    );

    // Login with the wrong password: generic 401
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "auth_flow_user", "password": "WrongPassword!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    let wrong_password_body: serde_json::Value =
        serde_json::from_slice(&test::read_body(resp).await).unwrap();

    // Login with a nonexistent username: same generic message, no user leak
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "no_such_user_xyz", "password": "WrongPassword!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    let missing_user_body: serde_json::Value =
        serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(
        wrong_password_body["error"], missing_user_body["error"],
        "Login failures must not reveal whether the user exists"
    );

    // Successful login sets both cookies and returns both tokens
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "auth_flow_user", "password": "Password123!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

    let cookies: Vec<String> = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let tokens: TokenResponse = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert!(!tokens.access_token.is_empty());
    assert!(!tokens.refresh_token.is_empty());
    assert_eq!(tokens.token_type, "bearer");

    // /auth/me with a bearer header
    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", tokens.access_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let me: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(me["username"], "auth_flow_user");

    // /auth/me with the access token cookie only
    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .cookie(actix_web::cookie::Cookie::new(
            "access_token",
            tokens.access_token.clone(),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

    // /auth/me without any token
    let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);

    // A refresh token must not work as an access token
    let req = test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", tokens.refresh_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);

    cleanup_user(&pool, "auth_flow_user").await;
}

#[actix_rt::test]
async fn test_refresh_and_logout() {
    let Some(pool) = test_pool().await else { return };
    cleanup_user(&pool, "refresh_user").await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(Logger::default())
            .service(web::scope("/api/v1").configure(routes::config)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(json!({
            "username": "refresh_user",
            "email": "refresh_user@example.com",
            "password": "Password123!"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "refresh_user", "password": "Password123!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let tokens: TokenResponse = serde_json::from_slice(&test::read_body(resp).await).unwrap();

    // Refresh without a cookie fails
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);

    // An access token in the refresh cookie is rejected
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(actix_web::cookie::Cookie::new(
            "refresh_token",
            tokens.access_token.clone(),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);

    // A proper refresh rotates the tokens
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(actix_web::cookie::Cookie::new(
            "refresh_token",
            tokens.refresh_token.clone(),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let rotated: TokenResponse = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert!(!rotated.access_token.is_empty());

    // Logout clears both cookies
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let cookies: Vec<String> = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));

    cleanup_user(&pool, "refresh_user").await;
}

#[actix_rt::test]
async fn test_change_password() {
    let Some(pool) = test_pool().await else { return };
    cleanup_user(&pool, "pwchange_user").await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(Logger::default())
            .service(web::scope("/api/v1").configure(routes::config)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(json!({
            "username": "pwchange_user",
            "email": "pwchange_user@example.com",
            "password": "OldPassword1!"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "pwchange_user", "password": "OldPassword1!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let tokens: TokenResponse = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let bearer = ("Authorization", format!("Bearer {}", tokens.access_token));

    // Wrong current password
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/change-password")
        .insert_header(bearer.clone())
        .set_json(json!({ "current_password": "nope", "new_password": "NewPassword1!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

    // New password below the length policy
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/change-password")
        .insert_header(bearer.clone())
        .set_json(json!({ "current_password": "OldPassword1!", "new_password": "short" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

    // Successful change
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/change-password")
        .insert_header(bearer)
        .set_json(json!({ "current_password": "OldPassword1!", "new_password": "NewPassword1!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

    // Old password no longer works, new one does
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "pwchange_user", "password": "OldPassword1!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "pwchange_user", "password": "NewPassword1!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

    cleanup_user(&pool, "pwchange_user").await;
}
