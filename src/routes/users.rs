use crate::{
    auth::hash_password,
    error::AppError,
    models::{NewUser, Task, TaskStatus, User, UserQuery, UserUpdate, UserWithTasks},
    routes::tasks::{fetch_task, is_assigned},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

const DEFAULT_PAGE_SIZE: i64 = 100;

const USER_COLUMNS: &str = "id, username, email, password_hash, is_active, created_at";

/// Loads a user by id, or fails with 404.
pub(crate) async fn fetch_user(pool: &PgPool, user_id: i32) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    user.ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

async fn fetch_user_tasks(pool: &PgPool, user_id: i32) -> Result<Vec<Task>, AppError> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT t.id, t.title, t.description, t.status, t.created_at, t.updated_at \
         FROM tasks t JOIN user_tasks ut ON ut.task_id = t.id \
         WHERE ut.user_id = $1 ORDER BY t.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(tasks)
}

/// Create a new user.
///
/// Duplicate usernames and emails are rejected with 400. The password is
/// checked against the length policy and stored as a bcrypt hash.
///
/// ## Responses:
/// - `201 Created`: returns the new `User` (without the password hash).
/// - `400 Bad Request`: invalid input, weak password, or duplicate username/email.
#[post("")]
pub async fn create_user(
    pool: web::Data<PgPool>,
    user_data: web::Json<NewUser>,
) -> Result<impl Responder, AppError> {
    user_data.validate()?;

    let existing = sqlx::query_as::<_, (String,)>(
        "SELECT username FROM users WHERE username = $1 OR email = $2",
    )
    .bind(&user_data.username)
    .bind(&user_data.email)
    .fetch_optional(&**pool)
    .await?;

    if let Some((username,)) = existing {
        if username == user_data.username {
            return Err(AppError::BadRequest("Username already registered".into()));
        }
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password_hash = hash_password(&user_data.password)?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&user_data.username)
    .bind(&user_data.email)
    .bind(&password_hash)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(user))
}

/// List users with pagination and optional filters.
///
/// ## Query Parameters:
/// - `skip` (optional): records to skip, defaults to 0.
/// - `limit` (optional): page size, defaults to 100, capped at 1000.
/// - `username` (optional): case-insensitive substring filter.
/// - `email` (optional): case-insensitive substring filter.
#[get("")]
pub async fn list_users(
    pool: web::Data<PgPool>,
    query_params: web::Query<UserQuery>,
) -> Result<impl Responder, AppError> {
    query_params.validate()?;

    let mut sql = format!("SELECT {} FROM users", USER_COLUMNS);
    let mut param_count = 1;
    let mut conditions: Vec<String> = Vec::new();

    if query_params.username.is_some() {
        conditions.push(format!("username ILIKE ${}", param_count));
        param_count += 1;
    }
    if query_params.email.is_some() {
        conditions.push(format!("email ILIKE ${}", param_count));
        param_count += 1;
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql.push_str(&format!(
        " ORDER BY id LIMIT ${} OFFSET ${}",
        param_count,
        param_count + 1
    ));

    let mut query_builder = sqlx::query_as::<_, User>(&sql);

    if let Some(username) = &query_params.username {
        query_builder = query_builder.bind(format!("%{}%", username));
    }
    if let Some(email) = &query_params.email {
        query_builder = query_builder.bind(format!("%{}%", email));
    }
    query_builder = query_builder
        .bind(query_params.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .bind(query_params.skip.unwrap_or(0));

    let users = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(users))
}

/// Get a user by id, together with the tasks assigned to it.
///
/// ## Responses:
/// - `200 OK`: the `User` plus its `tasks`.
/// - `404 Not Found`: no such user.
#[get("/{user_id}")]
pub async fn get_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let user = fetch_user(&pool, user_id.into_inner()).await?;
    let tasks = fetch_user_tasks(&pool, user.id).await?;

    Ok(HttpResponse::Ok().json(UserWithTasks { user, tasks }))
}

/// Update a user's username and/or email.
///
/// Omitted fields are left unchanged. Uniqueness is re-checked against other
/// users; conflicts are rejected with 400.
#[put("/{user_id}")]
pub async fn update_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
    user_update: web::Json<UserUpdate>,
) -> Result<impl Responder, AppError> {
    user_update.validate()?;
    let user_id = user_id.into_inner();
    let mut user = fetch_user(&pool, user_id).await?;

    if let Some(username) = &user_update.username {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id != $2)",
        )
        .bind(username)
        .bind(user_id)
        .fetch_one(&**pool)
        .await?;
        if taken {
            return Err(AppError::BadRequest("Username already used".into()));
        }
        user.username = username.clone();
    }

    if let Some(email) = &user_update.email {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id != $2)",
        )
        .bind(email)
        .bind(user_id)
        .fetch_one(&**pool)
        .await?;
        if taken {
            return Err(AppError::BadRequest("Email already used".into()));
        }
        user.email = email.clone();
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET username = $1, email = $2 WHERE id = $3 RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&user.username)
    .bind(&user.email)
    .bind(user_id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(user))
}

/// Delete a user.
///
/// Removes the user's assignment rows through the cascading foreign key; the
/// tasks themselves are kept.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `404 Not Found`: no such user.
#[delete("/{user_id}")]
pub async fn delete_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let user_id = user_id.into_inner();

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    status: Option<TaskStatus>,
}

/// List the tasks assigned to a user, optionally filtered by status.
///
/// An unknown `status` value is rejected with 400 at deserialization.
#[get("/{user_id}/tasks")]
pub async fn get_user_tasks(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
    filter: web::Query<StatusFilter>,
) -> Result<impl Responder, AppError> {
    let user = fetch_user(&pool, user_id.into_inner()).await?;

    let mut tasks = fetch_user_tasks(&pool, user.id).await?;
    if let Some(status) = filter.status {
        tasks.retain(|task| task.status == status);
    }

    Ok(HttpResponse::Ok().json(tasks))
}

/// Assign a task to a user.
///
/// ## Responses:
/// - `201 Created`: join row added.
/// - `400 Bad Request`: the pair already exists.
/// - `404 Not Found`: user or task missing.
#[post("/{user_id}/tasks/{task_id}")]
pub async fn assign_task_to_user(
    pool: web::Data<PgPool>,
    path: web::Path<(i32, i32)>,
) -> Result<impl Responder, AppError> {
    let (user_id, task_id) = path.into_inner();
    let user = fetch_user(&pool, user_id).await?;
    let task = fetch_task(&pool, task_id).await?;

    if is_assigned(&pool, user.id, task.id).await? {
        return Err(AppError::BadRequest(
            "Task already assigned to the user".into(),
        ));
    }

    sqlx::query("INSERT INTO user_tasks (user_id, task_id) VALUES ($1, $2)")
        .bind(user.id)
        .bind(task.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": format!("Task {} assigned to user {}", task_id, user_id)
    })))
}

/// Remove a task from a user.
///
/// ## Responses:
/// - `204 No Content`: join row removed.
/// - `400 Bad Request`: the pair does not exist.
/// - `404 Not Found`: user or task missing.
#[delete("/{user_id}/tasks/{task_id}")]
pub async fn remove_task_from_user(
    pool: web::Data<PgPool>,
    path: web::Path<(i32, i32)>,
) -> Result<impl Responder, AppError> {
    let (user_id, task_id) = path.into_inner();
    let user = fetch_user(&pool, user_id).await?;
    let task = fetch_task(&pool, task_id).await?;

    let result = sqlx::query("DELETE FROM user_tasks WHERE user_id = $1 AND task_id = $2")
        .bind(user.id)
        .bind(task.id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest("Task not assigned to this user".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}
