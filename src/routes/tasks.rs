use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{NewTask, Task, TaskQuery, TaskStatus, TaskUpdate, TaskWithUsers, User},
    routes::users::fetch_user,
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

const DEFAULT_PAGE_SIZE: i64 = 100;

const TASK_COLUMNS: &str = "id, title, description, status, created_at, updated_at";

/// Loads a task by id, or fails with 404.
pub(crate) async fn fetch_task(pool: &PgPool, task_id: i32) -> Result<Task, AppError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = $1",
        TASK_COLUMNS
    ))
    .bind(task_id)
    .fetch_optional(pool)
    .await?;

    task.ok_or_else(|| AppError::NotFound(format!("Task {} not found", task_id)))
}

/// True when the (user, task) assignment pair exists.
pub(crate) async fn is_assigned(pool: &PgPool, user_id: i32, task_id: i32) -> Result<bool, AppError> {
    let assigned = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM user_tasks WHERE user_id = $1 AND task_id = $2)",
    )
    .bind(user_id)
    .bind(task_id)
    .fetch_one(pool)
    .await?;

    Ok(assigned)
}

/// Loads a task the caller is allowed to see.
///
/// A missing task is 404; an existing task the caller is not assigned to is 403.
async fn fetch_task_for(pool: &PgPool, task_id: i32, user_id: i32) -> Result<Task, AppError> {
    let task = fetch_task(pool, task_id).await?;

    if !is_assigned(pool, user_id, task.id).await? {
        return Err(AppError::Forbidden(
            "Not authorized to access this task".into(),
        ));
    }

    Ok(task)
}

async fn assigned_users(pool: &PgPool, task_id: i32) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT u.id, u.username, u.email, u.password_hash, u.is_active, u.created_at \
         FROM users u JOIN user_tasks ut ON ut.user_id = u.id \
         WHERE ut.task_id = $1 ORDER BY u.id",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Create a new task, auto-assigned to the caller.
///
/// The task row and its assignment row are written in a single transaction.
/// An explicit `id` that already exists is rejected with 400.
///
/// ## Responses:
/// - `201 Created`: the new `Task` with its assigned users.
/// - `400 Bad Request`: invalid input or duplicate id.
/// - `401 Unauthorized`: missing or invalid access token.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_data: web::Json<NewTask>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    if let Some(id) = task_data.id {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = $1)")
            .bind(id)
            .fetch_one(&**pool)
            .await?;
        if exists {
            return Err(AppError::BadRequest(format!("ID {} already used", id)));
        }
    }

    let mut tx = pool.begin().await?;

    let task = match task_data.id {
        Some(id) => {
            sqlx::query_as::<_, Task>(&format!(
                "INSERT INTO tasks (id, title, description, status) \
                 VALUES ($1, $2, $3, $4) RETURNING {}",
                TASK_COLUMNS
            ))
            .bind(id)
            .bind(&task_data.title)
            .bind(&task_data.description)
            .bind(task_data.status)
            .fetch_one(&mut *tx)
            .await?
        }
        None => {
            sqlx::query_as::<_, Task>(&format!(
                "INSERT INTO tasks (title, description, status) \
                 VALUES ($1, $2, $3) RETURNING {}",
                TASK_COLUMNS
            ))
            .bind(&task_data.title)
            .bind(&task_data.description)
            .bind(task_data.status)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query("INSERT INTO user_tasks (user_id, task_id) VALUES ($1, $2)")
        .bind(auth.id())
        .bind(task.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(TaskWithUsers {
        task,
        assigned_users: vec![auth.0],
    }))
}

/// List the tasks assigned to the caller.
///
/// ## Query Parameters:
/// - `skip` (optional): records to skip, defaults to 0.
/// - `limit` (optional): page size, defaults to 100.
/// - `status` (optional): filter by task status.
/// - `title` (optional): case-insensitive substring filter on the title.
///
/// ## Responses:
/// - `200 OK`: a JSON array of `Task` objects visible to the caller.
/// - `401 Unauthorized`: missing or invalid access token.
#[get("")]
pub async fn list_tasks(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    query_params.validate()?;

    // Base query scoped to the caller's assignments. Filter conditions are
    // appended dynamically with matching bind positions.
    let mut sql = String::from(
        "SELECT t.id, t.title, t.description, t.status, t.created_at, t.updated_at \
         FROM tasks t JOIN user_tasks ut ON ut.task_id = t.id WHERE ut.user_id = $1",
    );
    let mut param_count = 2;

    if query_params.status.is_some() {
        sql.push_str(&format!(" AND t.status = ${}", param_count));
        param_count += 1;
    }
    if query_params.title.is_some() {
        sql.push_str(&format!(" AND t.title ILIKE ${}", param_count));
        param_count += 1;
    }

    sql.push_str(&format!(
        " ORDER BY t.created_at DESC LIMIT ${} OFFSET ${}",
        param_count,
        param_count + 1
    ));

    let mut query_builder = sqlx::query_as::<_, Task>(&sql);

    query_builder = query_builder.bind(auth.id());

    if let Some(status) = query_params.status {
        query_builder = query_builder.bind(status);
    }
    if let Some(title) = &query_params.title {
        query_builder = query_builder.bind(format!("%{}%", title));
    }
    query_builder = query_builder
        .bind(query_params.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .bind(query_params.skip.unwrap_or(0));

    let tasks = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Get a task by id, together with its assigned users.
///
/// ## Responses:
/// - `200 OK`: the `Task` plus its `assigned_users`.
/// - `401 Unauthorized`: missing or invalid access token.
/// - `403 Forbidden`: the task exists but is not assigned to the caller.
/// - `404 Not Found`: no such task.
#[get("/{task_id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let task = fetch_task_for(&pool, task_id.into_inner(), auth.id()).await?;
    let assigned_users = assigned_users(&pool, task.id).await?;

    Ok(HttpResponse::Ok().json(TaskWithUsers {
        task,
        assigned_users,
    }))
}

/// Update a task's title, description, and/or status.
///
/// Omitted fields are left unchanged; `updated_at` is bumped. Same visibility
/// rules as `get_task`.
#[put("/{task_id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_id: web::Path<i32>,
    task_update: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    task_update.validate()?;
    let mut task = fetch_task_for(&pool, task_id.into_inner(), auth.id()).await?;

    if let Some(title) = &task_update.title {
        task.title = title.clone();
    }
    if let Some(description) = &task_update.description {
        task.description = Some(description.clone());
    }
    if let Some(status) = task_update.status {
        task.status = status;
    }

    let task = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET title = $1, description = $2, status = $3, updated_at = now() \
         WHERE id = $4 RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status)
    .bind(task.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(task))
}

#[derive(Debug, Deserialize)]
pub struct StatusParam {
    status: TaskStatus,
}

/// Update only the status of a task.
///
/// The new status is passed as the `status` query parameter; an unknown value
/// is rejected with 400 at deserialization.
#[patch("/{task_id}/status")]
pub async fn update_task_status(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_id: web::Path<i32>,
    param: web::Query<StatusParam>,
) -> Result<impl Responder, AppError> {
    let task = fetch_task_for(&pool, task_id.into_inner(), auth.id()).await?;

    let task = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET status = $1, updated_at = now() WHERE id = $2 RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(param.status)
    .bind(task.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Delete a task.
///
/// Removes the task's assignment rows through the cascading foreign key; the
/// assigned users are kept. Same visibility rules as `get_task`.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `401 Unauthorized`: missing or invalid access token.
/// - `403 Forbidden`: the task exists but is not assigned to the caller.
/// - `404 Not Found`: no such task.
#[delete("/{task_id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let task = fetch_task_for(&pool, task_id.into_inner(), auth.id()).await?;

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

/// List the users assigned to a task the caller can access.
#[get("/{task_id}/users")]
pub async fn get_task_users(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let task = fetch_task_for(&pool, task_id.into_inner(), auth.id()).await?;
    let users = assigned_users(&pool, task.id).await?;

    Ok(HttpResponse::Ok().json(users))
}

/// Assign a user to a task the caller can access.
///
/// ## Responses:
/// - `201 Created`: join row added.
/// - `400 Bad Request`: the user is already assigned.
/// - `403 Forbidden`: the caller is not assigned to the task.
/// - `404 Not Found`: task or target user missing.
#[post("/{task_id}/users/{user_id}")]
pub async fn assign_user_to_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    path: web::Path<(i32, i32)>,
) -> Result<impl Responder, AppError> {
    let (task_id, user_id) = path.into_inner();
    let task = fetch_task_for(&pool, task_id, auth.id()).await?;
    let user = fetch_user(&pool, user_id).await?;

    if is_assigned(&pool, user.id, task.id).await? {
        return Err(AppError::BadRequest(
            "User already assigned to this task".into(),
        ));
    }

    sqlx::query("INSERT INTO user_tasks (user_id, task_id) VALUES ($1, $2)")
        .bind(user.id)
        .bind(task.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": format!("User {} assigned to task {}", user_id, task_id)
    })))
}

/// Remove a user from a task the caller can access.
///
/// ## Responses:
/// - `204 No Content`: join row removed.
/// - `400 Bad Request`: the user is not assigned to the task.
/// - `403 Forbidden`: the caller is not assigned to the task.
/// - `404 Not Found`: task or target user missing.
#[delete("/{task_id}/users/{user_id}")]
pub async fn remove_user_from_task(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    path: web::Path<(i32, i32)>,
) -> Result<impl Responder, AppError> {
    let (task_id, user_id) = path.into_inner();
    let task = fetch_task_for(&pool, task_id, auth.id()).await?;
    let user = fetch_user(&pool, user_id).await?;

    let result = sqlx::query("DELETE FROM user_tasks WHERE user_id = $1 AND task_id = $2")
        .bind(user.id)
        .bind(task.id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest("User not assigned to this task".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}
