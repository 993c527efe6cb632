use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    middleware::{AppJson, CurrentUser, TaskId},
    models::{CreateTask, MessageResponse, Task, TaskEnvelope, TaskList, UpdateTask},
};

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "Caller's tasks, newest first", body = TaskList),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn get_tasks(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<TaskList>, AppError> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user.user_id)
    .fetch_all(&pool)
    .await?;

    tracing::debug!(user = %user.email, count = tasks.len(), "listed tasks");

    Ok(Json(TaskList { tasks }))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created", body = TaskEnvelope),
        (status = 400, description = "Invalid data"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn create_task(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<CreateTask>,
) -> Result<(StatusCode, Json<TaskEnvelope>), AppError> {
    let new_task = payload.validate()?;
    let now = Utc::now();

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (user_id, title, description, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(user.user_id)
    .bind(&new_task.title)
    .bind(&new_task.description)
    .bind(new_task.status)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await?;

    tracing::debug!(user_id = user.user_id, task_id = task.id, "task created");

    Ok((StatusCode::CREATED, Json(TaskEnvelope { task })))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    request_body = UpdateTask,
    responses(
        (status = 200, description = "Task updated", body = TaskEnvelope),
        (status = 400, description = "Invalid ID or data"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Task not found")
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn update_task(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    TaskId(id): TaskId,
    AppJson(payload): AppJson<UpdateTask>,
) -> Result<Json<TaskEnvelope>, AppError> {
    let changes = payload.validate()?;

    let mut tx = pool.begin().await?;

    let mut task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(task_not_found)?;

    changes.apply(&mut task);

    // updated_at moves on every write, even when the patch was empty
    let task = sqlx::query_as::<_, Task>(
        "UPDATE tasks SET title = ?, description = ?, status = ?, updated_at = ?
         WHERE id = ? AND user_id = ?
         RETURNING *",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status)
    .bind(Utc::now())
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(task_not_found)?;

    tx.commit().await?;

    Ok(Json(TaskEnvelope { task }))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = i64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Task not found")
    ),
    security(
        ("bearer" = [])
    )
)]
pub async fn delete_task(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    TaskId(id): TaskId,
) -> Result<Json<MessageResponse>, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(task_not_found());
    }

    tracing::debug!(user_id = user.user_id, task_id = id, "task deleted");

    Ok(Json(MessageResponse {
        message: "Task deleted".to_string(),
    }))
}

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".to_string())
}
