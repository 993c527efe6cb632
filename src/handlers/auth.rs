use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use sqlx::SqlitePool;

use super::blocking;
use crate::{
    auth::{password, TokenService},
    error::{AppError, AuthError},
    middleware::AppJson,
    models::{LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse, User},
};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Invalid data"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(pool): State<SqlitePool>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let new_user = payload.validate()?;

    // 1. Reject duplicates before doing any hashing work
    let existing = sqlx::query("SELECT 1 FROM users WHERE email = ?")
        .bind(&new_user.email)
        .fetch_optional(&pool)
        .await?;

    if existing.is_some() {
        return Err(email_taken());
    }

    // 2. Hash password
    let plaintext = new_user.password;
    let password_hash = blocking(move || password::hash_password(&plaintext)).await??;

    // 3. Insert user
    let user = insert_user(&pool, &new_user.name, &new_user.email, &password_hash).await?;

    tracing::info!(user_id = user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid data"),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(pool): State<SqlitePool>,
    State(tokens): State<Arc<TokenService>>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let credentials = payload.validate()?;

    // 1. Find user. Unknown email and wrong password look the same to the caller.
    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password_hash FROM users WHERE email = ?",
    )
    .bind(&credentials.email)
    .fetch_optional(&pool)
    .await?;

    let Some(user) = user else {
        tracing::debug!("login rejected: unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    // 2. Verify password
    let stored_hash = user.password_hash.clone();
    let plaintext = credentials.password;
    let matches = blocking(move || password::verify_password(&plaintext, &stored_hash)).await??;
    if !matches {
        tracing::debug!(user_id = user.id, "login rejected: password mismatch");
        return Err(AuthError::InvalidCredentials.into());
    }

    // 3. Issue token
    let token = tokens.issue(user.id, &user.email)?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok(Json(LoginResponse {
        token,
        user: PublicUser::from(user),
    }))
}

/// The unique index on `email` still guards against a registration racing past the existence check.
pub(crate) async fn insert_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<PublicUser, AppError> {
    sqlx::query_as::<_, PublicUser>(
        "INSERT INTO users (name, email, password_hash, created_at) VALUES (?, ?, ?, ?)
         RETURNING id, name, email",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => email_taken(),
        other => AppError::SqlxError(other),
    })
}

fn email_taken() -> AppError {
    AppError::Conflict("Email already registered".to_string())
}
