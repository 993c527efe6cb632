use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Path},
    http::{header, request::Parts, HeaderMap},
};

use crate::{
    auth::TokenService,
    error::{AppError, AuthError},
};

const BEARER_PREFIX: &str = "Bearer ";

/// Identity decoded from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
}

/// Checks the `Authorization` header of a single request. No state survives between calls.
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<Principal, AuthError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::MissingToken)?;

    let claims = tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        AuthError::InvalidToken
    })?;

    Ok(Principal {
        user_id: claims.user_id,
        email: claims.email,
    })
}

pub struct CurrentUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);
        let principal = authenticate(&parts.headers, &tokens)?;
        Ok(CurrentUser(principal))
    }
}

/// `/tasks/:id` segment, accepted only as a positive integer.
pub struct TaskId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for TaskId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::InvalidId)?;
        parse_task_id(&raw).map(TaskId).ok_or(AppError::InvalidId)
    }
}

fn parse_task_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

/// `Json` whose rejections render as our 400 validation body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
