pub mod auth;
pub mod tasks;

use crate::error::AppError;

/// Runs CPU-heavy work (password hashing) off the async workers.
async fn blocking<F, T>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::InternalError(format!("blocking task failed: {e}")))
}
