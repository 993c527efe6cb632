use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{auth::TokenService, config::JwtConfig};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: &JwtConfig) -> Self {
        Self {
            pool,
            tokens: Arc::new(TokenService::new(jwt)),
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
