use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use dotenvy::dotenv;
use std::env;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod state;
mod validation;


use config::Config;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::tasks::get_tasks,
        handlers::tasks::create_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task
    ),
    components(
        schemas(
            models::PublicUser,
            models::RegisterRequest,
            models::RegisterResponse,
            models::LoginRequest,
            models::LoginResponse,
            models::TaskStatus,
            models::Task,
            models::CreateTask,
            models::UpdateTask,
            models::TaskList,
            models::TaskEnvelope,
            models::MessageResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "tasks", description = "Per-user task management")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info,taskboard_api=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Refuse to start without a signing secret
    let config = Config::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let pool = db::establish_connection(&config.database_url, config.max_connections)
        .await
        .context("failed to open database")?;

    let app = create_app(AppState::new(pool, &config.jwt));

    tracing::info!("listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes
        .route("/", get(|| async { "Task API is running!" }))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        // Protected routes
        .route(
            "/tasks",
            get(handlers::tasks::get_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            put(handlers::tasks::update_task).delete(handlers::tasks::delete_task),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
