//! HTTP surface: routing, middleware and the JSON envelope.

mod goals;
pub mod middleware;
pub mod response;
mod study;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::http::{Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::Response;
use axum::routing::{delete, get, patch, put};
use axum::Router;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::net::TcpListener;

use crate::app::App;
use crate::auth::TokenSigner;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::rate_limit::RateLimiter;
use middleware::{
    cors_middleware, rate_limit_middleware, request_tracing_middleware, require_auth, Owner,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<ServerConfig>,
    pub tokens: Arc<TokenSigner>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: ServerConfig) -> Result<Self, AppError> {
        let tokens = TokenSigner::new(&config.token_secret)?;
        Ok(Self {
            db,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            limiter: Arc::new(RateLimiter::default()),
        })
    }

    fn app(&self, owner: Owner) -> App {
        App::new(self.db.clone(), owner.0)
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/goals/daily",
            get(goals::list_daily_goals).post(goals::create_daily_goal),
        )
        .route(
            "/goals/daily/:id",
            put(goals::update_daily_goal).delete(goals::delete_daily_goal),
        )
        .route("/goals/daily/:id/toggle", patch(goals::toggle_daily_goal))
        .route(
            "/goals/monthly",
            get(goals::list_monthly_plans).post(goals::create_monthly_plan),
        )
        .route(
            "/goals/monthly/:id",
            put(goals::edit_monthly_plan)
                .patch(goals::set_monthly_plan_completion)
                .delete(goals::delete_monthly_plan),
        )
        .route(
            "/goals/monthly/:id/toggle",
            patch(goals::toggle_monthly_plan),
        )
        .route(
            "/sessions",
            get(study::list_sessions).post(study::create_session),
        )
        .route("/sessions/:id", delete(study::delete_session))
        .route(
            "/syllabus",
            get(study::list_syllabus).post(study::create_syllabus_topic),
        )
        .route("/syllabus/:id", delete(study::delete_syllabus_topic))
        .route("/syllabus/:id/toggle", patch(study::toggle_syllabus_topic))
        .route(
            "/resources",
            get(study::list_resources).post(study::create_resource),
        )
        .route("/resources/:id", delete(study::delete_resource))
        .route("/groups", get(study::list_groups).post(study::create_group))
        .route("/groups/:id", delete(study::delete_group))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .route("/health", get(health))
        .method_not_allowed_fallback(method_not_allowed);

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), cors_middleware))
        .layer(from_fn(request_tracing_middleware))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}

/// Serves the router until ctrl-c, exposing peer addresses to the rate
/// limiter.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let router = build_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Response {
    response::ok(Health {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> Response {
    response::failure(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {method} not allowed - {}", uri.path()),
    )
}

async fn not_found(OriginalUri(uri): OriginalUri) -> Response {
    response::failure(StatusCode::NOT_FOUND, format!("Not found - {}", uri.path()))
}
