use axum::{Json, Router, http::StatusCode, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

mod configs;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    problems: Vec<String>,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

pub(crate) struct AppState {
    pub(crate) config_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "./configs".to_owned());
    let addr: SocketAddr = std::env::var("CONFIG_SERVICE_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_owned())
        .parse()?;

    let state = Arc::new(AppState {
        config_dir: PathBuf::from(&config_dir),
    });

    let published = configs::scan(&state.config_dir).await?;
    info!(dir = %config_dir, count = published.len(), "viewer configs available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("config-service listening on {}", addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}

pub(crate) fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/configs", get(configs::list_configs))
        .route("/configs/{name}", get(configs::get_config))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "config-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "config-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(crate) fn bad_request(message: &str) -> ApiError {
    error(StatusCode::BAD_REQUEST, message, Vec::new())
}

pub(crate) fn not_found(message: &str) -> ApiError {
    error(StatusCode::NOT_FOUND, message, Vec::new())
}

pub(crate) fn unprocessable(message: &str, problems: Vec<String>) -> ApiError {
    error(StatusCode::UNPROCESSABLE_ENTITY, message, problems)
}

pub(crate) fn internal_error(err: impl std::fmt::Display) -> ApiError {
    error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string(), Vec::new())
}

fn error(status: StatusCode, message: &str, problems: Vec<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_owned(),
            problems,
        }),
    )
}
