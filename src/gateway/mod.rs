use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::RunnerError;
use crate::repo::{Repository, RepositoryManager};
use crate::runner::{JobRunner, Task};

#[derive(Clone)]
pub struct GatewayState {
    pub jobs: JobRunner,
    pub repos: RepositoryManager,
    /// Remote name used when a create request leaves it out
    pub default_remote: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRepositoryRequest {
    pub url: String,
    #[serde(default)]
    pub remote_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitTaskRequest {
    pub command: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTaskResponse {
    pub id: Uuid,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct RepositoryErrorResponse {
    error: String,
    repository: Repository,
}

impl RunnerError {
    fn status_code(&self) -> StatusCode {
        match self {
            RunnerError::TaskNotFound(_) | RunnerError::RepositoryNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            RunnerError::Validation(_) | RunnerError::Sync(_) => StatusCode::BAD_REQUEST,
            RunnerError::Execution(_)
            | RunnerError::InvalidTransition { .. }
            | RunnerError::Persistence(_)
            | RunnerError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RunnerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for RunnerError {
    fn from(rejection: JsonRejection) -> Self {
        RunnerError::Validation(rejection.body_text())
    }
}

fn parse_id(raw: &str) -> Result<Uuid, RunnerError> {
    Uuid::parse_str(raw).map_err(|_| RunnerError::Validation(format!("invalid id: {}", raw)))
}

/// Run a store-backed call on the blocking pool.
async fn off_runtime<T, F>(f: F) -> Result<T, RunnerError>
where
    F: FnOnce() -> Result<T, RunnerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Build the HTTP router over the given state.
pub fn router(state: GatewayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/repo/create", post(create_repository_handler))
        .route("/repo/pull/:id", post(pull_repository_handler))
        .route("/repo/status", get(list_repositories_handler))
        .route("/repo/status/:id", get(repository_status_handler))
        .route("/task/submit", post(submit_task_handler))
        .route("/task/status", get(list_tasks_handler))
        .route("/task/status/:id", get(task_status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the gateway on `addr` until `shutdown` is cancelled.
pub async fn run_gateway(
    addr: SocketAddr,
    state: GatewayState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Starting HTTP gateway");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_repository_handler(
    State(state): State<GatewayState>,
    payload: Result<Json<CreateRepositoryRequest>, JsonRejection>,
) -> Result<Response, RunnerError> {
    let Json(payload) = payload?;
    let remote_name = payload
        .remote_name
        .unwrap_or_else(|| state.default_remote.clone());

    let outcome = state.repos.create(&payload.url, &remote_name).await?;
    match outcome.error {
        None => Ok(Json(outcome.repository).into_response()),
        Some(e) => Ok((
            e.status_code(),
            Json(RepositoryErrorResponse {
                error: e.to_string(),
                repository: outcome.repository,
            }),
        )
            .into_response()),
    }
}

async fn pull_repository_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Repository>, RunnerError> {
    let id = parse_id(&id)?;
    Ok(Json(state.repos.pull(id).await?))
}

async fn repository_status_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Repository>, RunnerError> {
    let id = parse_id(&id)?;
    let repos = state.repos;
    Ok(Json(off_runtime(move || repos.status(id)).await?))
}

async fn list_repositories_handler(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<Repository>>, RunnerError> {
    let repos = state.repos;
    Ok(Json(off_runtime(move || repos.all()).await?))
}

async fn submit_task_handler(
    State(state): State<GatewayState>,
    payload: Result<Json<SubmitTaskRequest>, JsonRejection>,
) -> Result<Json<SubmitTaskResponse>, RunnerError> {
    let Json(payload) = payload?;
    let jobs = state.jobs;
    let task = off_runtime(move || jobs.submit(&payload.command)).await?;
    Ok(Json(SubmitTaskResponse { id: task.id }))
}

async fn list_tasks_handler(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<Task>>, RunnerError> {
    let jobs = state.jobs;
    off_runtime(move || jobs.all()).await.map(Json)
}

async fn task_status_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, RunnerError> {
    let id = parse_id(&id)?;
    let jobs = state.jobs;
    off_runtime(move || jobs.status(id)).await.map(Json)
}
