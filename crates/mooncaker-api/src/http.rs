use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::{ApiError, handler::ApiHandler};

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET  /                   - redirect to the public site
    /// - GET  /healthz            - liveness probe
    /// - POST /api/v1/login       - open an operator session
    /// - POST /api/v1/logout      - close the session (bearer)
    /// - POST /api/v1/console     - run a console command (bearer)
    /// - POST /api/v1/suggestions - mail a user suggestion
    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(redirect::<H>))
            .route("/healthz", get(healthz))
            .route("/api/v1/login", post(login::<H>))
            .route("/api/v1/logout", post(logout::<H>))
            .route("/api/v1/console", post(console::<H>))
            .route("/api/v1/suggestions", post(suggestion::<H>))
            .with_state(self.handler)
    }
}

/// Serve `router` on `bind` until `cancel` fires.
pub async fn serve(
    router: Router,
    bind: SocketAddr,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "admin api listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    info!("admin api stopped");
    Ok(())
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConsoleRequest {
    command: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConsoleResponse {
    response: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SuggestionRequest {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatusResponse {
    status: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
async fn redirect<H>(State(handler): State<Arc<H>>) -> impl IntoResponse
where
    H: ApiHandler,
{
    (
        StatusCode::FOUND,
        [(header::LOCATION, handler.redirect_url().to_string())],
    )
}

/// GET /healthz
async fn healthz() -> impl IntoResponse {
    Json(StatusResponse { status: "ok" })
}

/// POST /api/v1/login
async fn login<H>(
    State(handler): State<Arc<H>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let token = handler.login(&req.username, &req.password).await?;
    Ok(Json(LoginResponse {
        token: token.to_string(),
    }))
}

/// POST /api/v1/logout
async fn logout<H>(
    State(handler): State<Arc<H>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let token = bearer(&headers)?;
    handler.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/console
async fn console<H>(
    State(handler): State<Arc<H>>,
    headers: HeaderMap,
    Json(req): Json<ConsoleRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    handler.authorize(&bearer(&headers)?)?;
    let response = handler.run_command(&req.command).await?;
    Ok(Json(ConsoleResponse { response }))
}

/// POST /api/v1/suggestions
async fn suggestion<H>(
    State(handler): State<Arc<H>>,
    Json(req): Json<SuggestionRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    handler.submit_suggestion(&req.text).await?;
    Ok(Json(StatusResponse { status: "sent" }))
}

/// Session token from `Authorization: Bearer <uuid>`.
fn bearer(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|t| Uuid::parse_str(t.trim()).ok())
        .ok_or(ApiError::Unauthenticated)
}
