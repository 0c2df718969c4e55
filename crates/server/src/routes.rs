use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use sandbox::{SandboxConfig, SandboxFactory};
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::LimitPolicy;
use crate::error::{ServerError, ServerResult};
use crate::report::{self, ExecuteResponse};
use crate::validate;

#[derive(Clone)]
pub struct AppState {
    pub factory: Arc<dyn SandboxFactory>,
    pub policy: Arc<LimitPolicy>,
    /// Admission semaphore bounding concurrent executions.
    pub permits: Arc<Semaphore>,
}

/// Build the application router.
///
/// Cross-origin access is opt-in: without `allowed_origin` no CORS headers
/// are emitted and browsers stay same-origin.
pub fn router(state: AppState, allowed_origin: Option<&str>) -> ServerResult<Router> {
    let mut router = Router::new()
        .route("/execute", post(execute).options(preflight))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = allowed_origin {
        let origin = origin
            .parse::<HeaderValue>()
            .map_err(|e| ServerError::Internal(format!("invalid allowed origin: {e}")))?;
        router = router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        );
    }

    Ok(router)
}

/// `POST /execute` — validate, run in a fresh session, report.
///
/// Per-request flow: validate → acquire permit → create session → run →
/// destroy (always, including on error) → report. Expected outcomes of the
/// submitted code are 200s; only host-side failures become 500s.
async fn execute(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<ExecuteResponse>> {
    let request = validate::validate(&body, &state.policy)?;

    // Suspend until a slot frees up; other requests keep being served.
    let _permit = state
        .permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ServerError::Internal("admission semaphore closed".into()))?;

    let id = Uuid::new_v4();
    debug!(session_id = %id, code_bytes = request.code.len(), "executing");

    let started = Instant::now();
    let mut session = state.factory.create(SandboxConfig { id }).await?;
    let outcome = session.run(&request).await;
    // Teardown runs on every exit path so a failed run can't leak a session.
    state.factory.destroy(session).await;
    let result = outcome?;

    info!(
        session_id = %id,
        status = %result.status,
        duration_ms = started.elapsed().as_millis() as u64,
        truncated = result.truncated,
        "execution finished"
    );

    Ok(Json(report::report(result)))
}

/// Bare `OPTIONS /execute` (non-preflight) gets an empty 204; real CORS
/// preflights are short-circuited by the `CorsLayer` before reaching here.
async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}
