use axum::{
    Extension, Json, Router,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::AppState;
use crate::config::AppConfig;
use crate::cookie::{self, CookieSource};
use crate::session::{Session, SessionRegistry};

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let settings = config.session_settings()?;
    info!(
        name: "session.config.loaded",
        max_age_secs = settings.max_age_secs(),
        cookie_name = %settings.name(),
        secure = settings.is_secure(),
        "Session configuration loaded"
    );

    let sessions = SessionRegistry::new(settings);
    let sweeper = sessions.spawn_sweeper();

    let state = AppState { sessions };
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

/// Build the application router.
///
/// `/` and `/api/session` run behind [`session_middleware`]. `/logout` and
/// unmatched paths never create a session.
pub fn router(state: AppState) -> Router {
    let with_session = Router::new()
        .route("/", get(index))
        .route("/api/session", get(api_get_session))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .route("/logout", post(logout))
        .merge(with_session)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Middleware that attaches the request's [`Session`] to its extensions.
///
/// When the session was created for this request, the response carries its
/// `Set-Cookie` directive.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let lookup = state.sessions.resolve(&request);
    let session = lookup.session().clone();
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if lookup.is_created() {
        match HeaderValue::from_str(session.cookie_directive()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Session cookie is not a valid header value: {e}"),
        }
    }
    response
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Plain-text greeting.
async fn index(Extension(session): Extension<Session>) -> String {
    format!("Hello, session {}\n", session.id())
}

/// Session DTO for API responses.
#[derive(Debug, Serialize)]
struct SessionDto {
    id: String,
    is_logged_in: bool,
    created_at: DateTime<Utc>,
}

impl From<&Session> for SessionDto {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id().to_string(),
            is_logged_in: session.is_logged_in(),
            created_at: session.created_at(),
        }
    }
}

/// GET /api/session - Describe the current session.
async fn api_get_session(Extension(session): Extension<Session>) -> Json<SessionDto> {
    Json(SessionDto::from(&session))
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// POST /logout - Drop the session named by the cookie and clear the cookie.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let settings = state.sessions.settings();
    let raw = headers.cookie_header();
    let pairs = cookie::parse(raw.as_deref()).unwrap_or_default();

    if let Some(id) = cookie::find(&pairs, settings.name()) {
        state.sessions.delete(id);
    }

    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, settings.removal_directive())],
    )
}
