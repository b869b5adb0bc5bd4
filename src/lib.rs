//! Cookie Sessions
//!
//! Server-side session tracking correlated to an HTTP cookie: each request
//! either resumes the session named by its cookie or starts a new one, and
//! new sessions come with the `Set-Cookie` value to send back.
//!
//! # Architecture
//!
//! - **Cookie parsing**: pure `Cookie` header parsing
//! - **Session registry**: id-keyed store with fixed-lifetime expiration
//! - **Server**: Axum wiring that resolves a session for every request
//!
//! # Modules
//!
//! - [`cookie`]: `Cookie` header parser
//! - [`session`]: Sessions and the session registry
//! - [`config`]: Layered configuration loading
//! - [`server`]: HTTP routes and middleware

pub mod config;
pub mod cookie;
pub mod server;
pub mod session;
pub mod telemetry;

use session::SessionRegistry;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry of live sessions.
    pub sessions: SessionRegistry,
}
