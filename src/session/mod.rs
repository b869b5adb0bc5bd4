//! Cookie-correlated session tracking.
//!
//! This module provides an in-memory registry that correlates requests with
//! sessions through a cookie. Sessions are identified by a random opaque id
//! and expire a fixed time after creation.
//!
//! # Architecture
//!
//! - [`Session`]: A single client session
//! - [`SessionRegistry`]: Thread-safe store for all live sessions
//! - [`SessionSettings`]: Lifetime and cookie attributes shared by all sessions
//!
//! # Example
//!
//! ```rust
//! use axum::http::{HeaderMap, HeaderValue, header};
//! use cookie_sessions::session::{SessionRegistry, SessionSettings};
//!
//! let registry = SessionRegistry::new(SessionSettings::default());
//!
//! // No cookie: a new session is created.
//! let session = registry.sync_session(&HeaderMap::new());
//! assert!(session.cookie_directive().starts_with("id="));
//!
//! // The client sends the cookie back and gets the same session.
//! let mut headers = HeaderMap::new();
//! let cookie = format!("id={}", session.id());
//! headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
//! assert!(registry.sync_session(&headers).ptr_eq(&session));
//! ```

mod id;
mod registry;
mod settings;

pub use registry::{Session, SessionLookup, SessionRegistry};
pub use settings::{
    DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE_SECS, DEFAULT_SWEEP_INTERVAL, MAX_MAX_AGE_SECS,
    SessionSettings, SettingsError,
};
