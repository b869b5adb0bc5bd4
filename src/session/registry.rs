//! Session entities and the registry that owns them.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::id;
use super::settings::SessionSettings;
use crate::cookie::{self, CookieSource};

/// A single client session.
///
/// Cloning is cheap and yields another handle to the same session, so a
/// login flag set through one handle is visible through every other.
#[derive(Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Opaque identifier, also the registry key.
    id: String,
    /// Set by authentication logic outside this crate.
    logged_in: AtomicBool,
    /// `Set-Cookie` value issued when the session was created.
    cookie_directive: String,
    created_at: DateTime<Utc>,
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Session {
    fn new(id: String, settings: &SessionSettings) -> Self {
        let cookie_directive = settings.directive(&id);
        Self {
            inner: Arc::new(SessionInner {
                id,
                logged_in: AtomicBool::new(false),
                cookie_directive,
                created_at: Utc::now(),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.inner.logged_in.load(Ordering::Acquire)
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.inner.logged_in.store(logged_in, Ordering::Release);
    }

    /// The `Set-Cookie` header value to attach to the response.
    #[must_use]
    pub fn cookie_directive(&self) -> &str {
        &self.inner.cookie_directive
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Whether both handles refer to the same session.
    #[must_use]
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Outcome of correlating a request with the registry.
#[derive(Debug, Clone)]
pub enum SessionLookup {
    /// The request named a live session.
    Existing(Session),
    /// A new session was registered; its cookie must be sent to the client.
    Created(Session),
}

impl SessionLookup {
    #[must_use]
    pub fn session(&self) -> &Session {
        match self {
            Self::Existing(session) | Self::Created(session) => session,
        }
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        match self {
            Self::Existing(session) | Self::Created(session) => session,
        }
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Registry slot: the session plus the instant it stops being valid.
#[derive(Debug)]
struct Slot {
    session: Session,
    expires_at: Instant,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type SessionMap = HashMap<String, Slot>;

/// Thread-safe registry of live sessions.
///
/// Every session expires a fixed time after creation; activity does not
/// extend it. Expired sessions are invisible to lookups immediately and are
/// evicted by [`SessionRegistry::purge_expired`], which the sweeper task
/// started by [`SessionRegistry::spawn_sweeper`] calls periodically.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    sessions: RwLock<SessionMap>,
    settings: SessionSettings,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: RwLock::new(HashMap::new()),
                settings,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    /// Return the session named by the request's cookie, or a new one.
    ///
    /// Never fails: a missing header, a malformed header and an unknown or
    /// expired id all lead to a freshly registered session.
    pub fn sync_session<S>(&self, request: &S) -> Session
    where
        S: CookieSource + ?Sized,
    {
        self.resolve(request).into_session()
    }

    /// Like [`SessionRegistry::sync_session`], but reports whether the
    /// session was created by this call.
    pub fn resolve<S>(&self, request: &S) -> SessionLookup
    where
        S: CookieSource + ?Sized,
    {
        let header = request.cookie_header();
        let Some(pairs) = cookie::parse(header.as_deref()) else {
            return SessionLookup::Created(self.create_session());
        };

        let existing = cookie::find(&pairs, self.settings().name()).and_then(|id| self.get(id));
        match existing {
            Some(session) => SessionLookup::Existing(session),
            None => SessionLookup::Created(self.create_session()),
        }
    }

    /// Create and register a session with a fresh random id.
    pub fn create_session(&self) -> Session {
        let settings = self.settings();
        let expires_at = Instant::now() + settings.max_age();

        let session = {
            let mut guard = self.write();
            loop {
                // A collision is practically impossible; never overwrite on one.
                if let Entry::Vacant(vacant) = guard.entry(id::generate()) {
                    let session = Session::new(vacant.key().clone(), settings);
                    vacant.insert(Slot {
                        session: session.clone(),
                        expires_at,
                    });
                    break session;
                }
            }
        };

        debug!(
            name: "session.created",
            max_age_secs = settings.max_age_secs(),
            "Session created"
        );
        session
    }

    /// Get a live session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        self.read()
            .get(id)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.session.clone())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Remove a session by ID. Returns `false` if there was nothing to remove.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.write().remove(id).is_some();
        if removed {
            debug!(name: "session.deleted", "Session deleted");
        }
        removed
    }

    /// Get the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.read().values().filter(|slot| slot.is_live(now)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// List all live session IDs.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let now = Instant::now();
        self.read()
            .iter()
            .filter(|(_, slot)| slot.is_live(now))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Evict every expired session.
    ///
    /// Returns the number of sessions removed.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    /// Start a task that calls [`SessionRegistry::purge_expired`] once per
    /// sweep interval.
    ///
    /// The task holds no strong reference to the registry and finishes on
    /// its own once every handle has been dropped. Must be called from
    /// within a tokio runtime.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let registry = Arc::downgrade(&self.inner);
        let period = self.settings().sweep_period();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = registry.upgrade() else {
                    break;
                };
                inner.purge_expired();
            }
            debug!(name: "session.sweeper.stopped", "Session sweeper stopped");
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionMap> {
        self.inner.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionMap> {
        self.inner.write()
    }
}

impl RegistryInner {
    fn read(&self) -> RwLockReadGuard<'_, SessionMap> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionMap> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.write();
        let before = guard.len();
        guard.retain(|_, slot| slot.is_live(now));
        let removed = before - guard.len();
        let remaining = guard.len();
        drop(guard);

        if removed > 0 {
            info!(
                name: "session.expired",
                removed,
                remaining,
                "Expired sessions evicted"
            );
        }
        removed
    }
}
