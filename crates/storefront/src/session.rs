//! Session resolution.
//!
//! The store owns the session (a cookie); the client only knows whether the
//! last resolution found a user. [`SessionStore`] publishes that knowledge as
//! a [`SessionState`] and shares one outstanding resolution between every
//! caller, so a navigation that checks several routes fetches the session
//! once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use shopease_core::{LoginCredentials, NewUser, SessionUser, Validate, ValidationError};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{info, instrument, warn};

use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::gateway::{GatewayError, Method, encode};
use crate::queries::{QueryCache, QueryKey};

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const LOGOUT_PATH: &str = "/api/auth/logout";

/// Where session resolution stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// A session fetch is outstanding (or none has completed yet).
    #[default]
    Resolving,
    /// The session is known: a user, or `None` for anonymous.
    Resolved(Option<SessionUser>),
}

impl SessionState {
    /// The resolved user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&SessionUser> {
        match self {
            Self::Resolved(Some(user)) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_resolving(&self) -> bool {
        matches!(self, Self::Resolving)
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Resolved(Some(user)) if user.is_admin)
    }
}

/// Errors from login, registration and logout.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Input failed local validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store refused the request (bad credentials, taken username).
    #[error("{0}")]
    Rejected(String),

    /// The request could not be completed.
    #[error("Session request failed: {0}")]
    Remote(#[from] GatewayError),
}

impl SessionError {
    fn from_gateway(err: GatewayError) -> Self {
        match err.status() {
            Some(status) if (400..500).contains(&status) => Self::Rejected(err.user_message()),
            _ => Self::Remote(err),
        }
    }
}

/// Cached, invalidatable view of the current session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    queries: QueryCache,
    state: watch::Sender<SessionState>,
    /// Bumped by every invalidation; a resolution that started under an
    /// older generation must not publish its result.
    generation: AtomicU64,
    resolving: Mutex<()>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new(queries: QueryCache) -> Self {
        let (state, _) = watch::channel(SessionState::Resolving);
        Self {
            inner: Arc::new(SessionInner {
                queries,
                state,
                generation: AtomicU64::new(0),
                resolving: Mutex::new(()),
            }),
        }
    }

    /// The current state, without I/O.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Resolve the session, performing or joining the fetch.
    ///
    /// A failed fetch resolves to anonymous.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> Option<SessionUser> {
        if let SessionState::Resolved(user) = self.state() {
            return user;
        }

        let _resolving = self.inner.resolving.lock().await;
        let mut stale = false;
        loop {
            if let SessionState::Resolved(user) = self.state() {
                return user;
            }

            let generation = self.inner.generation.load(Ordering::Acquire);
            let fetched = if stale {
                self.inner.queries.refetch_session().await
            } else {
                self.inner.queries.session().await
            };
            let user = fetched.unwrap_or_else(|err| {
                warn!(error = %err, "Session fetch failed, treating as anonymous");
                None
            });

            if self.inner.generation.load(Ordering::Acquire) == generation {
                self.inner
                    .state
                    .send_replace(SessionState::Resolved(user.clone()));
                return user;
            }
            stale = true;
        }
    }

    /// Drop the cached session and return to [`SessionState::Resolving`].
    pub async fn invalidate(&self) {
        self.inner.queries.invalidate(QueryKey::Session).await;
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.state.send_replace(SessionState::Resolving);
    }

    /// Log in, then re-resolve the session.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank fields (nothing sent), `Rejected` when
    /// the store refuses the credentials, `Remote` otherwise.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<SessionUser, SessionError> {
        credentials.validate()?;
        self.post(LOGIN_PATH, encode(credentials)?).await?;
        let user = self.after_auth_change().await?;

        set_sentry_user(&user.id, Some(&user.username));
        add_breadcrumb("auth", "Logged in", None);
        info!(user_id = %user.id, "Logged in");
        Ok(user)
    }

    /// Create an account (which also starts a session).
    ///
    /// # Errors
    ///
    /// Same as [`SessionStore::login`].
    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    pub async fn register(&self, new_user: &NewUser) -> Result<SessionUser, SessionError> {
        new_user.validate()?;
        self.post(REGISTER_PATH, encode(new_user)?).await?;
        let user = self.after_auth_change().await?;

        set_sentry_user(&user.id, Some(&user.username));
        add_breadcrumb("auth", "Registered", None);
        info!(user_id = %user.id, "Registered");
        Ok(user)
    }

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the store cannot be reached. The cached session is
    /// dropped either way.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), SessionError> {
        let result = self.post(LOGOUT_PATH, serde_json::Value::Null).await;
        self.invalidate_identity().await;
        clear_sentry_user();
        add_breadcrumb("auth", "Logged out", None);
        result?;

        let _ = self.resolve().await;
        info!("Logged out");
        Ok(())
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), SessionError> {
        let body = (!body.is_null()).then_some(body);
        self.inner
            .queries
            .gateway()
            .request(Method::Post, path, body)
            .await
            .map(drop)
            .map_err(SessionError::from_gateway)
    }

    /// Session and cart both belong to the old identity.
    async fn invalidate_identity(&self) {
        self.invalidate().await;
        self.inner.queries.invalidate(QueryKey::Cart).await;
    }

    async fn after_auth_change(&self) -> Result<SessionUser, SessionError> {
        self.invalidate_identity().await;
        self.resolve()
            .await
            .ok_or_else(|| SessionError::Rejected("The store did not start a session".to_string()))
    }
}
