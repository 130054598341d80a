//! The session gate: whether a user is signed in, and with which credential.
//!
//! The state starts as `Unknown` and settles on `Authenticated` or `Unauthenticated` once
//! `initialize` has checked the stored credential with the server. Every transition is published
//! on a `watch` channel so that the data store can clear or reload its collections.

mod storage;

pub use storage::{FileStorage, MemoryStorage, Storage};

use crate::api::{AuthGrant, Client, TokenCell};
use crate::error::ApiError;
use crate::model::{RegisterRequest, User};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Storage key of the bearer credential.
pub const TOKEN_KEY: &str = "authToken";
/// Storage key of the JSON profile of the signed-in user.
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum SessionState {
    /// The stored credential, if any, has not been checked yet.
    #[default]
    Unknown,
    Authenticated(User),
    Unauthenticated,
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

pub struct Session {
    client: Client,
    storage: Arc<dyn Storage>,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.state.borrow())
            .field("generation", &self.generation())
            .finish()
    }
}

impl Session {
    /// The session writes the credential into the token cell of `client`'s transport.
    pub fn new(client: Client, storage: Arc<dyn Storage>) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            client,
            storage,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Resolves the `Unknown` state. Without a stored credential the session is unauthenticated.
    /// Otherwise the server is asked who the credential belongs to, and any failure discards it.
    pub async fn initialize(&self) -> SessionState {
        let stored = match self.storage.get(TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Unable to read the stored session: {e:#}");
                None
            }
        };
        let Some(token) = stored else {
            debug!("No stored credential");
            self.clear_local().await;
            return self.state();
        };

        self.token().set(Some(token));
        match self.client.me().await {
            Ok(user) => {
                self.persist_user(&user).await;
                info!("Signed in as {}", user.email);
                self.publish(SessionState::Authenticated(user));
            }
            Err(e) => {
                info!("The stored session could not be confirmed: {e}");
                self.clear_local().await;
            }
        }
        self.state()
    }

    /// Signs in. On failure the session is left as it was and the error is returned unchanged.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let grant = self.client.login(email, password).await?;
        Ok(self.install(grant).await)
    }

    /// Opens a new account and signs in to it.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let grant = self.client.register(request).await?;
        Ok(self.install(grant).await)
    }

    /// Revokes the credential on the server if possible, then always signs out locally.
    pub async fn logout(&self) {
        if self.token().is_present() {
            if let Err(e) = self.client.logout().await {
                warn!("Unable to revoke the session on the server: {e}");
            }
        }
        self.clear_local().await;
        info!("Signed out");
    }

    /// Signs out locally after the server rejected the credential. No request is made.
    pub async fn expire(&self) {
        if self.state().is_authenticated() || self.token().is_present() {
            info!("The session has expired");
        }
        self.clear_local().await;
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// True until `initialize` has resolved the stored credential.
    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Unknown)
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Incremented on every transition, including a sign-in that replaces another sign-in. Work
    /// started under one generation must not be applied under another.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> &TokenCell {
        self.client.transport().token()
    }

    async fn install(&self, grant: AuthGrant) -> User {
        let AuthGrant { user, token } = grant;
        self.token().set(Some(token.clone()));
        if let Err(e) = self.storage.set(TOKEN_KEY, &token).await {
            warn!("Unable to store the session credential: {e:#}");
        }
        self.persist_user(&user).await;
        info!("Signed in as {}", user.email);
        self.publish(SessionState::Authenticated(user.clone()));
        user
    }

    async fn persist_user(&self, user: &User) {
        let json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                warn!("Unable to serialize the user profile: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.set(USER_KEY, &json).await {
            warn!("Unable to store the user profile: {e:#}");
        }
    }

    async fn clear_local(&self) {
        self.token().set(None);
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                warn!("Unable to remove '{key}' from the session storage: {e:#}");
            }
        }
        self.publish(SessionState::Unauthenticated);
    }

    fn publish(&self, state: SessionState) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(state);
    }
}
