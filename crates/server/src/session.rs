//! Auth session context.
//!
//! The identity provider itself is an external service; this module
//! owns the session state for one running frontend and publishes
//! changes over a watch channel instead of a module-level singleton
//! with a hand-rolled subscriber list. Handlers only ever ask
//! "authenticated or not".

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account already exists for {0}")]
    AlreadyRegistered(String),

    #[error("identity provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn { user_id: String, email: String },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn { .. })
    }
}

/// External identity provider surface: sign-in, sign-up, sign-out,
/// password reset. Session subscription is handled locally by
/// [`SessionContext`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AuthError>;
    async fn reset_password(&self, email: &str) -> Result<(), AuthError>;
}

/// Explicit session object owned by app state and passed to handlers.
pub struct SessionContext {
    provider: Box<dyn IdentityProvider>,
    tx: watch::Sender<AuthState>,
}

impl SessionContext {
    pub fn new(provider: Box<dyn IdentityProvider>) -> Self {
        let (tx, _) = watch::channel(AuthState::SignedOut);
        Self { provider, tx }
    }

    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    /// Watch receiver for session changes; replaces the original's
    /// static subscriber list.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthState, AuthError> {
        let user_id = self.provider.sign_in(email, password).await?;
        let state = AuthState::SignedIn {
            user_id,
            email: email.to_string(),
        };
        self.tx.send_replace(state.clone());
        Ok(state)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthState, AuthError> {
        let user_id = self.provider.sign_up(email, password).await?;
        let state = AuthState::SignedIn {
            user_id,
            email: email.to_string(),
        };
        self.tx.send_replace(state.clone());
        Ok(state)
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(AuthState::SignedOut);
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.provider.reset_password(email).await
    }
}

/// In-memory provider used by tests and local development.
#[derive(Default)]
pub struct StaticIdentityProvider {
    users: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let users = self.users.lock().unwrap();
        match users.get(email) {
            Some(stored) if stored == password => Ok(format!("user-{email}")),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(AuthError::AlreadyRegistered(email.to_string()));
        }
        users.insert(email.to_string(), password.to_string());
        Ok(format!("user-{email}"))
    }

    async fn reset_password(&self, _email: &str) -> Result<(), AuthError> {
        Ok(())
    }
}
