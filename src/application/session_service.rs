// Session service - explicit session context shared across the process
use crate::application::telemetry_client::{ClientError, TelemetryClient};
use crate::domain::session::{decode_identity, DecodeError, Identity, Role};
use crate::infrastructure::token_store::TokenStore;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Shared cell holding the current opaque token. The HTTP adapter reads it
/// per request; the session service is the only writer.
#[derive(Clone, Default)]
pub struct TokenCell(Arc<RwLock<Option<String>>>);

impl TokenCell {
    pub fn get(&self) -> Option<String> {
        self.0.read().expect("token cell poisoned").clone()
    }

    pub(crate) fn set(&self, token: Option<String>) {
        *self.0.write().expect("token cell poisoned") = token;
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] DecodeError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("credential storage: {0}")]
    Storage(#[from] std::io::Error),
}

/// Process-wide session: the token is the sole source of truth, and the
/// decoded identity moves with it. Constructed once in `main` and injected
/// into everything that needs it.
#[derive(Clone)]
pub struct SessionService {
    token: TokenCell,
    identity: Arc<RwLock<Option<Identity>>>,
    store: TokenStore,
    client: Arc<dyn TelemetryClient>,
}

impl SessionService {
    pub fn new(token: TokenCell, store: TokenStore, client: Arc<dyn TelemetryClient>) -> Self {
        Self {
            token,
            identity: Arc::new(RwLock::new(None)),
            store,
            client,
        }
    }

    /// Restore a persisted token from a prior session. A stored token that
    /// no longer decodes is cleared silently.
    pub async fn rehydrate(&self) -> Result<(), SessionError> {
        let Some(token) = self.store.load().await? else {
            return Ok(());
        };
        if let Err(err) = self.install(&token).await {
            tracing::warn!("discarding persisted credential: {err}");
        }
        Ok(())
    }

    /// Authenticate against the backend and install the issued token.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, SessionError> {
        let response = self.client.login(email, password).await?;
        self.install(&response.token).await
    }

    /// Install a token: decode its identity and persist it. Decode failure
    /// leaves the session unauthenticated with storage cleared.
    pub async fn install(&self, token: &str) -> Result<Identity, SessionError> {
        match decode_identity(token) {
            Ok(identity) => {
                self.token.set(Some(token.to_string()));
                self.set_identity(Some(identity.clone()));
                self.store.save(token).await?;
                Ok(identity)
            }
            Err(err) => {
                self.token.set(None);
                self.set_identity(None);
                self.store.clear().await?;
                Err(err.into())
            }
        }
    }

    /// Clear token, identity, and storage unconditionally.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.token.set(None);
        self.set_identity(None);
        self.store.clear().await?;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.get().is_some()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.read().expect("identity lock poisoned").clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity().map(|i| i.role)
    }

    fn set_identity(&self, identity: Option<Identity>) {
        *self.identity.write().expect("identity lock poisoned") = identity;
    }
}
