//! Authenticated session wrapper.
//!
//! The session caches when it last authenticated against the provider. The
//! unset stamp is the "never/force" sentinel: the next wrapped call
//! authenticates first. A wrapped call that comes back `Unauthorized`
//! clears the stamp, re-authenticates, and retries exactly once; every
//! other failure surfaces unchanged, rate limiting included.
//!
//! One session instance serves one logical connector instance; the stamp is
//! instance-confined behind a lock, not shared process state.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use emusync_connector::error::{ConnectorError, ConnectorResult};
use emusync_connector::secret::SecretString;

use crate::transport::{RestRequest, Transport};

/// Session/token lifecycle wrapper around a transport.
pub struct AuthenticatedSession {
    transport: Arc<dyn Transport>,
    /// Credentialed liveness request used by `authenticate` and `test`.
    ping: RestRequest,
    token: SecretString,
    last_authenticated: RwLock<Option<DateTime<Utc>>>,
}

impl AuthenticatedSession {
    /// Create a session that validates itself with the given GET request.
    ///
    /// The ping request must already carry the provider headers; the session
    /// adds the bearer credential.
    pub fn new(transport: Arc<dyn Transport>, ping: RestRequest, token: SecretString) -> Self {
        Self {
            transport,
            ping,
            token,
            last_authenticated: RwLock::new(None),
        }
    }

    /// The `Authorization` header value for requests under this session.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token.expose())
    }

    /// When the session last authenticated, if ever.
    pub async fn last_authenticated(&self) -> Option<DateTime<Utc>> {
        *self.last_authenticated.read().await
    }

    /// Reset the stamp to the never/force sentinel.
    pub async fn invalidate(&self) {
        *self.last_authenticated.write().await = None;
    }

    /// Validate the credential against the provider and stamp the time.
    pub async fn authenticate(&self) -> ConnectorResult<()> {
        debug!(url = %self.ping.url(), "authenticating session");
        let request = self
            .ping
            .clone()
            .with_header("Authorization", self.authorization());
        self.transport.send(&request).await?.error_for_status()?;
        *self.last_authenticated.write().await = Some(Utc::now());
        Ok(())
    }

    /// Authenticate only when the sentinel says the session never has.
    pub async fn ensure_authenticated(&self) -> ConnectorResult<()> {
        if self.last_authenticated.read().await.is_none() {
            self.authenticate().await?;
        }
        Ok(())
    }

    /// Run a remote call under this session.
    ///
    /// The closure is invoked at most twice: once after the sentinel check,
    /// and once more only if the first attempt was rejected as unauthorized
    /// and re-authentication succeeded.
    pub async fn with_auth<T, F, Fut>(&self, call: F) -> ConnectorResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ConnectorResult<T>>,
    {
        self.ensure_authenticated().await?;

        match call().await {
            Ok(value) => Ok(value),
            Err(ConnectorError::Unauthorized { message }) => {
                warn!(message = %message, "session rejected, re-authenticating once");
                self.invalidate().await;
                self.authenticate().await?;
                call().await
            }
            Err(other) => Err(other),
        }
    }

    /// Lightweight liveness check against the provider.
    pub async fn test(&self) -> ConnectorResult<()> {
        let request = self
            .ping
            .clone()
            .with_header("Authorization", self.authorization());
        self.transport.send(&request).await?.error_for_status()?;
        Ok(())
    }
}

impl std::fmt::Debug for AuthenticatedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedSession")
            .field("ping", self.ping.url())
            .field("token", &self.token)
            .finish()
    }
}
