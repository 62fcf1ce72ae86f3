//! Authenticated sessions.
//!
//! A [`SessionManager`] establishes the session lazily on first use and
//! hands out cheap clones of it afterwards. Authentication is repeated only
//! when the caller forces a reload.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::backend::{Authenticator, Provider};
use crate::error::{DispatchError, DispatchResult, ServiceError};

/// Authenticated handle to the remote service.
pub struct Session<C> {
    provider: Arc<dyn Provider<C>>,
    established_at: DateTime<Utc>,
}

impl<C> Session<C> {
    /// Wrap an authenticated provider.
    pub fn new(provider: Arc<dyn Provider<C>>) -> Self {
        Self {
            provider,
            established_at: Utc::now(),
        }
    }

    /// The account's provider.
    pub fn provider(&self) -> &dyn Provider<C> {
        self.provider.as_ref()
    }

    /// When authentication completed.
    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }
}

impl<C> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            established_at: self.established_at,
        }
    }
}

impl<C> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.provider.name())
            .field("established_at", &self.established_at)
            .finish()
    }
}

/// Caches one [`Session`] per manager.
pub struct SessionManager<C> {
    authenticator: Arc<dyn Authenticator<C>>,
    current: Mutex<Option<Session<C>>>,
}

impl<C> SessionManager<C> {
    /// Create a manager; no remote call is made until the first
    /// [`ensure_session`](Self::ensure_session).
    pub fn new(authenticator: Arc<dyn Authenticator<C>>) -> Self {
        Self {
            authenticator,
            current: Mutex::new(None),
        }
    }

    /// Return the cached session, authenticating if there is none or if
    /// `force_reload` is set.
    ///
    /// Authentication failures become [`DispatchError::Authentication`],
    /// whose message tells the operator how to register and persist a
    /// credential. Other service failures propagate unchanged.
    pub async fn ensure_session(&self, force_reload: bool) -> DispatchResult<Session<C>> {
        let mut current = self.current.lock().await;
        if !force_reload {
            if let Some(session) = current.as_ref() {
                return Ok(session.clone());
            }
        }

        debug!(force_reload, "authenticating");
        let provider = self
            .authenticator
            .authenticate()
            .await
            .map_err(|e| match e {
                ServiceError::Authentication(reason) => DispatchError::authentication(reason),
                other => DispatchError::Service(other),
            })?;

        let session = Session::new(provider);
        info!(provider = session.provider().name(), "session established");
        *current = Some(session.clone());
        Ok(session)
    }

    /// Drop the cached session; the next call re-authenticates.
    pub async fn invalidate(&self) {
        self.current.lock().await.take();
    }

    /// Whether a session is currently cached.
    pub async fn is_established(&self) -> bool {
        self.current.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{REGISTER_STEP, SAVE_CREDENTIAL_STEP};
    use crate::memory::{Circuit, InMemoryService, MemoryBackend};

    fn service() -> Arc<InMemoryService> {
        Arc::new(InMemoryService::new().with_backend(MemoryBackend::simulator("sim")))
    }

    #[tokio::test]
    async fn test_session_is_reused() {
        let service = service();
        let manager: SessionManager<Circuit> = SessionManager::new(service.clone());

        let first = manager.ensure_session(false).await.unwrap();
        let second = manager.ensure_session(false).await.unwrap();

        assert_eq!(service.auth_calls(), 1);
        assert_eq!(first.established_at(), second.established_at());
    }

    #[tokio::test]
    async fn test_force_reload_authenticates_again() {
        let service = service();
        let manager: SessionManager<Circuit> = SessionManager::new(service.clone());

        manager.ensure_session(false).await.unwrap();
        manager.ensure_session(true).await.unwrap();
        assert_eq!(service.auth_calls(), 2);

        manager.invalidate().await;
        assert!(!manager.is_established().await);
        manager.ensure_session(false).await.unwrap();
        assert_eq!(service.auth_calls(), 3);
    }

    #[tokio::test]
    async fn test_authentication_failure_is_actionable() {
        let service = Arc::new(InMemoryService::new().with_required_token("secret"));
        let manager: SessionManager<Circuit> = SessionManager::new(service);

        let err = manager.ensure_session(false).await.unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, DispatchError::Authentication { .. }));
        assert!(msg.contains(REGISTER_STEP));
        assert!(msg.contains(SAVE_CREDENTIAL_STEP));
        assert!(!manager.is_established().await);
    }
}
