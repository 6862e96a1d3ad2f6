//! # Connection Manager
//!
//! Owns the single process-wide connection handle. The handle is
//! established lazily on first demand, and concurrent first callers coalesce
//! on one connect attempt. A failed attempt leaves the cell empty so the
//! next caller retries; a cancelled attempt (caller dropped mid-connect) is
//! picked up by the next waiter.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;

use super::connector::{StoreConnector, StoreSession};
use super::errors::{StoreError, StoreResult};

/// Default bound on a single connect attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared link to the data store
///
/// Cheap to clone; every clone refers to the same session.
#[derive(Clone)]
pub struct ConnectionHandle {
    session: Arc<dyn StoreSession>,
}

impl ConnectionHandle {
    fn new(session: Arc<dyn StoreSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<dyn StoreSession> {
        &self.session
    }

    /// Whether both handles point at the same underlying session
    pub fn same_session(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.session, &other.session)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("endpoint", &self.session.endpoint())
            .finish()
    }
}

/// Lazily establishes and hands out the shared [`ConnectionHandle`]
pub struct StoreManager {
    connector: Box<dyn StoreConnector>,
    connect_timeout: Duration,
    handle: OnceCell<ConnectionHandle>,
}

impl StoreManager {
    /// Create a manager with the default connect timeout
    pub fn new(connector: impl StoreConnector + 'static) -> Self {
        Self::with_timeout(connector, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a manager with an explicit connect timeout
    pub fn with_timeout(connector: impl StoreConnector + 'static, connect_timeout: Duration) -> Self {
        Self {
            connector: Box::new(connector),
            connect_timeout,
            handle: OnceCell::new(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Get the shared handle, establishing it if this is the first use
    pub async fn connection(&self) -> StoreResult<ConnectionHandle> {
        self.handle
            .get_or_try_init(|| self.establish())
            .await
            .cloned()
    }

    /// The handle if one is already established
    pub fn current(&self) -> Option<ConnectionHandle> {
        self.handle.get().cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }

    async fn establish(&self) -> StoreResult<ConnectionHandle> {
        let started = Instant::now();

        let session = tokio::time::timeout(self.connect_timeout, self.connector.connect())
            .await
            .map_err(|_| StoreError::Timeout(self.connect_timeout))??;

        tracing::info!(
            endpoint = %session.endpoint(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "data store connection established"
        );

        Ok(ConnectionHandle::new(session))
    }
}

impl fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreManager")
            .field("connect_timeout", &self.connect_timeout)
            .field("handle", &self.handle.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConnector;

    #[tokio::test]
    async fn test_handle_is_reused() {
        let connector = Arc::new(MemoryConnector::new());
        let manager = StoreManager::new(Arc::clone(&connector));

        assert!(!manager.is_connected());
        let first = manager.connection().await.unwrap();
        let second = manager.connection().await.unwrap();

        assert!(first.same_session(&second));
        assert_eq!(connector.attempts(), 1);
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn test_failure_is_not_memoised() {
        let connector = Arc::new(MemoryConnector::unavailable());
        let manager = StoreManager::new(Arc::clone(&connector));

        let err = manager.connection().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable));
        assert!(manager.current().is_none());

        connector.set_available(true);
        assert!(manager.connection().await.is_ok());
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let connector = MemoryConnector::new().with_delay(Duration::from_secs(30));
        let manager = StoreManager::with_timeout(connector, Duration::from_millis(20));

        let err = manager.connection().await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_concurrent_first_use_connects_once() {
        let connector = Arc::new(MemoryConnector::new().with_delay(Duration::from_millis(50)));
        let manager = Arc::new(StoreManager::new(Arc::clone(&connector)));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.connection().await })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap().unwrap());
        }

        assert_eq!(connector.attempts(), 1);
        assert!(handles.windows(2).all(|w| w[0].same_session(&w[1])));
    }

    #[tokio::test]
    async fn test_cancelled_attempt_is_retried() {
        let connector = Arc::new(MemoryConnector::new().with_delay(Duration::from_millis(50)));
        let manager = StoreManager::new(Arc::clone(&connector));

        // Caller gives up before the attempt finishes.
        let abandoned =
            tokio::time::timeout(Duration::from_millis(5), manager.connection()).await;
        assert!(abandoned.is_err());
        assert!(!manager.is_connected());

        assert!(manager.connection().await.is_ok());
        assert_eq!(connector.attempts(), 2);
    }
}
