//! Credential Store
//!
//! Explicit owner of the cached access token. The composition root creates
//! one `CredentialStore` per session and hands it to the credential provider;
//! nothing else keeps a copy of the token.
//!
//! The in-memory copy is authoritative. When a [`SecureStore`] is supplied the
//! token is mirrored there so a restarted host can skip the consent prompt.
//! Durable-store failures are logged and never block the in-memory path.

use crate::error::{AuthError, Result};
use crate::types::AccessToken;
use bridge_traits::storage::SecureStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Key of the durable copy in the host secure store
pub const STORAGE_KEY: &str = "youtube_access_token";

pub struct CredentialStore {
    cached: RwLock<Option<AccessToken>>,
    durable: Option<Arc<dyn SecureStore>>,
}

impl CredentialStore {
    pub fn new(durable: Option<Arc<dyn SecureStore>>) -> Self {
        debug!(durable = durable.is_some(), "Initializing CredentialStore");
        Self {
            cached: RwLock::new(None),
            durable,
        }
    }

    /// Store that never touches durable storage
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Return the cached token if it is still valid at `now`.
    ///
    /// Falls back to the durable copy when the memory cache is empty and
    /// hydrates the cache from it. Expired tokens are evicted.
    pub async fn current(&self, now: DateTime<Utc>) -> Option<AccessToken> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired_at(now) {
                    return Some(token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        if cached.as_ref().is_some_and(|t| t.is_expired_at(now)) {
            debug!("Cached access token expired");
            *cached = None;
            self.delete_durable().await;
        }

        if cached.is_none() {
            if let Some(token) = self.load_durable().await {
                if token.is_expired_at(now) {
                    self.delete_durable().await;
                } else {
                    *cached = Some(token);
                }
            }
        }

        cached.clone()
    }

    /// Replace the cached token.
    ///
    /// Returns `SecureStorageUnavailable` when the durable write fails; the
    /// in-memory copy is updated regardless.
    pub async fn store(&self, token: AccessToken) -> Result<()> {
        let durable_result = self.save_durable(&token).await;
        *self.cached.write().await = Some(token);
        durable_result
    }

    /// Forget the token in memory and in durable storage
    pub async fn clear(&self) {
        *self.cached.write().await = None;
        self.delete_durable().await;
        info!("Cleared cached access token");
    }

    async fn save_durable(&self, token: &AccessToken) -> Result<()> {
        let Some(store) = self.durable.as_ref() else {
            return Ok(());
        };

        let json = serde_json::to_vec(token)
            .map_err(|e| AuthError::SecureStorageUnavailable(format!("serialize: {}", e)))?;

        store.set_secret(STORAGE_KEY, &json).await.map_err(|e| {
            warn!(error = %e, "Failed to persist access token");
            AuthError::SecureStorageUnavailable(e.to_string())
        })
    }

    async fn load_durable(&self) -> Option<AccessToken> {
        let store = self.durable.as_ref()?;

        let data = match store.get_secret(STORAGE_KEY).await {
            Ok(data) => data?,
            Err(e) => {
                warn!(error = %e, "Failed to read access token from secure storage");
                return None;
            }
        };

        match serde_json::from_slice::<AccessToken>(&data) {
            Ok(token) => {
                debug!("Restored access token from secure storage");
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "Stored access token is corrupted, discarding");
                self.delete_durable().await;
                None
            }
        }
    }

    async fn delete_durable(&self) {
        if let Some(store) = self.durable.as_ref() {
            if let Err(e) = store.delete_secret(STORAGE_KEY).await {
                warn!(error = %e, "Failed to delete access token from secure storage");
            }
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("durable", &self.durable.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySecureStore {
        data: Mutex<HashMap<String, Vec<u8>>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl SecureStore for MemorySecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            if self.fail_writes {
                return Err(BridgeError::OperationFailed("locked".to_string()));
            }
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    fn token(expires_in: i64) -> AccessToken {
        AccessToken::new("ya29.token", vec!["scope".to_string()], Some(expires_in), now())
    }

    #[tokio::test]
    async fn test_in_memory_store_and_clear() {
        let store = CredentialStore::in_memory();
        assert!(store.current(now()).await.is_none());

        store.store(token(3600)).await.unwrap();
        assert_eq!(store.current(now()).await, Some(token(3600)));

        store.clear().await;
        assert!(store.current(now()).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_evicted() {
        let store = CredentialStore::in_memory();
        store.store(token(120)).await.unwrap();

        assert!(store.current(now() + Duration::seconds(61)).await.is_none());
        assert!(store.current(now()).await.is_none());
    }

    #[tokio::test]
    async fn test_durable_copy_hydrates_new_store() {
        let secure: Arc<dyn SecureStore> = Arc::new(MemorySecureStore::default());

        let first = CredentialStore::new(Some(Arc::clone(&secure)));
        first.store(token(3600)).await.unwrap();

        let second = CredentialStore::new(Some(Arc::clone(&secure)));
        assert_eq!(second.current(now()).await, Some(token(3600)));

        second.clear().await;
        assert!(!secure.has_secret(STORAGE_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_durable_copy_is_discarded() {
        let secure = Arc::new(MemorySecureStore::default());
        secure.set_secret(STORAGE_KEY, b"not json").await.unwrap();

        let store = CredentialStore::new(Some(secure.clone() as Arc<dyn SecureStore>));
        assert!(store.current(now()).await.is_none());
        assert!(!secure.has_secret(STORAGE_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_durable_write_failure_keeps_memory_copy() {
        let secure = Arc::new(MemorySecureStore {
            fail_writes: true,
            ..Default::default()
        });
        let store = CredentialStore::new(Some(secure as Arc<dyn SecureStore>));

        let result = store.store(token(3600)).await;
        assert!(matches!(result, Err(AuthError::SecureStorageUnavailable(_))));
        assert!(store.current(now()).await.is_some());
    }
}
