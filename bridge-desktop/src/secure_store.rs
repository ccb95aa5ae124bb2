//! `SecureStore` over the OS credential vault (Keychain, Credential
//! Manager, Secret Service)

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tracing::debug;

const DEFAULT_SERVICE: &str = "playlist-reorder";

/// Values are base64 encoded since the vault only holds strings.
#[derive(Debug, Clone)]
pub struct KeyringSecureStore {
    service: String,
}

impl KeyringSecureStore {
    pub fn new() -> Self {
        Self::with_service_name(DEFAULT_SERVICE)
    }

    pub fn with_service_name(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Runs a blocking vault call off the async executor
    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> std::result::Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let account = key.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &account).map_err(vault_error)?;
            op(entry).map_err(vault_error)
        })
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("keyring task aborted: {}", e)))?
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn vault_error(e: keyring::Error) -> BridgeError {
    match e {
        keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
            BridgeError::NotAvailable(format!("credential vault: {}", e))
        }
        other => BridgeError::OperationFailed(format!("credential vault: {}", other)),
    }
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let encoded = STANDARD.encode(value);
        self.with_entry(key, move |entry| entry.set_password(&encoded))
            .await?;
        debug!(key, "Secret written to vault");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let stored = self
            .with_entry(key, |entry| match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e),
            })
            .await?;

        let Some(encoded) = stored else {
            debug!(key, "No secret in vault");
            return Ok(None);
        };
        STANDARD
            .decode(encoded.as_bytes())
            .map(Some)
            .map_err(|e| BridgeError::OperationFailed(format!("stored secret is not base64: {}", e)))
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await?;
        debug!(key, "Secret removed from vault");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(KeyringSecureStore::new().service, "playlist-reorder");
        assert_eq!(
            KeyringSecureStore::with_service_name("reorder-tests").service,
            "reorder-tests"
        );
    }

    #[test]
    fn test_missing_backend_is_not_available() {
        let err = vault_error(keyring::Error::NoStorageAccess("locked".into()));
        assert!(matches!(err, BridgeError::NotAvailable(_)));

        let err = vault_error(keyring::Error::TooLong("user".into(), 255));
        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }

    #[tokio::test]
    async fn test_round_trip_when_vault_reachable() {
        // Headless CI usually has no Secret Service; tolerate that
        let store = KeyringSecureStore::with_service_name("playlist-reorder-tests");
        let key = "youtube-credential-roundtrip";

        if store.set_secret(key, b"token-value").await.is_err() {
            return;
        }
        if let Ok(Some(value)) = store.get_secret(key).await {
            assert_eq!(value, b"token-value".to_vec());
        }
        let _ = store.delete_secret(key).await;
    }
}
