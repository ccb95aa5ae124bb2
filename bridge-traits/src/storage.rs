//! Durable secret storage provided by the host.
//!
//! The credential cache in `core-auth` mirrors the token here so a restart
//! does not force a new consent prompt.

use async_trait::async_trait;

use crate::error::Result;

/// Keychain-like byte store keyed by name.
///
/// Implementations must not log values. `delete_secret` on a missing key
/// succeeds.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Overwrites any previous value
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn delete_secret(&self, key: &str) -> Result<()>;

    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}
