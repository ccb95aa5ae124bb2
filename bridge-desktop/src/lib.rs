//! Desktop implementations of the bridge traits: a reqwest-backed
//! `HttpClient` and, behind the `secure-store` feature, a `SecureStore`
//! over the OS credential vault.
//!
//! ```ignore
//! let http = Arc::new(bridge_desktop::ReqwestHttpClient::new());
//! let config = CoreConfig::builder().http_client(http).build()?;
//! ```

mod http;
#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestHttpClient;
#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
