//! # Authentication Module
//!
//! Access-token acquisition for the playlist API.
//!
//! ## Overview
//!
//! - [`CredentialProvider`]: the contract remote connectors depend on
//! - [`ConsentCredentialProvider`]: user-consent implementation with a bounded wait
//! - [`CredentialStore`]: explicit owner of the cached token, optionally
//!   mirrored into a host `SecureStore`
//! - [`ConsentRequester`] / [`ConsentCallback`]: channel-based handshake with
//!   the host UI

pub mod consent;
pub mod error;
pub mod provider;
pub mod token_store;
pub mod types;

pub use consent::{
    build_consent_url, ConsentCallback, ConsentOutcome, ConsentRequest, ConsentRequester,
};
pub use error::{AuthError, Result};
pub use provider::{ConsentCredentialProvider, CredentialProvider};
pub use token_store::CredentialStore;
pub use types::AccessToken;
