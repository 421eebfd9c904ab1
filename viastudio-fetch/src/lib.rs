// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # VIA Studio Fetch
//!
//! Host APIs for the VIA Studio generation client.
//!
//! ## Host APIs
//!
//! - [`host::keychain`] - Secure credential storage (system keychain)
//! - [`host::http`] - HTTP client with tracing and domain allowlist
//!
//! ## Credentials
//!
//! - [`credential::CredentialCapability`] - Where the API key comes from
//! - [`credential::CredentialGate`] - Whether generation is unlocked
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use viastudio_fetch::{CredentialGate, FetchContext};
//!
//! let ctx = FetchContext::builder().build()?;
//! let gate = CredentialGate::new(Arc::clone(&ctx.credentials));
//! if !gate.refresh().await {
//!     gate.request_selection().await;
//! }
//! ```

pub mod context;
pub mod credential;
pub mod error;
pub mod host;

// Errors
pub use error::{CredentialError, FetchError, HttpError, KeychainError};

// Host APIs
pub use host::{
    http::HttpClient,
    keychain::{KeychainApi, MemoryKeychain, SystemKeychain},
};

// Credentials
pub use credential::{
    API_KEY_ENV_VARS, ApiKey, CredentialCapability, CredentialGate, GateState, KeyPrompt,
    KeychainCredentials, StaticCredentials,
};

// Context
pub use context::{DEFAULT_POLL_INTERVAL_SECS, FetchContext, FetchContextBuilder, FetchSettings};
