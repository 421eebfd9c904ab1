//! Client context carrying host APIs into the generation client.
//!
//! The context is the one value the generation client and the credential
//! gate share: the HTTP client, the credential capability, and the timing
//! settings. Nothing in the workspace reads ambient global state for these.

use std::sync::Arc;
use std::time::Duration;

use crate::credential::{CredentialCapability, KeychainCredentials};
use crate::error::FetchError;
use crate::host::http::{DEFAULT_TIMEOUT_SECS, HttpClient};
use crate::host::keychain::SystemKeychain;

/// Default delay between operation polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

// ============================================================================
// Fetch Settings
// ============================================================================

/// Timing settings for service calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Delay between polls of a long-running operation.
    pub poll_interval: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl FetchSettings {
    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// Host APIs shared by the generation client and the credential gate.
#[derive(Clone)]
pub struct FetchContext {
    /// HTTP client with tracing.
    pub http: Arc<HttpClient>,
    /// Where the API key comes from.
    pub credentials: Arc<dyn CredentialCapability>,
    /// Timing settings.
    pub settings: FetchSettings,
}

impl FetchContext {
    /// Creates a builder for customizing the context.
    pub fn builder() -> FetchContextBuilder {
        FetchContextBuilder::new()
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }

    /// Returns the poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.settings.poll_interval
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
#[derive(Default)]
pub struct FetchContextBuilder {
    http: Option<Arc<HttpClient>>,
    credentials: Option<Arc<dyn CredentialCapability>>,
    settings: FetchSettings,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP client. Overrides `timeout`.
    #[must_use]
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the credential capability.
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialCapability>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the fetch settings.
    #[must_use]
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.settings.poll_interval = poll_interval;
        self
    }

    /// Builds the context.
    ///
    /// Without explicit credentials the context reads the key from the
    /// environment and the system keychain.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(self) -> Result<FetchContext, FetchError> {
        let http = match self.http {
            Some(http) => http,
            None => Arc::new(HttpClient::with_timeout(self.settings.timeout)?),
        };

        let credentials = self.credentials.unwrap_or_else(|| {
            Arc::new(KeychainCredentials::new(Arc::new(SystemKeychain::new())))
        });

        Ok(FetchContext {
            http,
            credentials,
            settings: self.settings,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
