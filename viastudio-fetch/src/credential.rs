//! API key access and the credential gate.
//!
//! The key itself lives behind a [`CredentialCapability`]: something that can
//! say whether a key has been chosen, open a selector, and hand out the key.
//! [`CredentialGate`] sits on top and decides whether generation controls
//! should be unlocked.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::CredentialError;
use crate::host::keychain::{KeychainApi, accounts, services};

/// Environment variables checked before the keychain, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

// ============================================================================
// Api Key
// ============================================================================

/// An API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key, trimming whitespace. Returns `None` for a blank key.
    pub fn new(key: impl AsRef<str>) -> Option<Self> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    /// Returns the raw key.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

// ============================================================================
// Capability
// ============================================================================

/// Host capability for choosing and reading the API key.
#[async_trait]
pub trait CredentialCapability: Send + Sync {
    /// Returns true if a key has been chosen.
    async fn has_selected_credential(&self) -> Result<bool, CredentialError> {
        Ok(self.current_credential().await?.is_some())
    }

    /// Opens the key selector.
    ///
    /// Completion does not mean a key was chosen; callers re-check.
    async fn open_selector(&self) -> Result<(), CredentialError>;

    /// Returns the chosen key, if any.
    async fn current_credential(&self) -> Result<Option<ApiKey>, CredentialError>;
}

/// Interactive source of a new key, used by [`KeychainCredentials`].
#[async_trait]
pub trait KeyPrompt: Send + Sync {
    /// Asks for a key. `Ok(None)` means the user backed out.
    async fn prompt_for_key(&self) -> Result<Option<String>, CredentialError>;
}

// ============================================================================
// Keychain Credentials
// ============================================================================

/// Environment variables first, then the system keychain.
pub struct KeychainCredentials {
    keychain: Arc<dyn KeychainApi>,
    prompt: Option<Arc<dyn KeyPrompt>>,
    env_vars: Vec<String>,
}

impl KeychainCredentials {
    /// Creates credentials backed by the given keychain.
    pub fn new(keychain: Arc<dyn KeychainApi>) -> Self {
        Self {
            keychain,
            prompt: None,
            env_vars: API_KEY_ENV_VARS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Sets the prompt used by `open_selector`.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Arc<dyn KeyPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Ignores environment variables and reads only the keychain.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.env_vars.clear();
        self
    }

    /// Stores a key in the keychain.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is blank or the keychain write fails.
    pub async fn store(&self, key: &str) -> Result<(), CredentialError> {
        let key = ApiKey::new(key).ok_or_else(|| {
            CredentialError::CapabilityUnavailable("refusing to store a blank key".to_string())
        })?;
        self.keychain
            .set(services::VEO, accounts::API_KEY, key.expose())
            .await?;
        info!("API key stored in keychain");
        Ok(())
    }

    /// Removes the stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the keychain delete fails.
    pub async fn clear(&self) -> Result<(), CredentialError> {
        self.keychain.delete(services::VEO, accounts::API_KEY).await?;
        info!("API key removed from keychain");
        Ok(())
    }

    /// Names where the current key comes from, if any.
    pub async fn source(&self) -> Result<Option<String>, CredentialError> {
        if let Some(var) = self.env_var_in_use() {
            return Ok(Some(format!("environment ({var})")));
        }
        if self.keychain_key().await?.is_some() {
            return Ok(Some("keychain".to_string()));
        }
        Ok(None)
    }

    fn env_var_in_use(&self) -> Option<&str> {
        self.env_vars.iter().map(String::as_str).find(|var| {
            std::env::var(var)
                .ok()
                .and_then(ApiKey::new)
                .is_some()
        })
    }

    fn env_key(&self) -> Option<ApiKey> {
        self.env_vars
            .iter()
            .find_map(|var| std::env::var(var).ok().and_then(ApiKey::new))
    }

    async fn keychain_key(&self) -> Result<Option<ApiKey>, CredentialError> {
        let stored = self.keychain.get(services::VEO, accounts::API_KEY).await?;
        Ok(stored.and_then(ApiKey::new))
    }
}

#[async_trait]
impl CredentialCapability for KeychainCredentials {
    async fn open_selector(&self) -> Result<(), CredentialError> {
        let Some(prompt) = &self.prompt else {
            return Err(CredentialError::CapabilityUnavailable(
                "no key prompt available".to_string(),
            ));
        };

        match prompt.prompt_for_key().await? {
            Some(key) => self.store(&key).await,
            None => {
                debug!("Key selection dismissed");
                Ok(())
            }
        }
    }

    async fn current_credential(&self) -> Result<Option<ApiKey>, CredentialError> {
        if let Some(key) = self.env_key() {
            return Ok(Some(key));
        }
        self.keychain_key().await
    }
}

impl fmt::Debug for KeychainCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeychainCredentials")
            .field("env_vars", &self.env_vars)
            .field("has_prompt", &self.prompt.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Static Credentials
// ============================================================================

/// A fixed key, e.g. from `--api-key`.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    key: Option<ApiKey>,
}

impl StaticCredentials {
    /// Creates credentials holding the given key. A blank key counts as none.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self {
            key: ApiKey::new(key),
        }
    }

    /// Creates credentials with no key.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialCapability for StaticCredentials {
    async fn open_selector(&self) -> Result<(), CredentialError> {
        Ok(())
    }

    async fn current_credential(&self) -> Result<Option<ApiKey>, CredentialError> {
        Ok(self.key.clone())
    }
}

// ============================================================================
// Gate State
// ============================================================================

/// Whether generation may be attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// Not asked yet.
    #[default]
    Unchecked,
    /// The capability reported a chosen key.
    Confirmed,
    /// Unlocked after the selector ran, without confirmation.
    AssumedUsable,
    /// The capability reported no key, or could not be asked.
    NotUsable,
    /// Forced off after the service rejected the key.
    Invalidated,
}

impl GateState {
    /// Returns true if generation controls should be unlocked.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Confirmed | Self::AssumedUsable)
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unchecked => "unchecked",
            Self::Confirmed => "confirmed",
            Self::AssumedUsable => "assumed usable",
            Self::NotUsable => "not usable",
            Self::Invalidated => "invalidated",
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Credential Gate
// ============================================================================

/// Tracks whether a usable key is available.
///
/// The gate never surfaces errors. Anything that goes wrong while asking the
/// capability leaves it `NotUsable`.
pub struct CredentialGate {
    capability: Arc<dyn CredentialCapability>,
    state: watch::Sender<GateState>,
    strict: bool,
}

impl CredentialGate {
    /// Creates a gate in the `Unchecked` state.
    pub fn new(capability: Arc<dyn CredentialCapability>) -> Self {
        let (state, _) = watch::channel(GateState::Unchecked);
        Self {
            capability,
            state,
            strict: false,
        }
    }

    /// Re-checks the capability after selection instead of assuming success.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns the capability this gate consults.
    pub fn capability(&self) -> Arc<dyn CredentialCapability> {
        Arc::clone(&self.capability)
    }

    /// Asks the capability whether a key is chosen and updates the state.
    pub async fn refresh(&self) -> bool {
        let next = match self.capability.has_selected_credential().await {
            Ok(true) => GateState::Confirmed,
            Ok(false) => GateState::NotUsable,
            Err(e) => {
                warn!(error = %e, "Credential check failed");
                GateState::NotUsable
            }
        };
        self.set(next);
        next.is_usable()
    }

    /// Returns the current view without asking the capability.
    pub fn is_usable(&self) -> bool {
        self.state().is_usable()
    }

    /// Opens the selector and unlocks.
    ///
    /// In strict mode the capability is asked again afterwards; otherwise the
    /// gate moves to `AssumedUsable` whatever the selector reported.
    pub async fn request_selection(&self) -> GateState {
        if let Err(e) = self.capability.open_selector().await {
            warn!(error = %e, "Key selector failed");
        }

        if self.strict {
            self.refresh().await;
        } else {
            self.set(GateState::AssumedUsable);
        }
        self.state()
    }

    /// Forces the gate off after the service rejected the key.
    pub fn invalidate(&self) {
        self.set(GateState::Invalidated);
    }

    /// Returns the current state.
    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    fn set(&self, next: GateState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "Credential gate changed");
        }
    }
}

impl fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialGate")
            .field("state", &self.state())
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::keychain::MemoryKeychain;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Unavailable;

    #[async_trait]
    impl CredentialCapability for Unavailable {
        async fn open_selector(&self) -> Result<(), CredentialError> {
            Err(CredentialError::CapabilityUnavailable("headless".into()))
        }

        async fn current_credential(&self) -> Result<Option<ApiKey>, CredentialError> {
            Err(CredentialError::CapabilityUnavailable("headless".into()))
        }
    }

    /// Selector that counts calls and never actually stores a key.
    #[derive(Default)]
    struct NeverSelects {
        opened: AtomicUsize,
    }

    #[async_trait]
    impl CredentialCapability for NeverSelects {
        async fn open_selector(&self) -> Result<(), CredentialError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn current_credential(&self) -> Result<Option<ApiKey>, CredentialError> {
            Ok(None)
        }
    }

    struct ScriptedPrompt(Mutex<Vec<Option<String>>>);

    #[async_trait]
    impl KeyPrompt for ScriptedPrompt {
        async fn prompt_for_key(&self) -> Result<Option<String>, CredentialError> {
            Ok(self.0.lock().unwrap().pop().flatten())
        }
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new(" abc123 ").unwrap();
        assert_eq!(key.expose(), "abc123");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(ApiKey::new("   ").is_none());
    }

    #[test]
    fn test_gate_state_usable() {
        assert!(GateState::Confirmed.is_usable());
        assert!(GateState::AssumedUsable.is_usable());
        assert!(!GateState::Unchecked.is_usable());
        assert!(!GateState::NotUsable.is_usable());
        assert!(!GateState::Invalidated.is_usable());
    }

    #[tokio::test]
    async fn test_refresh_confirms_selected_key() {
        let gate = CredentialGate::new(Arc::new(StaticCredentials::new("abc123")));
        assert_eq!(gate.state(), GateState::Unchecked);

        assert!(gate.refresh().await);
        assert_eq!(gate.state(), GateState::Confirmed);
    }

    #[tokio::test]
    async fn test_refresh_fails_closed() {
        let gate = CredentialGate::new(Arc::new(Unavailable));
        assert!(!gate.refresh().await);
        assert_eq!(gate.state(), GateState::NotUsable);

        let gate = CredentialGate::new(Arc::new(StaticCredentials::empty()));
        assert!(!gate.refresh().await);
        assert_eq!(gate.state(), GateState::NotUsable);
    }

    #[tokio::test]
    async fn test_selection_unlocks_optimistically() {
        let capability = Arc::new(NeverSelects::default());
        let gate = CredentialGate::new(capability.clone());
        gate.refresh().await;
        assert!(!gate.is_usable());

        assert_eq!(gate.request_selection().await, GateState::AssumedUsable);
        assert!(gate.is_usable());
        assert_eq!(capability.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_selection_unlocks_even_if_selector_fails() {
        let gate = CredentialGate::new(Arc::new(Unavailable));
        assert_eq!(gate.request_selection().await, GateState::AssumedUsable);
    }

    #[tokio::test]
    async fn test_strict_selection_rechecks() {
        let gate = CredentialGate::new(Arc::new(NeverSelects::default())).strict(true);
        assert_eq!(gate.request_selection().await, GateState::NotUsable);
        assert!(!gate.is_usable());
    }

    #[tokio::test]
    async fn test_invalidate_then_reselect() {
        let gate = CredentialGate::new(Arc::new(StaticCredentials::new("abc123")));
        gate.refresh().await;
        let mut rx = gate.subscribe();

        gate.invalidate();
        assert_eq!(gate.state(), GateState::Invalidated);
        assert!(!gate.is_usable());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), GateState::Invalidated);

        gate.request_selection().await;
        assert!(gate.is_usable());
    }

    #[tokio::test]
    async fn test_keychain_credentials_selector_stores_key() {
        let keychain = Arc::new(MemoryKeychain::new());
        let prompt = Arc::new(ScriptedPrompt(Mutex::new(vec![Some(" k-1 ".into())])));
        let credentials = KeychainCredentials::new(keychain.clone())
            .with_prompt(prompt)
            .without_env();

        assert!(!credentials.has_selected_credential().await.unwrap());
        credentials.open_selector().await.unwrap();

        let key = credentials.current_credential().await.unwrap().unwrap();
        assert_eq!(key.expose(), "k-1");
        assert_eq!(
            credentials.source().await.unwrap().as_deref(),
            Some("keychain")
        );

        credentials.clear().await.unwrap();
        assert!(credentials.current_credential().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keychain_credentials_dismissed_prompt() {
        let prompt = Arc::new(ScriptedPrompt(Mutex::new(vec![None])));
        let credentials = KeychainCredentials::new(Arc::new(MemoryKeychain::new()))
            .with_prompt(prompt)
            .without_env();

        credentials.open_selector().await.unwrap();
        assert!(!credentials.has_selected_credential().await.unwrap());
    }

    #[tokio::test]
    async fn test_keychain_credentials_without_prompt() {
        let credentials =
            KeychainCredentials::new(Arc::new(MemoryKeychain::new())).without_env();
        assert!(matches!(
            credentials.open_selector().await,
            Err(CredentialError::CapabilityUnavailable(_))
        ));
    }
}
