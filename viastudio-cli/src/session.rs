//! Service wiring shared by the commands that generate videos.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use viastudio_core::LifecycleState;
use viastudio_fetch::{
    CredentialCapability, CredentialGate, FetchContext, GateState, KeychainCredentials,
    StaticCredentials, SystemKeychain,
};
use viastudio_providers::{GenerationClient, VeoApiClient, VideoExporter};
use viastudio_store::{GenerationController, SettingsStore};

use crate::Cli;
use crate::output::TextFormatter;
use crate::prompt::TerminalKeyPrompt;

/// No usable API key. Maps to exit code 2.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CredentialRequired(pub String);

impl CredentialRequired {
    /// No key was found at all.
    pub fn missing() -> Self {
        Self("No API key selected. Run `viastudio auth select` or pass --api-key.".to_string())
    }
}

/// Builds the credential source for this invocation.
///
/// `--api-key` wins and bypasses the keychain entirely.
pub fn keychain_credentials(cli: &Cli) -> Option<Arc<KeychainCredentials>> {
    if cli.api_key.is_some() {
        return None;
    }
    Some(Arc::new(
        KeychainCredentials::new(Arc::new(SystemKeychain::new()))
            .with_prompt(Arc::new(TerminalKeyPrompt)),
    ))
}

/// A controller and exporter wired from the saved settings.
pub struct Session {
    /// The lifecycle controller.
    pub controller: Arc<GenerationController>,
    /// Downloads finished videos.
    pub exporter: VideoExporter,
    /// Keychain-backed credentials, absent when `--api-key` is used.
    pub keychain: Option<Arc<KeychainCredentials>>,
}

impl Session {
    /// Wires the HTTP client, credentials, API client and controller.
    pub async fn open(cli: &Cli, store: &SettingsStore) -> Result<Self> {
        let settings = store.get().await;
        let keychain = keychain_credentials(cli);

        let credentials: Arc<dyn CredentialCapability> = match (&cli.api_key, &keychain) {
            (Some(key), _) => Arc::new(StaticCredentials::new(key)),
            (None, Some(keychain)) => Arc::clone(keychain) as Arc<dyn CredentialCapability>,
            (None, None) => Arc::new(StaticCredentials::empty()),
        };

        let ctx = FetchContext::builder()
            .credentials(credentials)
            .settings(settings.fetch_settings())
            .build()?;

        let api = VeoApiClient::new(Arc::clone(&ctx.http))
            .with_base_url(&settings.api_base_url)
            .with_model(&settings.model);
        debug!(model = %api.model(), base = %settings.api_base_url, "Session configured");

        let client = GenerationClient::from_context(&ctx, Arc::new(api));
        let gate = Arc::new(
            CredentialGate::new(Arc::clone(&ctx.credentials)).strict(settings.strict_credentials),
        );
        let controller = GenerationController::new(client, gate)
            .with_history_limit(settings.history_limit);

        Ok(Self {
            controller: Arc::new(controller),
            exporter: VideoExporter::new(Arc::clone(&ctx.http)),
            keychain,
        })
    }

    /// Makes sure a key is available before generating.
    ///
    /// When no key is found and the terminal is interactive, the key prompt
    /// is offered once.
    pub async fn ensure_credential(&self) -> Result<GateState> {
        let gate = self.controller.gate();
        if gate.refresh().await {
            return Ok(gate.state());
        }

        if self.keychain.is_some() && std::io::stdin().is_terminal() {
            let state = gate.request_selection().await;
            if state.is_usable() {
                return Ok(state);
            }
        }

        Err(CredentialRequired::missing().into())
    }

    /// Cancels the in-flight generation on Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted");
                controller.shutdown();
            }
        })
    }

    /// Prints each progress update to stderr until aborted.
    pub fn print_progress(&self, formatter: TextFormatter) -> JoinHandle<()> {
        let rx = self.controller.subscribe();
        tokio::spawn(forward_progress(rx, move |message| {
            eprintln!("{}", formatter.progress_line(message));
        }))
    }
}

/// Hands every progress update of the in-flight attempt to `emit`, one per
/// report, until the controller goes away.
async fn forward_progress(
    mut rx: watch::Receiver<LifecycleState>,
    mut emit: impl FnMut(&str),
) {
    while rx.changed().await.is_ok() {
        let message = {
            let state = rx.borrow_and_update();
            if !state.is_in_flight() {
                continue;
            }
            state.progress_message().to_string()
        };
        if !message.is_empty() {
            emit(&message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viastudio_core::{GenerationRequest, GenerationSettings};

    #[tokio::test]
    async fn test_repeated_progress_is_printed_each_time() {
        let (tx, rx) = watch::channel(LifecycleState::new());
        let (lines_tx, mut lines) = tokio::sync::mpsc::unbounded_channel();
        let task = tokio::spawn(forward_progress(rx, move |message: &str| {
            let _ = lines_tx.send(message.to_string());
        }));

        let mut begun = None;
        tx.send_modify(|state| {
            begun = state
                .begin(&GenerationRequest::new("a fox", &GenerationSettings::default()))
                .ok();
        });
        let id = begun.unwrap().id;

        for _ in 0..2 {
            tx.send_modify(|state| {
                state.record_progress(&id, "Rendering light and shadow...");
            });
            assert_eq!(
                lines.recv().await.as_deref(),
                Some("Rendering light and shadow...")
            );
        }

        drop(tx);
        task.await.unwrap();
        assert!(lines.try_recv().is_err());
    }
}
