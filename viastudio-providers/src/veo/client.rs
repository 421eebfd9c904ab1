//! Request/poll protocol for one generation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use viastudio_core::{GenerationRequest, ProgressSink, VideoReference};
use viastudio_fetch::{ApiKey, CredentialCapability, FetchContext};

use super::api::{GenerationService, Operation};
use super::error::GenerationError;
use super::progress::{INITIALIZING_MESSAGE, SUBMITTED_MESSAGE, flavor_message};

/// Runs one generation from submission to a playable reference.
///
/// The key is read from the credential capability on every call, so a key
/// chosen after the client was built is picked up.
pub struct GenerationClient {
    service: Arc<dyn GenerationService>,
    credentials: Arc<dyn CredentialCapability>,
    poll_interval: Duration,
}

impl GenerationClient {
    /// Creates a client with the default poll interval.
    pub fn new(
        service: Arc<dyn GenerationService>,
        credentials: Arc<dyn CredentialCapability>,
    ) -> Self {
        Self {
            service,
            credentials,
            poll_interval: Duration::from_secs(viastudio_fetch::DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    /// Creates a client that shares the context's credentials and timing.
    pub fn from_context(ctx: &FetchContext, service: Arc<dyn GenerationService>) -> Self {
        Self::new(service, Arc::clone(&ctx.credentials)).with_poll_interval(ctx.poll_interval())
    }

    /// Sets the delay between polls.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns the delay between polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Generates a video.
    ///
    /// Reports a message when starting, one when the service accepts the
    /// request, and one after every poll. Cancelling the token ends the wait
    /// between polls with [`GenerationError::Cancelled`].
    ///
    /// # Errors
    ///
    /// See [`GenerationError`].
    #[instrument(skip_all, fields(ratio = %request.ratio(), resolution = %request.resolution()))]
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<VideoReference, GenerationError> {
        progress.report(INITIALIZING_MESSAGE);
        let key = self.credential().await?;

        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let mut operation = self.service.submit(request, &key).await?;
        info!(operation = %operation.name, "Generation started");
        progress.report(SUBMITTED_MESSAGE);

        let mut polls = 0u32;
        while !operation.done {
            operation = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(operation = %operation.name, polls, "Generation cancelled");
                    return Err(GenerationError::Cancelled);
                }
                next = self.poll(&operation, &key) => next?,
            };
            polls += 1;
            progress.report(flavor_message());
        }
        debug!(polls, "Operation finished");

        if let Some(message) = operation.error_message() {
            warn!(message = %message, "Operation failed");
            return Err(GenerationError::classify(message));
        }

        let uri = operation
            .video_uri()
            .ok_or(GenerationError::NoResultReturned)?;
        let reference = VideoReference::new(format!("{uri}&key={}", key.expose()))
            .map_err(|_| GenerationError::NoResultReturned)?;
        info!(video = %reference.redacted(), "Generation complete");
        Ok(reference)
    }

    async fn credential(&self) -> Result<ApiKey, GenerationError> {
        match self.credentials.current_credential().await {
            Ok(Some(key)) => Ok(key),
            Ok(None) => Err(GenerationError::MissingCredential),
            Err(e) => {
                warn!(error = %e, "Failed to read API key");
                Err(GenerationError::MissingCredential)
            }
        }
    }

    async fn poll(&self, operation: &Operation, key: &ApiKey) -> Result<Operation, GenerationError> {
        tokio::time::sleep(self.poll_interval).await;
        Ok(self.service.refresh(operation, key).await?)
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
