//! Generation lifecycle controller.
//!
//! Owns the [`LifecycleState`] and publishes it through a watch channel.
//! Every mutation goes through the channel's sender, so the single-flight
//! check and the transition to in-flight happen under one lock.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use viastudio_core::{
    AttemptId, FailureNotice, GenerationRequest, LifecycleState, RejectReason, SubmitOutcome,
    VideoReference,
};
use viastudio_fetch::CredentialGate;
use viastudio_providers::{GenerationClient, GenerationError};

/// Drives one generation at a time and keeps the session history.
pub struct GenerationController {
    client: GenerationClient,
    gate: Arc<CredentialGate>,
    state: watch::Sender<LifecycleState>,
    history_limit: Option<usize>,
    shutdown: CancellationToken,
}

impl GenerationController {
    /// Creates an idle controller with empty history.
    pub fn new(client: GenerationClient, gate: Arc<CredentialGate>) -> Self {
        let (state, _) = watch::channel(LifecycleState::new());
        Self {
            client,
            gate,
            state,
            history_limit: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Caps the history. `None` keeps every entry.
    #[must_use]
    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    /// Returns the credential gate.
    pub fn gate(&self) -> &Arc<CredentialGate> {
        &self.gate
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> LifecycleState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Cancels the in-flight attempt, if any, and every later one.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Generation controller shutting down");
            self.shutdown.cancel();
        }
    }

    /// Selects a history entry for viewing.
    ///
    /// Returns false (and changes nothing) if the id is unknown.
    pub fn select_history_entry(&self, id: &AttemptId) -> bool {
        let mut found = false;
        self.state.send_if_modified(|state| {
            found = state.select(id);
            found
        });
        if !found {
            debug!(attempt = %id, "History entry not found");
        }
        found
    }

    /// Submits a request and waits for it to finish.
    ///
    /// A blank prompt or an attempt already in flight is rejected without
    /// touching the state or the network. Failures never escape as errors;
    /// they come back as [`SubmitOutcome::Failed`] with the notice to show.
    pub async fn submit(&self, request: GenerationRequest) -> SubmitOutcome {
        let mut begun = Err(RejectReason::EmptyPrompt);
        self.state.send_if_modified(|state| {
            begun = state.begin(&request);
            begun.is_ok()
        });

        let attempt = match begun {
            Ok(attempt) => attempt,
            Err(reason) => {
                debug!(reason = %reason, "Submission rejected");
                return SubmitOutcome::Rejected(reason);
            }
        };
        info!(attempt = %attempt.id, "Generation attempt started");

        let id = attempt.id;
        let mut guard = InFlightGuard {
            state: &self.state,
            id: Some(id.clone()),
        };
        let progress = |message: &str| {
            self.state
                .send_if_modified(|state| state.record_progress(&id, message));
        };
        let cancel = self.shutdown.child_token();

        let result = self.client.generate(&request, &progress, &cancel).await;
        guard.disarm();

        match result {
            Ok(reference) => self.finish_success(&id, reference),
            Err(err) => self.finish_failure(&id, &err),
        }
    }

    fn finish_success(&self, id: &AttemptId, reference: VideoReference) -> SubmitOutcome {
        let mut recorded = None;
        self.state.send_modify(|state| {
            recorded = Some(state.record_success(id, reference, self.history_limit));
        });

        match recorded {
            Some(Ok(attempt)) => {
                info!(attempt = %attempt.id, "Generation attempt completed");
                SubmitOutcome::Completed(attempt)
            }
            Some(Err(e)) => {
                error!(attempt = %id, error = %e, "Failed to record result");
                SubmitOutcome::Failed(FailureNotice::generation_failed(e))
            }
            None => SubmitOutcome::Failed(FailureNotice::generation_failed("state unavailable")),
        }
    }

    fn finish_failure(&self, id: &AttemptId, err: &GenerationError) -> SubmitOutcome {
        let notice = match err {
            GenerationError::CredentialExpiredOrInvalid => {
                self.gate.invalidate();
                FailureNotice::credential_expired()
            }
            GenerationError::MissingCredential => {
                self.gate.invalidate();
                FailureNotice::credential_missing(err)
            }
            GenerationError::NoResultReturned => FailureNotice::no_result(err),
            GenerationError::GenerationFailed(reason) => FailureNotice::generation_failed(reason),
            GenerationError::Cancelled => FailureNotice::cancelled(),
        };
        warn!(attempt = %id, error = %err, "Generation attempt failed");

        let mut recorded = None;
        self.state.send_modify(|state| {
            recorded = Some(state.record_failure(id, notice.clone()));
        });
        if let Some(Err(e)) = recorded {
            error!(attempt = %id, error = %e, "Failed to record failure");
        }

        SubmitOutcome::Failed(notice)
    }
}

/// Fails the in-flight attempt as cancelled if `submit` is dropped before
/// the service answers.
struct InFlightGuard<'a> {
    state: &'a watch::Sender<LifecycleState>,
    id: Option<AttemptId>,
}

impl InFlightGuard<'_> {
    fn disarm(&mut self) {
        self.id = None;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        warn!(attempt = %id, "Generation attempt dropped while in flight");
        self.state.send_if_modified(|state| {
            state
                .record_failure(&id, FailureNotice::cancelled())
                .is_ok()
        });
    }
}

impl std::fmt::Debug for GenerationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationController")
            .field("client", &self.client)
            .field("gate", &self.gate)
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}
