//! Lifecycle view state.
//!
//! [`LifecycleState`] is the value the lifecycle controller publishes and the
//! presentation layer reads. Its mutators enforce the single-flight and
//! history invariants so the controller only has to sequence them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::attempt::{AttemptId, GenerationAttempt, VideoReference};
use super::request::GenerationRequest;
use crate::error::CoreError;

/// Message shown when the credential is rejected by the service.
pub const CREDENTIAL_EXPIRED_MESSAGE: &str =
    "Your API session has expired. Please select your API key again.";

// ============================================================================
// Phase
// ============================================================================

/// Externally observed lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Nothing in flight, nothing selected.
    Idle,
    /// An attempt is waiting on the service.
    InFlight,
    /// Nothing in flight, a result is selected.
    ResultReady,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::InFlight => write!(f, "in flight"),
            Self::ResultReady => write!(f, "result ready"),
        }
    }
}

// ============================================================================
// Rejections & Notices
// ============================================================================

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The prompt was blank.
    EmptyPrompt,
    /// Another attempt is still in flight.
    AlreadyInFlight,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPrompt => write!(f, "prompt is empty"),
            Self::AlreadyInFlight => write!(f, "a generation is already in progress"),
        }
    }
}

/// Category of a user-facing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The credential was rejected or missing; the user must select one.
    CredentialExpired,
    /// The service finished without returning a video.
    NoResult,
    /// Any other service failure.
    GenerationFailed,
    /// The attempt was abandoned locally.
    Cancelled,
}

/// Blocking notice shown after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    /// Failure category.
    pub kind: NoticeKind,
    /// Text shown to the user.
    pub message: String,
}

impl FailureNotice {
    /// Notice for an expired or invalid credential.
    pub fn credential_expired() -> Self {
        Self {
            kind: NoticeKind::CredentialExpired,
            message: CREDENTIAL_EXPIRED_MESSAGE.to_string(),
        }
    }

    /// Notice for a submission made without any key selected.
    pub fn credential_missing(reason: impl fmt::Display) -> Self {
        Self {
            kind: NoticeKind::CredentialExpired,
            message: format!("Generation failed: {reason}"),
        }
    }

    /// Notice for a completed operation with no video.
    pub fn no_result(reason: impl fmt::Display) -> Self {
        Self {
            kind: NoticeKind::NoResult,
            message: format!("Generation failed: {reason}"),
        }
    }

    /// Notice for any other failure.
    pub fn generation_failed(reason: impl fmt::Display) -> Self {
        Self {
            kind: NoticeKind::GenerationFailed,
            message: format!("Generation failed: {reason}"),
        }
    }

    /// Notice for a locally cancelled attempt.
    pub fn cancelled() -> Self {
        Self {
            kind: NoticeKind::Cancelled,
            message: "Generation cancelled.".to_string(),
        }
    }

    /// Returns true if the user has to select a credential again.
    pub fn requires_credential(&self) -> bool {
        self.kind == NoticeKind::CredentialExpired
    }
}

impl fmt::Display for FailureNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Guard violated; nothing happened.
    Rejected(RejectReason),
    /// The attempt finished with a video and was added to history.
    Completed(GenerationAttempt),
    /// The attempt failed; history is unchanged.
    Failed(FailureNotice),
}

impl SubmitOutcome {
    /// Returns the completed attempt, if any.
    pub fn completed(&self) -> Option<&GenerationAttempt> {
        match self {
            Self::Completed(attempt) => Some(attempt),
            _ => None,
        }
    }

    /// Returns true if the submission was ignored.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

// ============================================================================
// Lifecycle State
// ============================================================================

/// Snapshot of the generation lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleState {
    /// The attempt currently waiting on the service.
    in_flight: Option<GenerationAttempt>,
    /// History entry currently selected for viewing.
    current: Option<AttemptId>,
    /// Completed attempts, most recent first.
    history: Vec<GenerationAttempt>,
    /// Notice from the most recent failure, cleared on the next submission.
    last_notice: Option<FailureNotice>,
}

impl LifecycleState {
    /// Creates an idle state with empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the observed phase.
    pub fn phase(&self) -> LifecyclePhase {
        if self.in_flight.is_some() {
            LifecyclePhase::InFlight
        } else if self.current.is_some() {
            LifecyclePhase::ResultReady
        } else {
            LifecyclePhase::Idle
        }
    }

    /// Returns true while an attempt is in flight.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns the in-flight attempt.
    pub fn in_flight(&self) -> Option<&GenerationAttempt> {
        self.in_flight.as_ref()
    }

    /// Returns the current progress message (empty when idle).
    pub fn progress_message(&self) -> &str {
        self.in_flight
            .as_ref()
            .map_or("", |a| a.progress_message.as_str())
    }

    /// Returns the selected result.
    pub fn current_result(&self) -> Option<&GenerationAttempt> {
        let id = self.current.as_ref()?;
        self.find(id)
    }

    /// Returns completed attempts, most recent first.
    pub fn history(&self) -> &[GenerationAttempt] {
        &self.history
    }

    /// Looks up a history entry.
    pub fn find(&self, id: &AttemptId) -> Option<&GenerationAttempt> {
        self.history.iter().find(|a| &a.id == id)
    }

    /// Returns the most recent failure notice.
    pub fn last_notice(&self) -> Option<&FailureNotice> {
        self.last_notice.as_ref()
    }

    /// Starts a pending attempt if the guard allows it.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectReason`] when the prompt is blank or an attempt is
    /// already in flight. The state is left untouched in that case.
    pub fn begin(&mut self, request: &GenerationRequest) -> Result<GenerationAttempt, RejectReason> {
        if request.validate().is_err() {
            return Err(RejectReason::EmptyPrompt);
        }
        if self.in_flight.is_some() {
            return Err(RejectReason::AlreadyInFlight);
        }

        let attempt = GenerationAttempt::pending(request);
        self.in_flight = Some(attempt.clone());
        self.last_notice = None;
        Ok(attempt)
    }

    /// Updates the progress message of the in-flight attempt.
    ///
    /// Returns false if `id` is not the in-flight attempt.
    pub fn record_progress(&mut self, id: &AttemptId, message: &str) -> bool {
        match self.in_flight.as_mut() {
            Some(attempt) if &attempt.id == id => {
                attempt.set_progress(message);
                true
            }
            _ => false,
        }
    }

    /// Completes the in-flight attempt, pushes it onto history, and selects it.
    ///
    /// `history_limit` trims the oldest entries when set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInFlight`] if `id` is not the in-flight attempt.
    pub fn record_success(
        &mut self,
        id: &AttemptId,
        reference: VideoReference,
        history_limit: Option<usize>,
    ) -> Result<GenerationAttempt, CoreError> {
        let mut attempt = self.take_in_flight(id)?;
        attempt.complete(reference)?;

        self.history.insert(0, attempt.clone());
        if let Some(limit) = history_limit {
            self.history.truncate(limit.max(1));
        }
        self.current = Some(attempt.id.clone());
        Ok(attempt)
    }

    /// Fails the in-flight attempt. History and the current result are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInFlight`] if `id` is not the in-flight attempt.
    pub fn record_failure(
        &mut self,
        id: &AttemptId,
        notice: FailureNotice,
    ) -> Result<GenerationAttempt, CoreError> {
        let mut attempt = self.take_in_flight(id)?;
        attempt.fail(notice.message.clone())?;
        self.last_notice = Some(notice);
        Ok(attempt)
    }

    /// Selects a history entry. Returns false (and changes nothing) if absent.
    pub fn select(&mut self, id: &AttemptId) -> bool {
        if self.find(id).is_some() {
            self.current = Some(id.clone());
            true
        } else {
            false
        }
    }

    fn take_in_flight(&mut self, id: &AttemptId) -> Result<GenerationAttempt, CoreError> {
        match self.in_flight.take() {
            Some(attempt) if &attempt.id == id => Ok(attempt),
            other => {
                self.in_flight = other;
                Err(CoreError::NotInFlight(id.to_string()))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
