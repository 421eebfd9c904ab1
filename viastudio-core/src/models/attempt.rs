//! Generation attempt tracking.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::request::{AspectRatio, GenerationRequest, Resolution};
use crate::error::CoreError;

/// Length of generated attempt identifiers.
const ATTEMPT_ID_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// ============================================================================
// Attempt Id
// ============================================================================

/// Short random identifier for an attempt (9 base-36 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(String);

impl AttemptId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..ATTEMPT_ID_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(id)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttemptId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Video Reference
// ============================================================================

/// A playable video URL.
///
/// The URL carries the API key as a query parameter, so `Debug` output is
/// redacted. `Display` and serialization keep the full URL because that is
/// what a player or downloader needs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoReference(String);

impl VideoReference {
    /// Wraps a URL.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyReference`] if the URL is blank.
    pub fn new(url: impl Into<String>) -> Result<Self, CoreError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(CoreError::EmptyReference);
        }
        Ok(Self(url))
    }

    /// Returns the full URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the URL with any `key=` value masked.
    pub fn redacted(&self) -> String {
        redact_key_param(&self.0)
    }
}

/// Masks the value of every `key` parameter in a URL.
///
/// Only a `key=` that follows `?` or `&` counts, so `monkey=` and `apikey=`
/// are left alone.
pub fn redact_key_param(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut rest = url;
    while let Some(i) = rest.find(|c: char| c == '?' || c == '&') {
        let (head, tail) = rest.split_at(i + 1);
        out.push_str(head);
        rest = tail;
        if let Some(value) = rest.strip_prefix("key=") {
            out.push_str("key=***");
            let end = value.find('&').unwrap_or(value.len());
            rest = &value[end..];
        }
    }
    out.push_str(rest);
    out
}

impl fmt::Debug for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VideoReference").field(&self.redacted()).finish()
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Attempt Status
// ============================================================================

/// Lifecycle status of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Submitted, waiting on the service.
    Pending,
    /// Finished with a video.
    Completed,
    /// Finished without a video.
    Failed,
}

impl AttemptStatus {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// Generation Attempt
// ============================================================================

/// One in-flight or finished generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationAttempt {
    /// Unique id.
    pub id: AttemptId,
    /// Prompt that was submitted.
    pub prompt: String,
    /// Aspect ratio that was submitted.
    pub ratio: AspectRatio,
    /// Resolution that was submitted.
    pub resolution: Resolution,
    /// Current status.
    pub status: AttemptStatus,
    /// Playable result, set once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<VideoReference>,
    /// Failure reason, set once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// When the attempt was submitted.
    pub created_at: DateTime<Utc>,
    /// Latest progress message while pending.
    #[serde(default)]
    pub progress_message: String,
}

impl GenerationAttempt {
    /// Starts a pending attempt for a request.
    pub fn pending(request: &GenerationRequest) -> Self {
        Self {
            id: AttemptId::generate(),
            prompt: request.prompt().to_string(),
            ratio: request.ratio(),
            resolution: request.resolution(),
            status: AttemptStatus::Pending,
            result: None,
            failure: None,
            created_at: Utc::now(),
            progress_message: String::new(),
        }
    }

    /// Returns true while waiting on the service.
    pub fn is_pending(&self) -> bool {
        self.status == AttemptStatus::Pending
    }

    /// Returns true if finished with a video.
    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }

    /// Updates the progress message. Ignored once terminal.
    pub fn set_progress(&mut self, message: impl Into<String>) {
        if self.is_pending() {
            self.progress_message = message.into();
        }
    }

    /// Marks the attempt completed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] if the attempt is not pending.
    pub fn complete(&mut self, result: VideoReference) -> Result<(), CoreError> {
        self.ensure_pending(AttemptStatus::Completed)?;
        self.status = AttemptStatus::Completed;
        self.result = Some(result);
        self.progress_message.clear();
        Ok(())
    }

    /// Marks the attempt failed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] if the attempt is not pending.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_pending(AttemptStatus::Failed)?;
        self.status = AttemptStatus::Failed;
        self.failure = Some(reason.into());
        self.progress_message.clear();
        Ok(())
    }

    fn ensure_pending(&self, to: AttemptStatus) -> Result<(), CoreError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
