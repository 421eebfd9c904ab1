//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use viastudio_core::{FailureNotice, GenerationAttempt, NoticeKind, SubmitOutcome};
use viastudio_fetch::GateState;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one attempt.
///
/// `videoUrl` is the full playable URL, key included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutput {
    pub id: String,
    pub prompt: String,
    pub ratio: String,
    pub resolution: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&GenerationAttempt> for AttemptOutput {
    fn from(attempt: &GenerationAttempt) -> Self {
        Self {
            id: attempt.id.to_string(),
            prompt: attempt.prompt.clone(),
            ratio: attempt.ratio.to_string(),
            resolution: attempt.resolution.to_string(),
            status: attempt.status.to_string(),
            video_url: attempt.result.as_ref().map(ToString::to_string),
            failure: attempt.failure.clone(),
            created_at: attempt.created_at,
        }
    }
}

/// Failure notice.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeOutput {
    pub kind: NoticeKind,
    pub message: String,
    pub requires_credential: bool,
}

impl From<&FailureNotice> for NoticeOutput {
    fn from(notice: &FailureNotice) -> Self {
        Self {
            kind: notice.kind,
            message: notice.message.clone(),
            requires_credential: notice.requires_credential(),
        }
    }
}

/// Result of `generate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutput {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<AttemptOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<NoticeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

impl GenerateOutput {
    /// Builds the output for a submission outcome.
    pub fn from_outcome(outcome: &SubmitOutcome) -> Self {
        let mut output = Self {
            outcome: "",
            attempt: None,
            notice: None,
            reason: None,
            saved_to: None,
            bytes: None,
        };
        match outcome {
            SubmitOutcome::Completed(attempt) => {
                output.outcome = "completed";
                output.attempt = Some(attempt.into());
            }
            SubmitOutcome::Failed(notice) => {
                output.outcome = "failed";
                output.notice = Some(notice.into());
            }
            SubmitOutcome::Rejected(reason) => {
                output.outcome = "rejected";
                output.reason = Some(reason.to_string());
            }
        }
        output
    }

    /// Records where the video was saved.
    #[must_use]
    pub fn with_export(mut self, path: &Path, bytes: u64) -> Self {
        self.saved_to = Some(path.display().to_string());
        self.bytes = Some(bytes);
        self
    }
}

/// Credential status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOutput {
    pub state: GateState,
    pub usable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl AuthOutput {
    /// Builds the status output.
    pub fn new(state: GateState, source: Option<String>) -> Self {
        Self {
            state,
            usable: state.is_usable(),
            source,
        }
    }
}

/// Studio history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    pub entries: Vec<AttemptOutput>,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a submission outcome.
    pub fn format_outcome(&self, outcome: &SubmitOutcome) -> Result<String> {
        self.format(&GenerateOutput::from_outcome(outcome))
    }

    /// Formats the history with the selected entry.
    pub fn format_history(
        &self,
        history: &[GenerationAttempt],
        selected: Option<&GenerationAttempt>,
    ) -> Result<String> {
        self.format(&HistoryOutput {
            selected: selected.map(|a| a.id.to_string()),
            entries: history.iter().map(AttemptOutput::from).collect(),
        })
    }
}
