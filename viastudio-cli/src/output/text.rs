//! Text output formatting with colors.

use chrono::Local;
use std::path::Path;
use viastudio_core::{
    AttemptId, AttemptStatus, FailureNotice, GenerationAttempt, GenerationSettings, PromptTag,
    RejectReason,
};
use viastudio_fetch::GateState;
use viastudio_store::{SETTING_KEYS, Settings};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";

const PROGRESS_MARK: char = '›';
const SELECTED_MARK: char = '▸';

/// Characters of a prompt shown in a history line.
const PROMPT_WIDTH: usize = 48;

/// Text formatter with optional colors.
#[derive(Debug, Clone, Copy)]
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats one progress message.
    pub fn progress_line(&self, message: &str) -> String {
        format!("{} {}", self.cyan(&PROGRESS_MARK.to_string()), message)
    }

    /// Formats a finished attempt.
    pub fn format_attempt(&self, attempt: &GenerationAttempt) -> String {
        let mut lines = Vec::new();

        let header = match attempt.status {
            AttemptStatus::Completed => self.green("Video ready"),
            AttemptStatus::Failed => self.red("Generation failed"),
            AttemptStatus::Pending => self.yellow("Generating"),
        };
        lines.push(self.bold(&header));
        lines.push(format!("  {}  {}", self.dim("ID:     "), attempt.id));
        lines.push(format!("  {}  {}", self.dim("Prompt: "), attempt.prompt));
        lines.push(format!(
            "  {}  {} · {}",
            self.dim("Format: "),
            attempt.ratio,
            attempt.resolution.label()
        ));
        lines.push(format!(
            "  {}  {}",
            self.dim("Created:"),
            attempt
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        ));

        if let Some(result) = &attempt.result {
            lines.push(format!(
                "  {}  {}",
                self.dim("Video:  "),
                self.blue(&result.redacted())
            ));
        }
        if let Some(failure) = &attempt.failure {
            lines.push(format!("  {}  {}", self.dim("Reason: "), self.red(failure)));
        }

        lines.join("\n")
    }

    /// Formats the session history, newest first.
    pub fn format_history(
        &self,
        history: &[GenerationAttempt],
        selected: Option<&AttemptId>,
    ) -> String {
        if history.is_empty() {
            return self.dim("No videos generated yet.");
        }

        let mut lines = vec![self.bold(&format!("History ({})", history.len()))];
        for (i, attempt) in history.iter().enumerate() {
            let mark = if selected == Some(&attempt.id) {
                self.cyan(&SELECTED_MARK.to_string())
            } else {
                " ".to_string()
            };
            lines.push(format!(
                "{} {:>2}. {}  {:<5} {:<5} {}  {}",
                mark,
                i + 1,
                self.dim(attempt.id.as_str()),
                attempt.ratio.as_str(),
                attempt.resolution.as_str(),
                attempt.created_at.with_timezone(&Local).format("%H:%M"),
                truncate(&attempt.prompt, PROMPT_WIDTH)
            ));
        }
        lines.join("\n")
    }

    /// Formats a failure notice.
    pub fn format_notice(&self, notice: &FailureNotice) -> String {
        if notice.requires_credential() {
            format!(
                "{}\n{}",
                self.yellow(&notice.message),
                self.dim("Run `viastudio auth select` (or :key in the studio) to choose a key.")
            )
        } else {
            self.red(&notice.message)
        }
    }

    /// Formats a rejected submission.
    pub fn format_reject(&self, reason: RejectReason) -> String {
        self.yellow(&format!("Not submitted: {reason}"))
    }

    /// Formats the credential status.
    pub fn format_gate(&self, state: GateState, source: Option<&str>) -> String {
        let label = if state.is_usable() {
            self.green(state.label())
        } else {
            self.red(state.label())
        };
        let mut lines = vec![format!("{} {}", self.bold("API key:"), label)];
        match source {
            Some(source) => lines.push(format!("  {} {}", self.dim("Source:"), source)),
            None => lines.push(format!("  {} none", self.dim("Source:"))),
        }
        lines.join("\n")
    }

    /// Formats the studio's form values.
    pub fn format_form(&self, form: &GenerationSettings, tags: &[PromptTag]) -> String {
        let mut lines = vec![
            format!("  {} {}", self.dim("ratio:     "), form.ratio),
            format!("  {} {}", self.dim("resolution:"), form.resolution.label()),
            format!("  {} {}", self.dim("style:     "), form.style.label()),
            format!("  {} {}", self.dim("duration:  "), form.duration),
            format!("  {} {}", self.dim("fps:       "), form.fps),
        ];
        if !tags.is_empty() {
            let tags: Vec<&str> = tags.iter().map(PromptTag::text).collect();
            lines.push(format!("  {} {}", self.dim("tags:      "), tags.join(", ")));
        }
        lines.join("\n")
    }

    /// Formats all settings.
    pub fn format_settings(&self, settings: &Settings) -> String {
        let width = SETTING_KEYS.iter().map(|k| k.len()).max().unwrap_or(0);
        let mut lines = vec![self.bold("VIA Studio Configuration"), "─".repeat(40)];
        for key in SETTING_KEYS {
            let value = settings.get_value(key).unwrap_or_default();
            lines.push(format!("  {:<width$}  {}", key, value));
        }
        lines.join("\n")
    }

    /// Formats a finished export.
    pub fn format_export(&self, path: &Path, bytes: u64) -> String {
        format!(
            "{} {} ({})",
            self.green("Saved"),
            path.display(),
            format_bytes(bytes)
        )
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn blue(&self, text: &str) -> String {
        self.paint(BLUE, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Shortens text to `max` characters, ending with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000 {
        format!("{:.1} MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{bytes} B")
    }
}
