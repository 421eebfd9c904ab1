//! Terminal key prompt.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use viastudio_fetch::{CredentialError, KeyPrompt};

/// Reads an API key from standard input.
///
/// An empty line or end of input counts as dismissing the prompt.
#[derive(Debug, Default)]
pub struct TerminalKeyPrompt;

#[async_trait]
impl KeyPrompt for TerminalKeyPrompt {
    async fn prompt_for_key(&self) -> Result<Option<String>, CredentialError> {
        let line = tokio::task::spawn_blocking(|| -> std::io::Result<String> {
            let mut stderr = std::io::stderr();
            write!(stderr, "Paste your Gemini API key (empty to cancel): ")?;
            stderr.flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| CredentialError::CapabilityUnavailable(e.to_string()))??;

        Ok(parse_key_line(&line))
    }
}

fn parse_key_line(line: &str) -> Option<String> {
    let key = line.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
