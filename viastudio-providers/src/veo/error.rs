//! Generation errors and upstream error classification.

use thiserror::Error;
use viastudio_fetch::FetchError;

/// Upstream message that means the API key is no longer valid.
pub const CREDENTIAL_REJECTED_SIGNATURE: &str = "Requested entity was not found";

/// Why a generation did not produce a video.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// No API key has been chosen.
    #[error("API Key is missing. Please select one.")]
    MissingCredential,

    /// The operation finished without a video.
    #[error("No video URI returned from the API.")]
    NoResultReturned,

    /// The service rejected the API key.
    #[error("API key expired or invalid")]
    CredentialExpiredOrInvalid,

    /// Any other upstream failure, message unchanged.
    #[error("{0}")]
    GenerationFailed(String),

    /// The caller cancelled the attempt.
    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Classifies an upstream failure message.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(CREDENTIAL_REJECTED_SIGNATURE) {
            Self::CredentialExpiredOrInvalid
        } else {
            Self::GenerationFailed(message)
        }
    }

    /// Returns true if the user has to choose a key again.
    pub fn requires_credential(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::CredentialExpiredOrInvalid)
    }
}

impl From<FetchError> for GenerationError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Api { message, .. } => Self::classify(message),
            other => Self::classify(other.to_string()),
        }
    }
}
