//! Veo REST client.
//!
//! Video generation is a long-running operation on the Generative Language
//! API:
//!
//! - `POST /v1beta/models/{model}:predictLongRunning` starts it
//! - `GET /v1beta/{operation name}` reports its status
//!
//! Both calls authenticate with the `x-goog-api-key` header.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use viastudio_core::GenerationRequest;
use viastudio_fetch::{ApiKey, FetchError, HttpClient, HttpError};

// ============================================================================
// Constants
// ============================================================================

/// Generative Language API base URL.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Veo model used when none is configured.
pub const DEFAULT_MODEL: &str = "veo-3.1-fast-generate-preview";

const API_KEY_HEADER: &str = "x-goog-api-key";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    aspect_ratio: &'a str,
    resolution: &'a str,
    sample_count: u32,
}

impl<'a> PredictRequest<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            instances: [Instance {
                prompt: request.prompt(),
            }],
            parameters: Parameters {
                aspect_ratio: request.ratio().as_str(),
                resolution: request.resolution().as_str(),
                sample_count: 1,
            },
        }
    }
}

// ============================================================================
// Operation Types
// ============================================================================

/// A long-running generation operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation name, e.g. `models/veo/operations/abc`.
    #[serde(default)]
    pub name: String,

    /// Whether the operation has finished.
    #[serde(default)]
    pub done: bool,

    /// Result, once done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<OperationResponse>,

    /// Failure, once done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

/// Completed operation payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    /// Generated videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

/// Generated videos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    /// One entry per requested sample.
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,

    /// Samples dropped by safety filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rai_media_filtered_count: Option<u32>,
}

/// One generated video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSample {
    /// Video file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoFile>,
}

/// Video file location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFile {
    /// Download URI (requires the API key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Operation-level failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// Status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,

    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Operation {
    /// An operation that is still running.
    pub fn running(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A finished operation with one video.
    pub fn finished(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            response: Some(OperationResponse {
                generate_video_response: Some(GenerateVideoResponse {
                    generated_samples: vec![GeneratedSample {
                        video: Some(VideoFile {
                            uri: Some(uri.into()),
                        }),
                    }],
                    rai_media_filtered_count: None,
                }),
            }),
            error: None,
        }
    }

    /// A finished operation without any video.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            ..Self::default()
        }
    }

    /// A finished operation carrying an error.
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            response: None,
            error: Some(OperationError {
                code: None,
                message: Some(message.into()),
            }),
        }
    }

    /// URI of the first generated video.
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .first()?
            .video
            .as_ref()?
            .uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
    }

    /// Error message, if the operation failed.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| {
            e.message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string())
        })
    }
}

// ============================================================================
// Error Envelope
// ============================================================================

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Extracts the message from a Google error body, falling back to the raw text.
fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            if let Some(code) = &envelope.error.status {
                debug!(status, code = %code, "Service error");
            }
            envelope
                .error
                .message
                .unwrap_or_else(|| format!("HTTP {status}"))
        }
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => body.trim().to_string(),
    }
}

// ============================================================================
// Service Trait
// ============================================================================

/// The remote service that runs generations.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Starts a generation.
    async fn submit(
        &self,
        request: &GenerationRequest,
        key: &ApiKey,
    ) -> Result<Operation, FetchError>;

    /// Fetches the latest status of an operation.
    async fn refresh(&self, operation: &Operation, key: &ApiKey) -> Result<Operation, FetchError>;
}

// ============================================================================
// API Client
// ============================================================================

/// Veo API client.
#[derive(Debug, Clone)]
pub struct VeoApiClient {
    http: Arc<HttpClient>,
    base_url: String,
    model: String,
}

impl VeoApiClient {
    /// Creates a client for the default endpoint and model.
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Returns the model in use.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(key: &ApiKey) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(key.expose())
            .map_err(|_| HttpError::InvalidHeader(API_KEY_HEADER))?;
        value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, value);
        Ok(headers)
    }

    async fn read_operation(response: reqwest::Response) -> Result<Operation, FetchError> {
        let status = response.status();
        let body = response.text().await.map_err(HttpError::from)?;

        if !status.is_success() {
            let message = error_message(status.as_u16(), &body);
            warn!(status = status.as_u16(), message = %message, "Veo request failed");
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse operation");
            FetchError::InvalidResponse(format!("JSON error: {e}"))
        })
    }
}

#[async_trait]
impl GenerationService for VeoApiClient {
    #[instrument(skip(self, request, key), fields(model = %self.model))]
    async fn submit(
        &self,
        request: &GenerationRequest,
        key: &ApiKey,
    ) -> Result<Operation, FetchError> {
        let url = format!(
            "{}/v1beta/models/{}:predictLongRunning",
            self.base_url, self.model
        );
        let body = PredictRequest::from_request(request);

        let response = self.http.post_json(&url, &body, Self::headers(key)?).await?;
        let operation = Self::read_operation(response).await?;
        debug!(operation = %operation.name, done = operation.done, "Generation submitted");
        Ok(operation)
    }

    #[instrument(skip(self, operation, key), fields(operation = %operation.name))]
    async fn refresh(&self, operation: &Operation, key: &ApiKey) -> Result<Operation, FetchError> {
        let url = format!("{}/v1beta/{}", self.base_url, operation.name);

        let response = self.http.get_with_headers(&url, Self::headers(key)?).await?;
        let refreshed = Self::read_operation(response).await?;
        debug!(done = refreshed.done, "Operation refreshed");
        Ok(refreshed)
    }
}

// ============================================================================
// Tests
// ============================================================================
