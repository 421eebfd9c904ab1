//! Veo (Google) video generation.
//!
//! ## Protocol
//!
//! 1. `POST /v1beta/models/{model}:predictLongRunning` with the prompt,
//!    aspect ratio and resolution returns an operation.
//! 2. `GET /v1beta/{operation}` every poll interval until `done`.
//! 3. The first generated sample's URI, with `&key=` appended, is the
//!    playable video.
//!
//! A `"Requested entity was not found"` failure means the key was rejected.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use viastudio_providers::veo::{GenerationClient, VeoApiClient};
//!
//! let service = Arc::new(VeoApiClient::new(Arc::clone(&ctx.http)));
//! let client = GenerationClient::from_context(&ctx, service);
//! let video = client
//!     .generate(&request, &|m: &str| println!("{m}"), &CancellationToken::new())
//!     .await?;
//! ```

mod api;
mod client;
mod error;
mod export;
mod progress;

pub use api::{
    DEFAULT_API_BASE, DEFAULT_MODEL, GenerateVideoResponse, GeneratedSample, GenerationService,
    Operation, OperationError, OperationResponse, VeoApiClient, VideoFile,
};
pub use client::GenerationClient;
pub use error::{CREDENTIAL_REJECTED_SIGNATURE, GenerationError};
pub use export::VideoExporter;
pub use progress::{FLAVOR_MESSAGES, INITIALIZING_MESSAGE, SUBMITTED_MESSAGE, flavor_message};
