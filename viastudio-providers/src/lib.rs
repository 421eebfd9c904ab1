// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # VIA Studio Providers
//!
//! Video generation service clients for VIA Studio.
//!
//! Each provider module includes:
//!
//! - **Service**: the wire protocol behind a [`veo::GenerationService`] trait
//! - **Client**: the submit/poll loop with progress and cancellation
//! - **Errors**: classification of upstream failures
//!
//! ## Supported Providers
//!
//! | Provider | Auth | Result |
//! |----------|------|--------|
//! | Veo (Google) | API key | Video URL |

pub mod veo;

// Re-export key types
pub use veo::{
    GenerationClient, GenerationError, GenerationService, Operation, VeoApiClient, VideoExporter,
};
