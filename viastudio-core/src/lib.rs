// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # VIA Studio Core
//!
//! Core types, models, and traits for the VIA Studio application.
//!
//! This crate provides the foundational abstractions used across all other
//! VIA Studio crates, including:
//!
//! - Domain models (requests, attempts, lifecycle view)
//! - Error types
//! - The progress reporting trait
//!
//! ## Key Types
//!
//! ### Request Types
//! - [`GenerationRequest`] - One immutable submission
//! - [`GenerationSettings`] - Form defaults (ratio, resolution, style, duration, fps)
//! - [`AspectRatio`], [`Resolution`], [`VideoStyle`], [`DurationTag`] - Form presets
//! - [`PromptTag`] - Quick-insert prompt tags
//!
//! ### Attempt Types
//! - [`GenerationAttempt`] - One in-flight or finished generation
//! - [`AttemptId`] - Short random identifier
//! - [`VideoReference`] - Playable URL (redacted in `Debug`)
//!
//! ### Lifecycle
//! - [`LifecycleState`] - Published view: phase, progress, history, notices
//! - [`SubmitOutcome`] - What a submission resolved to
//! - [`FailureNotice`] - User-facing failure

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Request types
    AspectRatio,
    DEFAULT_FPS,
    DurationTag,
    GenerationRequest,
    GenerationSettings,
    PromptTag,
    Resolution,
    VideoStyle,
    append_tag,
    // Attempt types
    AttemptId,
    AttemptStatus,
    GenerationAttempt,
    VideoReference,
    redact_key_param,
    // Lifecycle
    CREDENTIAL_EXPIRED_MESSAGE,
    FailureNotice,
    LifecyclePhase,
    LifecycleState,
    NoticeKind,
    RejectReason,
    SubmitOutcome,
};

// Re-export traits
pub use traits::{NoProgress, ProgressSink};
