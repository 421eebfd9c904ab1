//! Domain models for VIA Studio.
//!
//! ## Submodules
//!
//! - [`request`] - What the user asks for (ratio, resolution, presets, prompt tags)
//! - [`attempt`] - One generation and its playable result
//! - [`lifecycle`] - The published lifecycle view (phase, history, notices)

mod attempt;
mod lifecycle;
mod request;

// Re-export everything at the models level
pub use attempt::{
    AttemptId, AttemptStatus, GenerationAttempt, VideoReference, redact_key_param,
};
pub use lifecycle::{
    CREDENTIAL_EXPIRED_MESSAGE, FailureNotice, LifecyclePhase, LifecycleState, NoticeKind,
    RejectReason, SubmitOutcome,
};
pub use request::{
    AspectRatio, DEFAULT_FPS, DurationTag, GenerationRequest, GenerationSettings, PromptTag,
    Resolution, VideoStyle, append_tag,
};
