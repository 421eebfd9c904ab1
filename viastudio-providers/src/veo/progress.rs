//! Progress messages shown while a video renders.

use rand::Rng;

/// Reported before anything is sent.
pub const INITIALIZING_MESSAGE: &str = "Initializing cinematic engine...";

/// Reported once the service accepted the request.
pub const SUBMITTED_MESSAGE: &str = "Crafting frames... This may take a few minutes.";

/// Rotation picked from after each poll. Cosmetic only.
pub const FLAVOR_MESSAGES: [&str; 5] = [
    "Analyzing prompt geometry...",
    "Simulating lighting and shadows...",
    "Rendering cinematic motion...",
    "Post-processing visual fidelity...",
    "Finalizing high-quality export...",
];

/// Picks a flavor message at random.
pub fn flavor_message() -> &'static str {
    let index = rand::thread_rng().gen_range(0..FLAVOR_MESSAGES.len());
    FLAVOR_MESSAGES[index]
}
