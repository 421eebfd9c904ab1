//! Output formatting for CLI.

mod json;
mod text;

pub use json::{AuthOutput, GenerateOutput, JsonFormatter};
pub use text::TextFormatter;
