//! Generation request types.
//!
//! This module contains everything the user picks before submitting:
//! - [`AspectRatio`] / [`Resolution`] - Sent to the service verbatim
//! - [`VideoStyle`] / [`DurationTag`] - Form presets
//! - [`GenerationSettings`] - The persisted form defaults
//! - [`GenerationRequest`] - One immutable submission
//! - [`PromptTag`] - Quick-insert prompt tags

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Aspect Ratio
// ============================================================================

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    /// Landscape 16:9.
    #[default]
    #[serde(rename = "16:9")]
    Wide,
    /// Portrait 9:16.
    #[serde(rename = "9:16")]
    Tall,
    /// Square 1:1.
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    /// Returns the wire value (e.g. "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wide => "16:9",
            Self::Tall => "9:16",
            Self::Square => "1:1",
        }
    }

    /// Returns all ratios in display order.
    pub fn all() -> &'static [AspectRatio] {
        &[Self::Wide, Self::Tall, Self::Square]
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "16:9" | "wide" | "landscape" => Ok(Self::Wide),
            "9:16" | "tall" | "portrait" => Ok(Self::Tall),
            "1:1" | "square" => Ok(Self::Square),
            other => Err(CoreError::InvalidValue {
                field: "aspect ratio",
                value: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    /// 720p HD.
    #[serde(rename = "720p")]
    Hd,
    /// 1080p Full HD.
    #[default]
    #[serde(rename = "1080p")]
    FullHd,
}

impl Resolution {
    /// Returns the wire value (e.g. "1080p").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hd => "720p",
            Self::FullHd => "1080p",
        }
    }

    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hd => "720p HD",
            Self::FullHd => "1080p Full HD",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "720p" | "720" | "hd" => Ok(Self::Hd),
            "1080p" | "1080" | "fullhd" | "full-hd" => Ok(Self::FullHd),
            other => Err(CoreError::InvalidValue {
                field: "resolution",
                value: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Style & Duration
// ============================================================================

/// Style preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VideoStyle {
    /// Photorealistic.
    Realistic,
    /// Cinematic Pro.
    #[default]
    Cinematic,
    /// Anime Fusion.
    Anime,
    /// Flat Motion.
    #[serde(rename = "Motion Graphic")]
    MotionGraphic,
}

impl VideoStyle {
    /// Returns the tag value (e.g. "Motion Graphic").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realistic => "Realistic",
            Self::Cinematic => "Cinematic",
            Self::Anime => "Anime",
            Self::MotionGraphic => "Motion Graphic",
        }
    }

    /// Returns the preset label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Realistic => "Photorealistic",
            Self::Cinematic => "Cinematic Pro",
            Self::Anime => "Anime Fusion",
            Self::MotionGraphic => "Flat Motion",
        }
    }

    /// Returns all styles in display order.
    pub fn all() -> &'static [VideoStyle] {
        &[
            Self::Cinematic,
            Self::Realistic,
            Self::Anime,
            Self::MotionGraphic,
        ]
    }
}

impl fmt::Display for VideoStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoStyle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "realistic" | "photorealistic" => Ok(Self::Realistic),
            "cinematic" | "cinematicpro" => Ok(Self::Cinematic),
            "anime" | "animefusion" => Ok(Self::Anime),
            "motiongraphic" | "flatmotion" => Ok(Self::MotionGraphic),
            _ => Err(CoreError::InvalidValue {
                field: "style",
                value: s.to_string(),
            }),
        }
    }
}

/// Clip length preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DurationTag {
    /// 5 seconds.
    #[default]
    #[serde(rename = "5s")]
    FiveSeconds,
    /// 10 seconds.
    #[serde(rename = "10s")]
    TenSeconds,
}

impl DurationTag {
    /// Returns the tag value (e.g. "5s").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiveSeconds => "5s",
            Self::TenSeconds => "10s",
        }
    }

    /// Returns the length in seconds.
    pub fn seconds(&self) -> u32 {
        match self {
            Self::FiveSeconds => 5,
            Self::TenSeconds => 10,
        }
    }
}

impl fmt::Display for DurationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationTag {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5s" | "5" => Ok(Self::FiveSeconds),
            "10s" | "10" => Ok(Self::TenSeconds),
            other => Err(CoreError::InvalidValue {
                field: "duration",
                value: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Generation Settings
// ============================================================================

/// Default frame rate.
pub const DEFAULT_FPS: u32 = 24;

/// Form settings applied to every new request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Aspect ratio.
    pub ratio: AspectRatio,
    /// Resolution.
    pub resolution: Resolution,
    /// Style preset.
    pub style: VideoStyle,
    /// Duration preset.
    pub duration: DurationTag,
    /// Frames per second.
    pub fps: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            style: VideoStyle::default(),
            duration: DurationTag::default(),
            fps: DEFAULT_FPS,
        }
    }
}

// ============================================================================
// Generation Request
// ============================================================================

/// A single submission. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    prompt: String,
    ratio: AspectRatio,
    resolution: Resolution,
    style: VideoStyle,
    duration: DurationTag,
    fps: u32,
}

impl GenerationRequest {
    /// Creates a request from prompt text and the current form settings.
    pub fn new(prompt: impl Into<String>, settings: &GenerationSettings) -> Self {
        Self {
            prompt: prompt.into(),
            ratio: settings.ratio,
            resolution: settings.resolution,
            style: settings.style,
            duration: settings.duration,
            fps: settings.fps,
        }
    }

    /// Prompt text as typed.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Aspect ratio.
    pub fn ratio(&self) -> AspectRatio {
        self.ratio
    }

    /// Resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Style preset.
    pub fn style(&self) -> VideoStyle {
        self.style
    }

    /// Duration preset.
    pub fn duration(&self) -> DurationTag {
        self.duration
    }

    /// Frames per second.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Returns true if the prompt has content after trimming.
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Checks that the request can be submitted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyPrompt`] if the prompt is blank.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.has_prompt() {
            Ok(())
        } else {
            Err(CoreError::EmptyPrompt)
        }
    }
}

// ============================================================================
// Prompt Tags
// ============================================================================

/// Quick-insert prompt tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptTag {
    /// "Cinematic"
    Cinematic,
    /// "Golden Hour"
    GoldenHour,
    /// "Wide Angle"
    WideAngle,
    /// "4K"
    FourK,
}

impl PromptTag {
    /// Returns the text inserted into the prompt.
    pub fn text(&self) -> &'static str {
        match self {
            Self::Cinematic => "Cinematic",
            Self::GoldenHour => "Golden Hour",
            Self::WideAngle => "Wide Angle",
            Self::FourK => "4K",
        }
    }

    /// Returns all tags in display order.
    pub fn all() -> &'static [PromptTag] {
        &[Self::Cinematic, Self::GoldenHour, Self::WideAngle, Self::FourK]
    }
}

impl fmt::Display for PromptTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl FromStr for PromptTag {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "cinematic" => Ok(Self::Cinematic),
            "goldenhour" => Ok(Self::GoldenHour),
            "wideangle" => Ok(Self::WideAngle),
            "4k" => Ok(Self::FourK),
            _ => Err(CoreError::InvalidValue {
                field: "prompt tag",
                value: s.to_string(),
            }),
        }
    }
}

/// Appends a tag to a prompt, comma-separated.
pub fn append_tag(prompt: &str, tag: PromptTag) -> String {
    if prompt.is_empty() {
        tag.text().to_string()
    } else {
        format!("{prompt}, {}", tag.text())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.ratio, AspectRatio::Wide);
        assert_eq!(settings.resolution, Resolution::FullHd);
        assert_eq!(settings.style, VideoStyle::Cinematic);
        assert_eq!(settings.duration, DurationTag::FiveSeconds);
        assert_eq!(settings.fps, 24);
    }

    #[test]
    fn test_ratio_parsing() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Wide);
        assert_eq!("portrait".parse::<AspectRatio>().unwrap(), AspectRatio::Tall);
        assert_eq!(" 1:1 ".parse::<AspectRatio>().unwrap(), AspectRatio::Square);
        assert!("4:3".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_style_parsing_accepts_labels() {
        assert_eq!(
            "Motion Graphic".parse::<VideoStyle>().unwrap(),
            VideoStyle::MotionGraphic
        );
        assert_eq!(
            "flat-motion".parse::<VideoStyle>().unwrap(),
            VideoStyle::MotionGraphic
        );
        assert_eq!(
            "Photorealistic".parse::<VideoStyle>().unwrap(),
            VideoStyle::Realistic
        );
    }

    #[test]
    fn test_blank_prompt_is_rejected() {
        let settings = GenerationSettings::default();
        assert!(GenerationRequest::new("", &settings).validate().is_err());
        assert!(GenerationRequest::new("   \n", &settings).validate().is_err());
        assert!(GenerationRequest::new("a fox", &settings).validate().is_ok());
    }

    #[test]
    fn test_request_copies_settings() {
        let settings = GenerationSettings {
            ratio: AspectRatio::Square,
            resolution: Resolution::Hd,
            ..Default::default()
        };
        let request = GenerationRequest::new("a red fox in snow", &settings);
        assert_eq!(request.prompt(), "a red fox in snow");
        assert_eq!(request.ratio(), AspectRatio::Square);
        assert_eq!(request.resolution(), Resolution::Hd);
        assert_eq!(request.fps(), 24);
    }

    #[test]
    fn test_append_tag() {
        assert_eq!(append_tag("", PromptTag::Cinematic), "Cinematic");
        assert_eq!(
            append_tag("neon city", PromptTag::GoldenHour),
            "neon city, Golden Hour"
        );
        assert_eq!("4k".parse::<PromptTag>().unwrap(), PromptTag::FourK);
        assert_eq!("wide angle".parse::<PromptTag>().unwrap(), PromptTag::WideAngle);
    }
}
