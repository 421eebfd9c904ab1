//! Generate command - one video from the command line.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use tracing::info;
use viastudio_core::{
    AspectRatio, DurationTag, GenerationRequest, GenerationSettings, PromptTag, Resolution,
    SubmitOutcome, VideoStyle, append_tag,
};
use viastudio_store::SettingsStore;

use crate::output::{GenerateOutput, JsonFormatter, TextFormatter};
use crate::session::{CredentialRequired, Session};
use crate::{Cli, OutputFormat};

/// Arguments for the generate command.
#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// What the video should show.
    pub prompt: String,

    /// Aspect ratio: 16:9, 9:16 or 1:1.
    #[arg(long, short)]
    pub ratio: Option<AspectRatio>,

    /// Resolution: 720p or 1080p.
    #[arg(long)]
    pub resolution: Option<Resolution>,

    /// Style preset: realistic, cinematic, anime, motion-graphic.
    #[arg(long, short)]
    pub style: Option<VideoStyle>,

    /// Duration preset: 5s or 10s.
    #[arg(long, short)]
    pub duration: Option<DurationTag>,

    /// Frames per second.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Append a tag to the prompt (repeatable): cinematic, golden-hour, wide-angle, 4k.
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<PromptTag>,

    /// Save the finished video to this file.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl GenerateArgs {
    /// Applies the flags over the saved form defaults.
    pub fn form(&self, defaults: &GenerationSettings) -> GenerationSettings {
        GenerationSettings {
            ratio: self.ratio.unwrap_or(defaults.ratio),
            resolution: self.resolution.unwrap_or(defaults.resolution),
            style: self.style.unwrap_or(defaults.style),
            duration: self.duration.unwrap_or(defaults.duration),
            fps: self.fps.unwrap_or(defaults.fps),
        }
    }

    /// Returns the prompt with every tag appended.
    pub fn prompt(&self) -> String {
        self.tags
            .iter()
            .fold(self.prompt.trim().to_string(), |prompt, tag| {
                append_tag(&prompt, *tag)
            })
    }
}

/// Runs the generate command.
pub async fn run(args: &GenerateArgs, cli: &Cli, store: &SettingsStore) -> Result<()> {
    let request = GenerationRequest::new(args.prompt(), &args.form(&store.generation().await));
    request.validate()?;

    let session = Session::open(cli, store).await?;
    session.ensure_credential().await?;

    let formatter = TextFormatter::new(cli.use_colors());
    let progress = cli.show_progress().then(|| session.print_progress(formatter));
    let interrupt = session.cancel_on_ctrl_c();

    let outcome = session.controller.submit(request).await;

    interrupt.abort();
    if let Some(progress) = progress {
        progress.abort();
    }

    let exported = match (&outcome, &args.output) {
        (SubmitOutcome::Completed(attempt), Some(path)) => {
            let Some(reference) = &attempt.result else {
                bail!("Completed attempt has no video");
            };
            let bytes = session.exporter.export(reference, path).await?;
            info!(path = %path.display(), bytes, "Video saved");
            Some((path.as_path(), bytes))
        }
        _ => None,
    };

    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet || !matches!(outcome, SubmitOutcome::Completed(_)) {
                match &outcome {
                    SubmitOutcome::Completed(attempt) => {
                        println!("{}", formatter.format_attempt(attempt));
                    }
                    SubmitOutcome::Failed(notice) => {
                        eprintln!("{}", formatter.format_notice(notice));
                    }
                    SubmitOutcome::Rejected(reason) => {
                        eprintln!("{}", formatter.format_reject(*reason));
                    }
                }
            }
            if let Some((path, bytes)) = exported {
                println!("{}", formatter.format_export(path, bytes));
            }
        }
        OutputFormat::Json => {
            let mut output = GenerateOutput::from_outcome(&outcome);
            if let Some((path, bytes)) = exported {
                output = output.with_export(path, bytes);
            }
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    match outcome {
        SubmitOutcome::Completed(_) => Ok(()),
        SubmitOutcome::Failed(notice) if notice.requires_credential() => {
            Err(CredentialRequired(notice.message).into())
        }
        SubmitOutcome::Failed(notice) => bail!(notice.message),
        SubmitOutcome::Rejected(reason) => bail!("Not submitted: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(prompt: &str) -> GenerateArgs {
        GenerateArgs {
            prompt: prompt.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_form_keeps_defaults_without_flags() {
        let defaults = GenerationSettings {
            ratio: AspectRatio::Square,
            fps: 30,
            ..Default::default()
        };
        assert_eq!(args("x").form(&defaults), defaults);
    }

    #[test]
    fn test_form_flags_override_defaults() {
        let mut a = args("x");
        a.ratio = Some(AspectRatio::Tall);
        a.resolution = Some(Resolution::FullHd);
        a.fps = Some(60);

        let form = a.form(&GenerationSettings::default());
        assert_eq!(form.ratio, AspectRatio::Tall);
        assert_eq!(form.resolution, Resolution::FullHd);
        assert_eq!(form.fps, 60);
        assert_eq!(form.style, VideoStyle::default());
    }

    #[test]
    fn test_prompt_appends_tags_in_order() {
        let mut a = args("  a fox in snow ");
        a.tags = vec![PromptTag::Cinematic, PromptTag::FourK];
        assert_eq!(a.prompt(), "a fox in snow, Cinematic, 4K");
    }

    #[test]
    fn test_tag_only_prompt() {
        let mut a = args("");
        a.tags = vec![PromptTag::GoldenHour];
        assert_eq!(a.prompt(), "Golden Hour");
    }
}
