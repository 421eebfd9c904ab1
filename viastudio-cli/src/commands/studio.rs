//! Studio command - interactive generation session.
//!
//! Plain lines are prompts. Lines starting with `:` change the form, browse
//! the session history or manage the key.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use viastudio_core::{
    AspectRatio, AttemptId, DurationTag, GenerationRequest, GenerationSettings, NoticeKind,
    PromptTag, Resolution, SubmitOutcome, VideoStyle, append_tag,
};
use viastudio_store::SettingsStore;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};
use crate::session::Session;

const HELP: &str = "\
Type a prompt and press Enter to generate.

  :ratio <16:9|9:16|1:1>        aspect ratio
  :resolution <720p|1080p>      resolution
  :style <name>                 realistic, cinematic, anime, motion-graphic
  :duration <5s|10s>            duration preset
  :fps <n>                      frames per second
  :tag <name>|clear             add a tag to the next prompt
  :settings                     show the current form
  :save                         save the form as the default
  :history                      list generated videos
  :select <n|id>                show a video from the history
  :export <file>                save the shown video
  :key                          select an API key
  :help                         this help
  :quit                         leave the studio";

/// One parsed studio input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioCommand {
    Generate(String),
    Ratio(AspectRatio),
    Resolution(Resolution),
    Style(VideoStyle),
    Duration(DurationTag),
    Fps(u32),
    Tag(PromptTag),
    ClearTags,
    Settings,
    Save,
    History,
    Select(String),
    Export(PathBuf),
    Key,
    Help,
    Quit,
    Empty,
}

/// Parses one input line.
///
/// # Errors
///
/// Returns a message for unknown commands and bad or missing arguments.
pub fn parse_line(line: &str) -> Result<StudioCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(StudioCommand::Empty);
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(StudioCommand::Generate(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let parsed = |what: &str| required(name, arg, what);

    match name {
        "ratio" => parse_arg(parsed("an aspect ratio")?).map(StudioCommand::Ratio),
        "resolution" | "res" => parse_arg(parsed("a resolution")?).map(StudioCommand::Resolution),
        "style" => parse_arg(parsed("a style")?).map(StudioCommand::Style),
        "duration" => parse_arg(parsed("a duration")?).map(StudioCommand::Duration),
        "fps" => match parsed("a frame rate")?.parse::<u32>() {
            Ok(fps) if fps > 0 => Ok(StudioCommand::Fps(fps)),
            _ => Err(format!("invalid frame rate '{arg}'")),
        },
        "tag" => match parsed("a tag")? {
            "clear" => Ok(StudioCommand::ClearTags),
            tag => parse_arg(tag).map(StudioCommand::Tag),
        },
        "settings" => Ok(StudioCommand::Settings),
        "save" => Ok(StudioCommand::Save),
        "history" | "h" => Ok(StudioCommand::History),
        "select" => Ok(StudioCommand::Select(parsed("a history number or id")?.to_string())),
        "export" => Ok(StudioCommand::Export(PathBuf::from(parsed("a file name")?))),
        "key" => Ok(StudioCommand::Key),
        "help" | "?" => Ok(StudioCommand::Help),
        "quit" | "q" | "exit" => Ok(StudioCommand::Quit),
        other => Err(format!("unknown command ':{other}' (try :help)")),
    }
}

fn required<'a>(name: &str, arg: &'a str, what: &str) -> Result<&'a str, String> {
    if arg.is_empty() {
        Err(format!(":{name} needs {what}"))
    } else {
        Ok(arg)
    }
}

fn parse_arg<T>(value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| e.to_string())
}

/// Runs the studio until `:quit`, end of input or Ctrl-C.
pub async fn run(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let session = Session::open(cli, store).await?;
    let formatter = TextFormatter::new(cli.use_colors());
    let mut form = store.generation().await;
    let mut tags: Vec<PromptTag> = Vec::new();

    if !cli.quiet {
        println!("VIA Studio. Type a prompt, or :help for commands.");
    }
    if !session.controller.gate().refresh().await {
        println!("No API key selected. Use :key to choose one.");
    }

    let progress = cli.show_progress().then(|| session.print_progress(formatter));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("viastudio› ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(line) = line else {
            break;
        };

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        debug!(?command, "Studio input");

        match command {
            StudioCommand::Empty => {}
            StudioCommand::Generate(prompt) => {
                let prompt = tags.drain(..).fold(prompt, |p, tag| append_tag(&p, tag));
                if generate(&session, cli, &formatter, &prompt, &form).await? {
                    break;
                }
            }
            StudioCommand::Ratio(ratio) => form.ratio = ratio,
            StudioCommand::Resolution(resolution) => form.resolution = resolution,
            StudioCommand::Style(style) => form.style = style,
            StudioCommand::Duration(duration) => form.duration = duration,
            StudioCommand::Fps(fps) => form.fps = fps,
            StudioCommand::Tag(tag) => {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            StudioCommand::ClearTags => tags.clear(),
            StudioCommand::Settings => println!("{}", formatter.format_form(&form, &tags)),
            StudioCommand::Save => {
                store.set_generation(form.clone()).await;
                store.save().await?;
                println!("Saved to {}", store.path().display());
            }
            StudioCommand::History => {
                let state = session.controller.state();
                let selected = state.current_result();
                match cli.format {
                    OutputFormat::Text => println!(
                        "{}",
                        formatter.format_history(state.history(), selected.map(|a| &a.id))
                    ),
                    OutputFormat::Json => println!(
                        "{}",
                        JsonFormatter::new(cli.pretty).format_history(state.history(), selected)?
                    ),
                }
            }
            StudioCommand::Select(which) => select(&session, &formatter, &which),
            StudioCommand::Export(path) => export(&session, &formatter, &path).await,
            StudioCommand::Key => {
                let state = session.controller.gate().request_selection().await;
                println!("{}", formatter.format_gate(state, None));
            }
            StudioCommand::Help => println!("{HELP}"),
            StudioCommand::Quit => break,
        }
    }

    if let Some(progress) = progress {
        progress.abort();
    }
    Ok(())
}

/// Submits one prompt. Returns true if the session should end.
async fn generate(
    session: &Session,
    cli: &Cli,
    formatter: &TextFormatter,
    prompt: &str,
    form: &GenerationSettings,
) -> Result<bool> {
    if !session.controller.gate().is_usable() {
        println!("No usable API key. Use :key to choose one.");
        return Ok(false);
    }

    let interrupt = session.cancel_on_ctrl_c();
    let outcome = session
        .controller
        .submit(GenerationRequest::new(prompt, form))
        .await;
    interrupt.abort();

    match cli.format {
        OutputFormat::Text => match &outcome {
            SubmitOutcome::Completed(attempt) => println!("{}", formatter.format_attempt(attempt)),
            SubmitOutcome::Failed(notice) => println!("{}", formatter.format_notice(notice)),
            SubmitOutcome::Rejected(reason) => println!("{}", formatter.format_reject(*reason)),
        },
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_outcome(&outcome)?);
        }
    }

    Ok(matches!(
        outcome,
        SubmitOutcome::Failed(notice) if notice.kind == NoticeKind::Cancelled
    ))
}

fn select(session: &Session, formatter: &TextFormatter, which: &str) {
    let state = session.controller.state();
    let id = match which.parse::<usize>() {
        Ok(n) if (1..=state.history().len()).contains(&n) => state.history()[n - 1].id.clone(),
        _ => AttemptId::from(which),
    };

    if session.controller.select_history_entry(&id) {
        if let Some(attempt) = session.controller.state().current_result() {
            println!("{}", formatter.format_attempt(attempt));
        }
    } else {
        println!("No history entry '{which}'.");
    }
}

async fn export(session: &Session, formatter: &TextFormatter, path: &std::path::Path) {
    let state = session.controller.state();
    let Some(reference) = state.current_result().and_then(|a| a.result.as_ref()) else {
        println!("No video selected.");
        return;
    };

    match session.exporter.export(reference, path).await {
        Ok(bytes) => println!("{}", formatter.format_export(path, bytes)),
        Err(e) => println!("Export failed: {e}"),
    }
}
