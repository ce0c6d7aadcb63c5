//! batchgen - Split long text into segments and drive them through a generator

mod command;
mod logging;

use anyhow::{Context, Result};
use batchgen::overlap::DEFAULT_TAIL_CHARS;
use batchgen::{
    BackoffKind, BatchEvent, BatchOrchestrator, BatchOutcome, BatchRun, BatchSummary,
    BatchgenConfig, SegmentPolicy, SrtEncoder, build_subtitles, clean_text, segment,
};
use clap::{Parser, Subcommand, ValueEnum};
use command::ShellGenerator;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "batchgen")]
#[command(about = "Split long text into segments and drive them through a generator", long_about = None)]
#[command(version)]
struct Args {
    /// Enable debug output
    #[arg(short, long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the segments of a text file
    Split {
        /// Input text file
        file: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Print segments as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write timed subtitles for a text file
    Srt {
        /// Input text file
        file: PathBuf,

        /// Output file path (default: <file>.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Characters per subtitle
        #[arg(long)]
        chars: Option<usize>,

        /// Seconds each subtitle is shown
        #[arg(long)]
        display: Option<f64>,

        /// Seconds between subtitles
        #[arg(long)]
        pause: Option<f64>,

        /// Skip typography cleanup
        #[arg(long)]
        no_clean: bool,
    },
    /// Run every segment through a shell command
    Run(RunArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Input text file
    file: PathBuf,

    /// Command run once per segment (segment on stdin, result on stdout)
    #[arg(short, long)]
    command: String,

    #[command(flatten)]
    policy: PolicyArgs,

    /// Directory for segment outputs and summary.json
    #[arg(short, long, default_value = "batchgen-output")]
    output_dir: PathBuf,

    /// Pass earlier output as BATCHGEN_CONTEXT and trim repeated context
    #[arg(long)]
    continuation: bool,

    /// Retry wait shape
    #[arg(long, value_enum)]
    backoff: Option<BackoffArg>,

    /// Attempts per segment, including the first
    #[arg(long)]
    max_retries: Option<u32>,

    /// Pause between segments in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Kill a command that runs longer than this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Extra passes over failed segments after the main run
    #[arg(long, default_value_t = 0)]
    retry_failed: u32,
}

#[derive(clap::Args, Debug)]
struct PolicyArgs {
    /// Segmentation policy
    #[arg(long, value_enum, default_value = "sentences")]
    policy: PolicyKind,

    /// Maximum characters per segment (words, sentences)
    #[arg(long)]
    max_chars: Option<usize>,

    /// Number of parts (parts)
    #[arg(long)]
    parts: Option<usize>,

    /// Re-split lines longer than this (lines)
    #[arg(long)]
    auto_split: Option<usize>,

    /// Skip typography cleanup
    #[arg(long)]
    no_clean: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyKind {
    Words,
    Sentences,
    Parts,
    Lines,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackoffArg {
    Fixed,
    Progressive,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key to set (e.g. max_chars, backoff)
        key: String,
        /// New value
        value: String,
    },
}

impl PolicyArgs {
    fn to_policy(&self, config: &BatchgenConfig) -> Result<SegmentPolicy> {
        let max_chars = self.max_chars.unwrap_or(config.max_chars);
        let policy = match self.policy {
            PolicyKind::Words => SegmentPolicy::Words { max_chars },
            PolicyKind::Sentences => SegmentPolicy::Sentences { max_chars },
            PolicyKind::Parts => SegmentPolicy::Proportional {
                parts: self
                    .parts
                    .context("--parts is required with --policy parts")?,
            },
            PolicyKind::Lines => SegmentPolicy::Lines {
                auto_split: self.auto_split,
            },
        };
        Ok(policy)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.debug);

    match &args.command {
        Commands::Split { file, policy, json } => handle_split(file, policy, *json),
        Commands::Srt {
            file,
            output,
            chars,
            display,
            pause,
            no_clean,
        } => handle_srt(file, output.as_deref(), *chars, *display, *pause, *no_clean),
        Commands::Run(run_args) => handle_run(run_args).await,
        Commands::Config { action } => handle_config_command(action),
    }
}

/// Read the input file, applying cleanup unless disabled.
fn load_text(path: &Path, no_clean: bool, config: &BatchgenConfig) -> Result<String> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if config.clean_text && !no_clean {
        Ok(clean_text(&text))
    } else {
        Ok(text)
    }
}

fn handle_split(path: &Path, policy_args: &PolicyArgs, json: bool) -> Result<()> {
    let config = BatchgenConfig::load().context("Failed to load configuration")?;
    let text = load_text(path, policy_args.no_clean, &config)?;
    let policy = policy_args.to_policy(&config)?;
    let segments = segment(&text, &policy)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&segments)?);
        return Ok(());
    }

    for seg in &segments {
        println!("[{}] ({} chars)", seg.index, seg.char_count);
        println!("{}", seg.text);
        println!();
    }
    eprintln!("{} segments ({} policy)", segments.len(), policy.name());
    Ok(())
}

fn handle_srt(
    path: &Path,
    output: Option<&Path>,
    chars: Option<usize>,
    display: Option<f64>,
    pause: Option<f64>,
    no_clean: bool,
) -> Result<()> {
    let config = BatchgenConfig::load().context("Failed to load configuration")?;
    let text = load_text(path, no_clean, &config)?;

    let subtitles = build_subtitles(
        &text,
        chars.unwrap_or(config.chars_per_subtitle),
        display.unwrap_or(config.display_seconds),
        pause.unwrap_or(config.pause_seconds),
    )?;

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.with_extension("srt"));
    let file = fs::File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;

    let mut encoder = SrtEncoder::new(BufWriter::new(file));
    for timed in &subtitles {
        encoder.write_segment(timed)?;
    }
    encoder.close()?;

    eprintln!(
        "Wrote {} subtitles to {}",
        subtitles.len(),
        output_path.display()
    );
    Ok(())
}

async fn handle_run(args: &RunArgs) -> Result<()> {
    let mut config = BatchgenConfig::load().context("Failed to load configuration")?;
    if let Some(max_retries) = args.max_retries {
        config.max_retries = max_retries;
    }
    if let Some(backoff) = args.backoff {
        config.backoff = match backoff {
            BackoffArg::Fixed => BackoffKind::Fixed,
            BackoffArg::Progressive => BackoffKind::Progressive,
        };
    }
    if let Some(delay_ms) = args.delay_ms {
        config.inter_item_delay_ms = delay_ms;
    }

    let text = load_text(&args.file, args.policy.no_clean, &config)?;
    let policy = args.policy.to_policy(&config)?;
    let segments = segment(&text, &policy)?;
    if segments.is_empty() {
        anyhow::bail!("No text to process in {}", args.file.display());
    }

    let mut generator = ShellGenerator::new(&args.command, segments.len());
    if let Some(secs) = args.timeout_secs {
        generator = generator.with_timeout(Duration::from_secs(secs));
    }
    if args.continuation {
        generator = generator.with_continuation(DEFAULT_TAIL_CHARS);
    }

    let orchestrator = BatchOrchestrator::new(generator, config.batch_options()?)?;
    let mut run = BatchRun::new(segments)?;

    // Ctrl-C stops the run after the segment in flight.
    let cancel = run.cancel_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling after the current segment...");
            cancel.request_cancel();
        }
    });

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    eprintln!(
        "Processing {} segments ({} policy)...",
        run.items().len(),
        policy.name()
    );

    let pb = ProgressBar::new(run.items().len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let mut on_event = |event: &BatchEvent| match event {
        BatchEvent::ItemStarted { index } => pb.set_message(format!("segment {}", index)),
        BatchEvent::AttemptFailed {
            index,
            attempt,
            error,
            retry_in: Some(delay),
        } => pb.println(format!(
            "  segment {} attempt {} failed, retrying in {:.1}s: {}",
            index,
            attempt,
            delay.as_secs_f64(),
            error
        )),
        BatchEvent::AttemptFailed {
            index,
            attempt,
            error,
            retry_in: None,
        } => pb.println(format!(
            "  segment {} failed after {} attempts: {}",
            index, attempt, error
        )),
        BatchEvent::ItemFinished { .. } => {}
        BatchEvent::Progress { current, total } => {
            pb.set_length(*total as u64);
            pb.set_position(*current as u64);
        }
    };

    let mut summary = orchestrator.run(&mut run, &mut on_event).await;

    for pass in 1..=args.retry_failed {
        if summary.failed_count == 0 || run.is_cancel_requested() {
            break;
        }
        pb.println(format!(
            "Retry pass {}/{}: {} failed segments",
            pass, args.retry_failed, summary.failed_count
        ));
        pb.reset();
        summary = orchestrator.retry_failed(&mut run, &mut on_event).await;
    }

    pb.finish_with_message("done");

    let written = write_outputs(&args.output_dir, &run, &summary)?;
    eprintln!(
        "\n{} ({} files in {})",
        summary,
        written,
        args.output_dir.display()
    );
    for failure in summary.failures() {
        eprintln!("  {}", failure);
    }

    match summary.outcome() {
        BatchOutcome::AllSucceeded => Ok(()),
        BatchOutcome::PartialSuccess { failed } => {
            anyhow::bail!("{} segment(s) failed", failed)
        }
        BatchOutcome::Cancelled { completed, total } => {
            anyhow::bail!("Cancelled with {} of {} segments processed", completed, total)
        }
    }
}

/// Write one file per successful segment plus `summary.json`; returns the segment file count.
fn write_outputs(dir: &Path, run: &BatchRun<String>, summary: &BatchSummary) -> Result<usize> {
    let mut written = 0;
    for item in run.items() {
        if let Some(text) = item.result() {
            let path = dir.join(segment_file_name(item.segment().index));
            fs::write(&path, format!("{}\n", text))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += 1;
        }
    }

    let summary_path = dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(summary)?)
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;

    Ok(written)
}

fn segment_file_name(index: usize) -> String {
    format!("segment_{:04}.txt", index)
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = BatchgenConfig::load()?;
            println!("Configuration file: {:?}", BatchgenConfig::config_path()?);
            println!();
            println!("max_chars = {}", config.max_chars);
            println!("chars_per_subtitle = {}", config.chars_per_subtitle);
            println!("display_seconds = {}", config.display_seconds);
            println!("pause_seconds = {}", config.pause_seconds);
            println!("max_retries = {}", config.max_retries);
            println!("backoff = {:?}", config.backoff);
            println!("retry_delay_ms = {}", config.retry_delay_ms);
            println!("progressive_step_ms = {}", config.progressive_step_ms);
            println!("inter_item_delay_ms = {}", config.inter_item_delay_ms);
            println!("clean_text = {}", config.clean_text);
        }
        ConfigAction::Set { key, value } => {
            let mut config = BatchgenConfig::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("{} set to: {}", key, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchgen::{BatchOptions, MockGenerator, RetryPolicy, Segment};
    use tempfile::TempDir;

    fn policy_args(policy: PolicyKind) -> PolicyArgs {
        PolicyArgs {
            policy,
            max_chars: None,
            parts: None,
            auto_split: None,
            no_clean: false,
        }
    }

    #[test]
    fn test_cli_parses() {
        let args = Args::try_parse_from([
            "batchgen",
            "run",
            "book.txt",
            "--command",
            "cat",
            "--policy",
            "parts",
            "--parts",
            "3",
            "--retry-failed",
            "2",
            "-d",
        ])
        .unwrap();
        assert!(args.debug);
        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.retry_failed, 2);
        assert_eq!(run.policy.parts, Some(3));
    }

    #[test]
    fn test_policy_from_args() {
        let config = BatchgenConfig::default();

        let policy = policy_args(PolicyKind::Words).to_policy(&config).unwrap();
        assert_eq!(policy, SegmentPolicy::Words { max_chars: 280 });

        assert!(policy_args(PolicyKind::Parts).to_policy(&config).is_err());

        let mut args = policy_args(PolicyKind::Lines);
        args.auto_split = Some(40);
        assert_eq!(
            args.to_policy(&config).unwrap(),
            SegmentPolicy::Lines {
                auto_split: Some(40)
            }
        );
    }

    #[test]
    fn test_segment_file_name() {
        assert_eq!(segment_file_name(7), "segment_0007.txt");
    }

    #[tokio::test]
    async fn test_write_outputs() {
        let dir = TempDir::new().unwrap();
        let segments = vec![
            Segment::new(0, "first"),
            Segment::new(1, "second"),
            Segment::new(2, "third"),
        ];
        let options = BatchOptions::new()
            .with_retry(RetryPolicy::immediate(1))
            .with_inter_item_delay(Duration::ZERO);
        let orchestrator =
            BatchOrchestrator::new(MockGenerator::always_succeeds().always_fails(1), options)
                .unwrap();
        let mut run = BatchRun::new(segments).unwrap();
        let summary = orchestrator.run(&mut run, |_| {}).await;

        let written = write_outputs(dir.path(), &run, &summary).unwrap();
        assert_eq!(written, 2);
        assert!(dir.path().join("segment_0000.txt").exists());
        assert!(!dir.path().join("segment_0001.txt").exists());

        let content = fs::read_to_string(dir.path().join("segment_0002.txt")).unwrap();
        assert_eq!(content, "artifact-2: third\n");

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(json["success_count"], 2);
        assert_eq!(json["items"][1]["status"], "failed");
    }
}
