use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scenescribe::config::Config;
use scenescribe::pipeline::{self, SplitOptions, TranscribeOptions};
use scenescribe::transcribe::WhisperClient;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "scenescribe")]
#[command(version, about = "Split videos into scenes and transcribe them")]
#[command(
    long_about = "Detect scene boundaries in a folder of videos, extract per-scene clips, \
thumbnails and audio, and record everything in a resumable CSV manifest."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Split each video into per-scene clips and thumbnail images
    Split {
        /// Folder containing video files
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output folder (clips, images, and the scenes.csv ledger)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Split videos into scenes and transcribe each scene's audio
    Transcribe {
        /// Folder containing video files
        folder: PathBuf,

        /// Output folder
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    match cli.command {
        Command::Split { input, output } => {
            let opts = SplitOptions {
                input: input.unwrap_or_else(|| config.split_input.clone()),
                output: output.unwrap_or_else(|| config.split_output.clone()),
                detector: config.detector,
                show_progress: true,
            };

            info!("Input:  {}", opts.input.display());
            info!("Output: {}", opts.output.display());

            let stats = pipeline::run_split(&opts)?;
            pipeline::print_summary(&stats, &opts.output.join("scenes.csv"));
        }
        Command::Transcribe { folder, output } => {
            config
                .validate_for_transcribe()
                .context("Configuration validation failed")?;
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

            let opts = TranscribeOptions {
                input: folder,
                output: output.unwrap_or_else(|| config.transcribe_output.clone()),
                detector: config.detector,
                show_progress: true,
            };

            info!("Input:  {}", opts.input.display());
            info!("Output: {}", opts.output.display());

            let transcriber = WhisperClient::new(api_key);
            let stats = pipeline::run_transcribe(&opts, &transcriber).await?;
            pipeline::print_summary(&stats, &opts.output.join("scenes.csv"));
        }
    }

    Ok(())
}
