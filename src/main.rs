//! retimbre CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use retimbre::{parse_steps, Config, Instrument, Session};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// retimbre - Re-orchestrate a recording for another instrument
#[derive(Parser)]
#[command(name = "retimbre")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace directory, overriding the configuration
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the instruments a score can be rendered for
    Instruments,

    /// Transcode and transcribe a recording into the workspace
    Ingest {
        /// Recording in any format the transcoder accepts
        recording: PathBuf,
    },

    /// Rewrite the score for an instrument and render it
    Render {
        /// Instrument key (see `instruments`)
        #[arg(short, long)]
        instrument: Option<String>,
    },

    /// Shift the rendered audio by a number of semitones
    Transpose {
        /// Semitones, between -24 and 24
        #[arg(short, long, allow_hyphen_values = true, value_parser = parse_steps)]
        steps: i32,
    },

    /// Join audio files end to end
    Concat {
        /// Files to join, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output path (default: merged.wav in the workspace)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(workspace) = &cli.workspace {
        config.workspace = workspace.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Instruments = cli.command {
        for instrument in Instrument::ALL {
            println!(
                "{:<16} {:<16} program {}",
                instrument.key(),
                instrument.display_name(),
                instrument.program()
            );
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    let session = Session::open(&config)?;

    match cli.command {
        Commands::Instruments => {}
        Commands::Ingest { recording } => {
            let report = session.ingest(&recording)?;
            println!(
                "Ingested {:.2}s at {} Hz: {} tracks, {} events",
                report.duration, report.sample_rate, report.tracks, report.events
            );
        }
        Commands::Render { instrument } => {
            let report = match instrument {
                Some(key) => session.render(&key)?,
                None => session.render_instrument(session.default_instrument())?,
            };
            println!(
                "Rendered for {}: {:.2}s, trimmed to {:.2}s",
                report.instrument.display_name(),
                report.original_duration,
                report.adjusted_duration
            );
        }
        Commands::Transpose { steps } => {
            let report = session.transpose(steps)?;
            println!(
                "Transposed {:+} semitones: {:.2}s -> {}",
                report.steps,
                report.duration,
                report.output.display()
            );
        }
        Commands::Concat { files, output } => {
            let report = session.concatenate(&files, output.as_deref())?;
            println!(
                "Joined {} files: {:.2}s -> {}",
                report.segments,
                report.duration,
                report.output.display()
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
