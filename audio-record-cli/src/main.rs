mod commands;
mod events;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "audio-record")]
#[command(about = "Record the microphone to a WAV file", long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory recordings are written under
    #[arg(long, global = true)]
    pub storage_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Record until Enter is pressed or the duration elapses
    Record(RecordArgs),
    /// List input devices
    Devices,
    /// Report whether a microphone is present and accessible
    Check,
    /// Remove scratch files left by interrupted recordings
    Cleanup,
}

#[derive(ClapArgs, Debug)]
pub struct RecordArgs {
    /// Recording options as JSON, e.g. '{"sampleRate":16000,"wavFile":"take.wav"}'
    #[arg(long)]
    pub options: Option<String>,

    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// 1 (mono) or 2 (stereo)
    #[arg(long)]
    pub channels: Option<u16>,

    /// 8 or 16
    #[arg(long)]
    pub bits_per_sample: Option<u16>,

    /// Input source code (0-10)
    #[arg(long)]
    pub audio_source: Option<u32>,

    /// Output file, relative to the storage root
    #[arg(long)]
    pub wav_file: Option<String>,

    /// Input device name (see `devices`)
    #[arg(long)]
    pub device: Option<String>,

    /// Stop automatically after this many seconds (required when stdin is not a terminal)
    #[arg(long)]
    pub seconds: Option<f64>,

    /// Print every recorder event to stdout as a JSON line
    #[arg(long)]
    pub events: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let storage_root = cli.storage_root.unwrap_or_else(commands::default_storage_root);
    match cli.command {
        CliCommand::Record(args) => commands::record(&storage_root, args),
        CliCommand::Devices => commands::list_devices(),
        CliCommand::Check => commands::check(),
        CliCommand::Cleanup => commands::cleanup(),
    }
}
