//! CLI entry point for voxloop.

pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::audio::Voice;

/// voxloop realtime voice session runner
#[derive(Parser, Debug)]
#[command(name = "voxloop", version, about = "Realtime voice session runner")]
pub struct Cli {
    /// Config file (defaults to ~/.voxloop/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect and run one realtime session
    Run(RunArgs),
    /// Print the tool schemas advertised to the model
    Tools,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Realtime model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Assistant voice (alloy, echo, shimmer, ash, ballad, coral, sage, verse)
    #[arg(short, long)]
    pub voice: Option<Voice>,

    /// Session instructions
    #[arg(short, long)]
    pub instructions: Option<String>,

    /// Append assistant audio (raw PCM) to this file
    #[arg(long)]
    pub audio_out: Option<PathBuf>,

    /// Append response latency records (JSON lines) to this file
    #[arg(long)]
    pub latency_log: Option<PathBuf>,
}
