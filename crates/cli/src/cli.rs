use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sitepurge")]
#[command(about = "Per-page CSS purging for static site builds", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, short = 'l', global = true, value_enum, default_value = "info", help = "Log level")]
    pub level: LogLevel,

    #[arg(long, global = true, value_enum, default_value = "compact", help = "Log output format")]
    pub log_format: TracingFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Replay a recorded build through the purge pipeline")]
    Run {
        #[arg(long, short = 'm', help = "Build manifest (JSON)")]
        manifest: PathBuf,

        #[arg(long, short = 'c', help = "Purge options file (TOML or JSON)")]
        config: Option<PathBuf>,

        #[arg(long, help = "Project root; defaults to the manifest's or the current directory")]
        root: Option<PathBuf>,

        #[arg(
            long = "engine-command",
            env = "SITEPURGE_ENGINE",
            help = "Program implementing the purge engine protocol"
        )]
        engine_command: String,

        #[arg(last = true, help = "Arguments passed to the engine program")]
        engine_args: Vec<String>,
    },

    #[command(about = "Print the cache key for a list of dependency files")]
    Key {
        #[arg(required = true, help = "Files in dependency order")]
        files: Vec<PathBuf>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
