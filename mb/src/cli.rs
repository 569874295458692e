//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// MindBranch - branching ideation sessions
#[derive(Parser)]
#[command(
    name = "mb",
    about = "Turn a problem into 'How might we' statements and a branching tree of ideas",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive ideation session
    Run {
        /// Answer the target audience question up front
        #[arg(short = 'a', long)]
        target_audience: Option<String>,

        /// Answer the problem question up front
        #[arg(short, long)]
        problem: Option<String>,

        /// Write the mindmap JSON here when the session ends
        #[arg(short, long)]
        export_dir: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Output format
        #[arg(short, long, default_value = "yaml")]
        format: OutputFormat,
    },

    /// List prompt templates, or print one
    Prompts {
        /// Template name (e.g. problem-statement)
        name: Option<String>,
    },
}

/// Output format for the config command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use yaml or json", s)),
        }
    }
}

/// Where log output goes
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mindbranch")
        .join("logs")
        .join("mindbranch.log")
}
