//! MindBranch - branching ideation sessions
//!
//! CLI entry point.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use mindbranch::cli::{Cli, Command, OutputFormat, get_log_path};
use mindbranch::config::Config;
use mindbranch::driver::{self, ConsoleChannel};
use mindbranch::export;
use mindbranch::llm::create_client;
use mindbranch::prompts::{PromptLoader, Template};
use mindbranch::session::{InputValues, Workflow, WorkflowConfig, input};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn prompt_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn prompt_loader(config: &Config) -> PromptLoader {
    let loader = PromptLoader::new(prompt_root());
    match &config.session.prompts_dir {
        Some(dir) => loader.with_override_dir(dir),
        None => loader,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "MindBranch loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None => cmd_run(&config, None, None, None).await,
        Some(Command::Run {
            target_audience,
            problem,
            export_dir,
        }) => cmd_run(&config, target_audience, problem, export_dir).await,
        Some(Command::Config { format }) => cmd_config(&config, format),
        Some(Command::Prompts { name }) => cmd_prompts(&config, name.as_deref()),
    }
}

async fn cmd_run(
    config: &Config,
    target_audience: Option<String>,
    problem: Option<String>,
    export_dir: Option<PathBuf>,
) -> Result<()> {
    debug!(?export_dir, "cmd_run: called");
    config.validate()?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let prompts = Arc::new(prompt_loader(config));
    let mut workflow = Workflow::new(llm, prompts, WorkflowConfig::from(&config.session))?;

    let mut prefill = InputValues::new();
    if let Some(value) = target_audience {
        prefill.insert(input::TARGET_AUDIENCE.to_string(), value);
    }
    if let Some(value) = problem {
        prefill.insert(input::PROBLEM.to_string(), value);
    }
    let mut channel = ConsoleChannel::new()?.with_prefill(prefill);

    println!("{}", "MindBranch ideation session".bold());
    println!("{}", "Press Ctrl-D at any prompt to finish.".dimmed());

    driver::run_workflow(&mut workflow, &mut channel).await?;

    let session = workflow.session();
    println!("\n{}", driver::summary(session).bold());

    let export_dir = export_dir.or_else(|| config.session.export_dir.clone());
    if let Some(dir) = export_dir {
        match session.mindmap() {
            Some(mindmap) => {
                let path = export::write_mindmap(&dir, &mindmap)?;
                println!("Mindmap written to {}", path.display());
            }
            None => warn!("No mindmap to export"),
        }
    }
    Ok(())
}

fn cmd_config(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_config: called");
    let text = match format {
        OutputFormat::Yaml => serde_yaml::to_string(config).context("Failed to serialize config")?,
        OutputFormat::Json => serde_json::to_string_pretty(config).context("Failed to serialize config")?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

fn cmd_prompts(config: &Config, name: Option<&str>) -> Result<()> {
    debug!(?name, "cmd_prompts: called");
    let loader = prompt_loader(config);
    match name {
        Some(name) => {
            let source = loader.load_template(name)?;
            println!("{}", source.trim_end());
        }
        None => {
            for template in Template::ALL {
                println!("{}", template.name());
            }
        }
    }
    Ok(())
}
