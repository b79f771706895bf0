use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "appforge")]
#[command(version, about = "Build apps on a remote app builder backend")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Never prompt; missing inputs are treated as empty
    #[arg(long, global = true)]
    pub yes: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Path to appforge.toml. Defaults to .appforge/appforge.toml in the project directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a build and follow it to completion
    Build {
        /// App name (lowercase letters, digits, hyphens)
        #[arg(short, long)]
        name: Option<String>,

        /// What the app should do
        #[arg(short, long)]
        description: Option<String>,

        /// Reference image to attach (repeatable, order is kept)
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,

        /// Model id (defaults to build.default_model)
        #[arg(short, long)]
        model: Option<String>,

        /// Referrer of the embedding page; selects local or tenant backend
        #[arg(long)]
        referrer: Option<String>,
    },
    /// Check an app name against the naming rules
    CheckName { name: String },
    /// Show which backend a referrer resolves to
    Resolve {
        #[arg(long)]
        referrer: Option<String>,
    },
    /// Probe Firebase services
    Probe {
        #[arg(value_enum, default_value = "all")]
        target: ProbeTarget,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ProbeTarget {
    Auth,
    Firestore,
    Storage,
    Functions,
    All,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default appforge.toml file
    Init,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "appforge=debug" } else { "appforge=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Build {
            name,
            description,
            images,
            model,
            referrer,
        } => {
            cmd::cmd_build(
                &cli,
                &project_dir,
                cmd::BuildArgs {
                    name: name.clone(),
                    description: description.clone(),
                    images: images.clone(),
                    model: model.clone(),
                    referrer: referrer.clone(),
                },
            )
            .await?;
        }
        Commands::CheckName { name } => cmd::cmd_check_name(name)?,
        Commands::Resolve { referrer } => {
            cmd::cmd_resolve(&cli, &project_dir, referrer.as_deref())?
        }
        Commands::Probe { target } => cmd::cmd_probe(&cli, &project_dir, *target).await?,
        Commands::Config { command } => {
            cmd::cmd_config(&project_dir, cli.config.as_deref(), command.clone())?
        }
    }

    Ok(())
}
