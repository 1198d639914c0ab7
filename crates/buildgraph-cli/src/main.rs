//! buildgraph CLI tool.

use buildgraph_core::BuildEvent;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "buildgraph")]
#[command(about = "Compile pipeline definitions into a build plan", long_about = None)]
struct Cli {
    /// Compiler configuration file
    #[arg(long, global = true, env = "BUILDGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Image for the implicit clone step
    #[arg(long, global = true, env = "BUILDGRAPH_CLONE_IMAGE")]
    clone_image: Option<String>,

    /// Platform for pipelines that do not name one
    #[arg(long, global = true, env = "BUILDGRAPH_PLATFORM")]
    platform: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile definitions against a build and print the plan
    Compile {
        /// Definition files; `.buildgraph.kdl` is the unnamed pipeline
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        build: BuildArgs,

        /// Print the compiled items as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that definitions parse and their dependencies resolve
    Validate {
        /// Definition files
        #[arg(default_value = ".buildgraph.kdl")]
        files: Vec<PathBuf>,
    },
}

/// The triggering build, as far as the compiler cares.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Branch being built
    #[arg(long, env = "BUILDGRAPH_BRANCH", default_value = "main")]
    pub branch: String,

    /// Event that triggered the build
    #[arg(long, env = "BUILDGRAPH_EVENT", default_value = "push")]
    pub event: BuildEvent,

    /// Commit SHA
    #[arg(long, env = "BUILDGRAPH_COMMIT", default_value = "")]
    pub commit: String,

    /// Git reference (defaults to refs/heads/<branch>)
    #[arg(long = "ref", env = "BUILDGRAPH_REF")]
    pub git_ref: Option<String>,

    /// Commit message
    #[arg(long, env = "BUILDGRAPH_MESSAGE", default_value = "")]
    pub message: String,

    /// Commit author
    #[arg(long, env = "BUILDGRAPH_AUTHOR", default_value = "")]
    pub author: String,

    /// Build number
    #[arg(long, env = "BUILDGRAPH_NUMBER", default_value = "1")]
    pub number: u64,

    /// Deployment target, for deployment events
    #[arg(long, env = "BUILDGRAPH_DEPLOY_TO", default_value = "")]
    pub deploy_to: String,

    /// Repository as owner/name
    #[arg(long, env = "BUILDGRAPH_REPO", default_value = "local/repo")]
    pub repo: String,

    /// Base URL of the CI server
    #[arg(long, env = "BUILDGRAPH_LINK", default_value = "")]
    pub link: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = commands::load_config(cli.config.as_deref())?;
    if let Some(image) = cli.clone_image {
        config.clone_image = image;
    }
    if let Some(platform) = cli.platform {
        config.default_platform = platform;
    }

    match cli.command {
        Commands::Compile { files, build, json } => {
            commands::compile(&files, &build, config, json)?;
        }
        Commands::Validate { files } => {
            commands::validate(&files, config)?;
        }
    }

    Ok(())
}
