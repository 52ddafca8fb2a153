use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "devhost",
    version,
    about = "Local backend environment: containers, migrations and a routing proxy"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Use a specific config file
    #[arg(short = 'f', long = "file", global = true)]
    pub config_file: Option<PathBuf>,

    /// Show debug logs
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the local environment and serve it until interrupted
    Dev {
        /// Port of the routing proxy (overrides `project.proxy_port`)
        #[arg(short, long)]
        port: Option<u16>,

        /// Apply migrations against the linked cloud project
        #[arg(long)]
        linked: bool,

        /// Skip seeding on first run
        #[arg(long)]
        no_seed: bool,
    },
    /// Stop all running containers
    Down,
    /// Stop and remove all containers and the network
    Purge,
    /// Print or save the logs of a service
    Logs {
        /// Service name
        service: String,

        /// Write the logs to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Execute a command inside a running service
    Execute {
        /// Service name
        service: String,
        /// Command to execute
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Check that dependencies are installed
    Doctor,
    /// Validate the configuration file
    Validate,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
