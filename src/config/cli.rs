//! Command-line argument definitions for devctr.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for devctr.
#[derive(Debug, Parser)]
#[command(name = "dev")]
#[command(
    author,
    version,
    about = "Named, reusable, per-project development containers"
)]
pub struct Cli {
    /// Subcommand to execute. Defaults to `shell`.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine socket path or URL.
    #[arg(long, global = true)]
    pub engine_socket: Option<String>,

    /// Development image to use.
    #[arg(long, global = true)]
    pub image: Option<String>,

    /// Installation directory holding the environment descriptor.
    #[arg(long, global = true)]
    pub install_dir: Option<Utf8PathBuf>,
}

static DEFAULT_COMMAND: Commands = Commands::Shell;

impl Cli {
    /// Returns the selected command, treating a bare `dev` as `dev shell`.
    #[must_use]
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&DEFAULT_COMMAND)
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Enter a shell in the development container for this directory.
    Shell,

    /// Stop development containers.
    Stop(StopArgs),

    /// Delete the development container.
    Delete(TargetArgs),

    /// Show image and container status.
    Status(TargetArgs),

    /// Execute a command in the development container.
    Exec(ExecArgs),

    /// View container logs.
    Logs(LogsArgs),

    /// Remove stopped development containers.
    Cleanup(CleanupArgs),

    /// Clean up unused container engine resources.
    Prune(PruneArgs),

    /// Build the development image from the install directory.
    Build(BuildArgs),

    /// Delete the container and build the development image again.
    Rebuild(RebuildArgs),
}

/// Container selection shared by several subcommands.
#[derive(Debug, Parser)]
pub struct TargetArgs {
    /// Container name (default: derived from the current directory).
    #[arg(long)]
    pub name: Option<String>,
}

/// Arguments for the `stop` subcommand.
#[derive(Debug, Parser)]
pub struct StopArgs {
    /// Container name (default: derived from the current directory).
    #[arg(long, conflicts_with = "all")]
    pub name: Option<String>,

    /// Stop every running development container.
    #[arg(long)]
    pub all: bool,

    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Arguments for the `exec` subcommand.
#[derive(Debug, Parser)]
pub struct ExecArgs {
    /// Container name (default: derived from the current directory).
    #[arg(long)]
    pub name: Option<String>,

    /// Attach stdin and allocate a terminal.
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// Command to execute.
    #[arg(required = true, trailing_var_arg = true)]
    pub command: Vec<String>,
}

/// Arguments for the `logs` subcommand.
#[derive(Debug, Parser)]
pub struct LogsArgs {
    /// Container name (default: derived from the current directory).
    #[arg(long)]
    pub name: Option<String>,

    /// Follow log output.
    #[arg(long, short = 'f')]
    pub follow: bool,

    /// Number of lines to show from the end of the logs.
    #[arg(long, default_value_t = 100)]
    pub lines: u32,
}

/// Arguments for the `cleanup` subcommand.
#[derive(Debug, Parser)]
pub struct CleanupArgs {
    /// Also stop and remove running development containers.
    #[arg(long)]
    pub all: bool,

    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Arguments for the `prune` subcommand.
#[derive(Debug, Parser)]
pub struct PruneArgs {
    /// Also remove unused networks and all unused images.
    #[arg(long)]
    pub all: bool,

    /// Also remove unused volumes.
    #[arg(long)]
    pub volumes: bool,

    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Arguments for the `build` subcommand.
#[derive(Debug, Parser)]
pub struct BuildArgs {
    /// Build without using cached layers.
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for the `rebuild` subcommand.
#[derive(Debug, Parser)]
pub struct RebuildArgs {
    /// Container name (default: derived from the current directory).
    #[arg(long)]
    pub name: Option<String>,

    /// Build without using cached layers.
    #[arg(long)]
    pub no_cache: bool,
}
