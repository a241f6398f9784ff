//! Configuration system for devctr.
//!
//! This module provides the configuration structures and CLI definitions for the
//! devctr application. Configuration loading and precedence merging is handled by
//! the `ortho_config` crate. Precedence: CLI flags override environment
//! variables, which override configuration files, which override defaults.
//!
//! The configuration file is expected at `~/.config/devctr/config.toml` by default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///var/run/docker.sock"
//! image = "devctr-dev:latest"
//! install_dir = "/home/user/.dev"
//!
//! [session]
//! descriptor_file = "dev.env"
//! container_home = "/home/me"
//! shell = "/bin/bash"
//! name_prefix = "dev"
//! sentinel_name = "dev-main"
//! stop_timeout_secs = 1
//!
//! [container]
//! network = "bridge"
//! cap_add = ["SYS_PTRACE"]
//! security_opt = ["seccomp=unconfined"]
//! ```

mod cli;
mod loader;
mod types;


pub use cli::{
    BuildArgs, CleanupArgs, Cli, Commands, ExecArgs, LogsArgs, PruneArgs, RebuildArgs, StopArgs,
    TargetArgs,
};
pub use loader::{env_var_names, load_config};
pub use types::{
    AppConfig, ContainerConfig, DEFAULT_IMAGE, DEFAULT_INSTALL_DIR_NAME, SessionConfig,
};
