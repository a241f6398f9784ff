//! Configuration data types for devctr.

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};

/// Image used when neither configuration nor CLI names one.
pub const DEFAULT_IMAGE: &str = "devctr-dev:latest";

/// Installation directory, relative to `$HOME`, used when none is configured.
pub const DEFAULT_INSTALL_DIR_NAME: &str = ".dev";

/// Session resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// File name of the environment descriptor inside the install directory.
    pub descriptor_file: String,

    /// Home directory of the user inside the container.
    pub container_home: Utf8PathBuf,

    /// Shell attached for interactive sessions.
    pub shell: String,

    /// Prefix for directory-derived container names.
    pub name_prefix: String,

    /// Container name used when invoked from the install directory itself.
    pub sentinel_name: String,

    /// Grace period given to containers on stop.
    pub stop_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            descriptor_file: String::from("dev.env"),
            container_home: Utf8PathBuf::from("/home/me"),
            shell: String::from("/bin/bash"),
            name_prefix: String::from("dev"),
            sentinel_name: String::from("dev-main"),
            stop_timeout_secs: 1,
        }
    }
}

/// Host-level options applied to newly created containers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Network mode for the container.
    pub network: String,

    /// Linux capabilities added to the container.
    pub cap_add: Vec<String>,

    /// Security options passed to the engine.
    pub security_opt: Vec<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            network: String::from("bridge"),
            cap_add: vec![String::from("SYS_PTRACE")],
            security_opt: vec![String::from("seccomp=unconfined")],
        }
    }
}

/// Root application configuration.
///
/// This structure is loaded from configuration files, environment variables,
/// and command-line arguments with layered precedence. The precedence order
/// (lowest to highest) is: defaults, configuration file, environment variables,
/// command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `DEVCTR_CONFIG_PATH` environment variable
/// 2. `.devctr.toml` in the current working directory
/// 3. `.devctr.toml` in the home directory
/// 4. `~/.config/devctr/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "DEVCTR",
    post_merge_hook,
    discovery(
        app_name = "devctr",
        env_var = "DEVCTR_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".devctr.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The container engine socket path or URL.
    pub engine_socket: Option<String>,

    /// The development image reference.
    pub image: Option<String>,

    /// Installation directory holding the descriptor and shared tooling.
    #[ortho_config(skip_cli)]
    pub install_dir: Option<Utf8PathBuf>,

    /// Session resolution settings.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub session: SessionConfig,

    /// Host options for newly created containers.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub container: ContainerConfig,
}

impl AppConfig {
    /// Returns the configured image, or [`DEFAULT_IMAGE`].
    #[must_use]
    pub fn image_ref(&self) -> &str {
        self.image
            .as_deref()
            .map(str::trim)
            .filter(|image| !image.is_empty())
            .unwrap_or(DEFAULT_IMAGE)
    }
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // Blank strings from env or file layers mean "use the default".
        if self.session.shell.trim().is_empty() {
            self.session.shell = SessionConfig::default().shell;
        }
        if self.session.descriptor_file.trim().is_empty() {
            self.session.descriptor_file = SessionConfig::default().descriptor_file;
        }
        Ok(())
    }
}
