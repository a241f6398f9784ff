//! Environment descriptor parsing.
//!
//! The descriptor is a line-oriented `KEY=value` file, read fresh on every
//! invocation, that tells devctr what to mount, which ports to publish, which
//! environment variables to set, and where to land when the current directory
//! is not under any mount:
//!
//! ```text
//! # dev.env
//! MOUNT=~/src:/home/me/src
//! MOUNT=$DATA_ROOT/shared:/data:ro
//! PORT=8080:80
//! DEFAULT_WORKDIR=/home/me/src
//! EDITOR=nvim
//! ```
//!
//! Parsing never fails. Unknown or malformed lines degrade to warnings, and a
//! missing file yields an empty descriptor. Whatever the input, the result
//! mounts the install directory when nothing else was accepted, so the
//! in-container tooling stays reachable.


use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tracing::{info, warn};

const MOUNT_KEY: &str = "MOUNT";
const PORT_KEY: &str = "PORT";
const DEFAULT_WORKDIR_KEY: &str = "DEFAULT_WORKDIR";

/// A host directory bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Expanded, existing host path.
    pub host_path: Utf8PathBuf,
    /// Target path inside the container.
    pub container_path: Utf8PathBuf,
    /// Engine bind options such as `ro`; empty when none were given.
    pub options: String,
}

impl Mount {
    /// Render the mount in the engine's `host:container[:options]` bind form.
    #[must_use]
    pub fn bind_spec(&self) -> String {
        if self.options.is_empty() {
            format!("{}:{}", self.host_path, self.container_path)
        } else {
            format!(
                "{}:{}:{}",
                self.host_path, self.container_path, self.options
            )
        }
    }
}

/// Parsed environment descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescriptor {
    /// Accepted mounts in declaration order.
    pub mounts: Vec<Mount>,
    /// `host:container` port entries in declaration order, stored verbatim.
    pub ports: Vec<String>,
    /// Environment variables for the container.
    pub env_vars: BTreeMap<String, String>,
    /// Working directory used when no mount covers the current directory.
    pub default_workdir: Utf8PathBuf,
}

impl EnvironmentDescriptor {
    /// Create an empty descriptor with the given fallback working directory.
    #[must_use]
    pub const fn empty(default_workdir: Utf8PathBuf) -> Self {
        Self {
            mounts: Vec::new(),
            ports: Vec::new(),
            env_vars: BTreeMap::new(),
            default_workdir,
        }
    }

    /// Environment variables in the engine's `KEY=value` form.
    #[must_use]
    pub fn env_list(&self) -> Vec<String> {
        self.env_vars
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }
}

/// Values the parser needs from the session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorDefaults {
    /// Working directory used until a `DEFAULT_WORKDIR` line overrides it.
    pub default_workdir: Utf8PathBuf,
    /// Host install directory mounted when no other mount is accepted.
    pub install_dir: Utf8PathBuf,
    /// Container path of the install directory mount.
    pub install_mount_target: Utf8PathBuf,
}

/// Reads environment descriptors, expanding `~` and `$VAR` in host paths.
pub struct DescriptorParser<'a, E: mockable::Env> {
    env: &'a E,
    defaults: &'a DescriptorDefaults,
}

impl<'a, E: mockable::Env> DescriptorParser<'a, E> {
    /// Create a parser reading variables from `env`.
    #[must_use]
    pub const fn new(env: &'a E, defaults: &'a DescriptorDefaults) -> Self {
        Self { env, defaults }
    }

    /// Parse the descriptor at `path`.
    ///
    /// A missing or unreadable file produces an empty descriptor plus the
    /// install directory mount, and a notice telling the user what happened.
    #[must_use]
    pub fn parse(&self, path: &Utf8Path) -> EnvironmentDescriptor {
        match read_descriptor(path) {
            Ok(Some(content)) => self.parse_str(&content),
            Ok(None) => {
                info!("Notice: {path} not found; using defaults.");
                info!("Create it with MOUNT=, PORT= and DEFAULT_WORKDIR= lines to customise the container.");
                self.finish(EnvironmentDescriptor::empty(
                    self.defaults.default_workdir.clone(),
                ))
            }
            Err(error) => {
                warn!("could not read {path}: {error}; using defaults");
                self.finish(EnvironmentDescriptor::empty(
                    self.defaults.default_workdir.clone(),
                ))
            }
        }
    }

    /// Parse descriptor text.
    #[must_use]
    pub fn parse_str(&self, content: &str) -> EnvironmentDescriptor {
        let mut descriptor = EnvironmentDescriptor::empty(self.defaults.default_workdir.clone());

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((raw_key, raw_value)) = line.split_once('=') else {
                continue;
            };
            let key = raw_key.trim();
            let value = raw_value.trim();

            match key {
                MOUNT_KEY => {
                    if let Some(mount) = self.parse_mount(value) {
                        descriptor.mounts.push(mount);
                    }
                }
                PORT_KEY => {
                    if value.contains(':') {
                        descriptor.ports.push(value.to_owned());
                    } else {
                        warn!("Port entry '{value}' is not HOST:CONTAINER. Ignored.");
                    }
                }
                DEFAULT_WORKDIR_KEY => descriptor.default_workdir = Utf8PathBuf::from(value),
                _ => {
                    descriptor
                        .env_vars
                        .insert(key.to_owned(), value.to_owned());
                }
            }
        }

        self.finish(descriptor)
    }

    fn parse_mount(&self, value: &str) -> Option<Mount> {
        let mut parts = value.split(':');
        let (Some(raw_host), Some(container)) = (parts.next(), parts.next()) else {
            warn!("Mount entry '{value}' is not HOST:CONTAINER[:OPTIONS]. Ignored.");
            return None;
        };
        if raw_host.is_empty() || container.is_empty() {
            warn!("Mount entry '{value}' has an empty path. Ignored.");
            return None;
        }

        let host_path = Utf8PathBuf::from(self.expand(raw_host));
        if !host_path.exists() {
            warn!("Host path '{host_path}' does not exist. Mount ignored.");
            return None;
        }

        Some(Mount {
            host_path,
            container_path: Utf8PathBuf::from(container),
            options: parts.next().unwrap_or_default().to_owned(),
        })
    }

    /// Expand a leading `~` and any `$VAR`/`${VAR}` references.
    ///
    /// Unknown variables are left in place.
    #[must_use]
    pub fn expand(&self, raw: &str) -> String {
        shellexpand::full_with_context_no_errors(
            raw,
            || self.env.string("HOME"),
            |name: &str| self.env.string(name),
        )
        .into_owned()
    }

    fn finish(&self, mut descriptor: EnvironmentDescriptor) -> EnvironmentDescriptor {
        if !descriptor.mounts.is_empty() {
            return descriptor;
        }

        warn!("No valid mounts found in the environment descriptor.");
        let install_dir = &self.defaults.install_dir;
        if install_dir.exists() {
            info!(
                "Adding default mount for {install_dir}:{}",
                self.defaults.install_mount_target
            );
            descriptor.mounts.push(Mount {
                host_path: install_dir.clone(),
                container_path: self.defaults.install_mount_target.clone(),
                options: String::new(),
            });
        } else {
            warn!("Install directory {install_dir} does not exist; the container starts without mounts.");
        }
        descriptor
    }
}

/// Read the descriptor, distinguishing "absent" from "unreadable".
fn read_descriptor(path: &Utf8Path) -> std::io::Result<Option<String>> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let Some(file_name) = path.file_name() else {
        return Ok(None);
    };

    let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error),
    };

    match dir.read_to_string(file_name) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}
