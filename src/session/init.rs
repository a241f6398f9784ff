//! In-container initialization run after a container is created or started.
//!
//! The script links the editor configuration from the mounted install
//! directory and hooks its shell functions into `.bashrc`. Running it again
//! changes nothing.

use camino::{Utf8Path, Utf8PathBuf};

const SHELL: &str = "/bin/sh";

/// The initialization script for one container layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitScript {
    home: Utf8PathBuf,
    install_mount: Utf8PathBuf,
}

impl InitScript {
    /// Describe a container whose user home is `home` and whose install
    /// directory is mounted at `install_mount`.
    #[must_use]
    pub fn new(home: &Utf8Path, install_mount: &Utf8Path) -> Self {
        Self {
            home: home.to_owned(),
            install_mount: install_mount.to_owned(),
        }
    }

    /// The script text.
    #[must_use]
    pub fn render(&self) -> String {
        let nvim_dir = self.home.join(".config/nvim");
        let init_lua = self.install_mount.join("config/init.lua");
        let shell_functions = self.install_mount.join("config/shell_functions");
        let bashrc = self.home.join(".bashrc");
        let source_line = format!("source {}", quote(shell_functions.as_str()));

        [
            String::from("set -e"),
            format!("mkdir -p {}", quote(nvim_dir.as_str())),
            format!(
                "ln -sf {} {}",
                quote(init_lua.as_str()),
                quote(nvim_dir.join("init.lua").as_str())
            ),
            format!("line={}", quote(&source_line)),
            format!("touch {}", quote(bashrc.as_str())),
            format!(
                "grep -qxF \"$line\" {bashrc} || printf '%s\\n' \"$line\" >> {bashrc}",
                bashrc = quote(bashrc.as_str())
            ),
            format!(
                "if [ -f {path} ]; then . {path} || true; fi",
                path = quote(shell_functions.as_str())
            ),
        ]
        .join("\n")
    }

    /// Argv running the script through `/bin/sh -c`.
    #[must_use]
    pub fn command(&self) -> Vec<String> {
        vec![String::from(SHELL), String::from("-c"), self.render()]
    }
}

/// Single-quote `value` for a POSIX shell.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
