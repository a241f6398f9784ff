//! Layered configuration loading.
//!
//! Layers are merged lowest to highest: defaults, configuration file,
//! `DEVCTR_*` environment variables, command-line flags.
//!
//! The layers are pushed into a `MergeComposer` by hand instead of going
//! through `AppConfig::load()`. The clap `Cli` owns subcommand dispatch, so
//! `OrthoConfig` cannot parse the command line itself, and the environment
//! layer here rejects unparseable typed values instead of dropping them.
//!
//! Typed environment variables fail fast: `DEVCTR_SESSION_STOP_TIMEOUT_SECS=soon`
//! is an error, not a silent fallback to the default. List-valued variables
//! (`DEVCTR_CONTAINER_CAP_ADD`, `DEVCTR_CONTAINER_SECURITY_OPT`) are
//! comma-separated; blank items are discarded.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::{AppConfig, Cli};
use crate::error::{ConfigError, Result};

/// Shape of the value carried by an environment variable.
#[derive(Clone, Copy)]
enum EnvValueKind {
    /// Taken verbatim.
    Text,
    /// Parsed as `u64`.
    Unsigned,
    /// Comma-separated list of strings.
    List,
}

/// One `DEVCTR_*` variable and where it lands in the merged document.
struct EnvBinding {
    name: &'static str,
    path: &'static [&'static str],
    kind: EnvValueKind,
}

const ENV_BINDINGS: &[EnvBinding] = &[
    EnvBinding {
        name: "DEVCTR_ENGINE_SOCKET",
        path: &["engine_socket"],
        kind: EnvValueKind::Text,
    },
    EnvBinding {
        name: "DEVCTR_IMAGE",
        path: &["image"],
        kind: EnvValueKind::Text,
    },
    EnvBinding {
        name: "DEVCTR_INSTALL_DIR",
        path: &["install_dir"],
        kind: EnvValueKind::Text,
    },
    EnvBinding {
        name: "DEVCTR_SESSION_DESCRIPTOR_FILE",
        path: &["session", "descriptor_file"],
        kind: EnvValueKind::Text,
    },
    EnvBinding {
        name: "DEVCTR_SESSION_CONTAINER_HOME",
        path: &["session", "container_home"],
        kind: EnvValueKind::Text,
    },
    EnvBinding {
        name: "DEVCTR_SESSION_SHELL",
        path: &["session", "shell"],
        kind: EnvValueKind::Text,
    },
    EnvBinding {
        name: "DEVCTR_SESSION_NAME_PREFIX",
        path: &["session", "name_prefix"],
        kind: EnvValueKind::Text,
    },
    EnvBinding {
        name: "DEVCTR_SESSION_SENTINEL_NAME",
        path: &["session", "sentinel_name"],
        kind: EnvValueKind::Text,
    },
    EnvBinding {
        name: "DEVCTR_SESSION_STOP_TIMEOUT_SECS",
        path: &["session", "stop_timeout_secs"],
        kind: EnvValueKind::Unsigned,
    },
    EnvBinding {
        name: "DEVCTR_CONTAINER_NETWORK",
        path: &["container", "network"],
        kind: EnvValueKind::Text,
    },
    EnvBinding {
        name: "DEVCTR_CONTAINER_CAP_ADD",
        path: &["container", "cap_add"],
        kind: EnvValueKind::List,
    },
    EnvBinding {
        name: "DEVCTR_CONTAINER_SECURITY_OPT",
        path: &["container", "security_opt"],
        kind: EnvValueKind::List,
    },
];

/// Returns every environment variable name the loader reads.
///
/// Tests use this to clear the `DEVCTR_*` namespace before running.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_BINDINGS.iter().map(|binding| binding.name).collect()
}

/// Load configuration with full layer precedence.
///
/// # Errors
///
/// Returns `ConfigError` when a configuration file cannot be read or parsed,
/// when a typed environment variable holds an unparseable value, or when the
/// merged layers do not deserialise into [`AppConfig`].
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(path) = discover_config_file(cli) {
        let value = read_config_file(&path)?;
        composer.push_file(value, Some(path));
    }

    let env_values = collect_env_vars()?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    AppConfig::merge_from_layers(composer.layers())
        .map_err(|e| ConfigError::OrthoConfig(e).into())
}

/// An explicit `--config` wins when the file exists; otherwise the usual
/// discovery chain applies.
fn discover_config_file(cli: &Cli) -> Option<Utf8PathBuf> {
    cli.config
        .clone()
        .filter(|path| path.exists())
        .or_else(|| {
            ConfigDiscovery::builder("devctr")
                .env_var("DEVCTR_CONFIG_PATH")
                .config_file_name("config.toml")
                .dotfile_name(".devctr.toml")
                .build()
                .candidates()
                .into_iter()
                .filter(|candidate| candidate.exists())
                .find_map(|candidate| Utf8PathBuf::try_from(candidate).ok())
        })
}

/// Read a TOML configuration file through a capability handle on its parent.
fn read_config_file(path: &Utf8Path) -> Result<Value> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;
    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    toml::from_str::<Value>(&content).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        }
        .into()
    })
}

fn collect_env_vars() -> Result<Value> {
    let mut root = Map::new();

    for binding in ENV_BINDINGS {
        let Ok(raw) = std::env::var(binding.name) else {
            continue;
        };
        insert_at_path(&mut root, binding.path, parse_env_value(binding, raw)?);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

fn parse_env_value(binding: &EnvBinding, raw: String) -> Result<Value> {
    match binding.kind {
        EnvValueKind::Text => Ok(Value::String(raw)),
        EnvValueKind::Unsigned => raw
            .trim()
            .parse::<u64>()
            .map(|number| Value::Number(number.into()))
            .map_err(|_| {
                ConfigError::InvalidValue {
                    field: binding.name.to_owned(),
                    reason: format!("expected unsigned integer, got '{raw}'"),
                }
                .into()
            }),
        EnvValueKind::List => Ok(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_owned()))
                .collect(),
        )),
    }
}

/// Insert `value` under a nested path, creating intermediate objects.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(object) = entry.as_object_mut() else {
            return;
        };
        current = object;
    }

    current.insert(field.to_owned(), value);
}

fn build_cli_overrides(cli: &Cli) -> Value {
    let overrides: Map<String, Value> = [
        ("engine_socket", cli.engine_socket.clone()),
        ("image", cli.image.clone()),
        ("install_dir", cli.install_dir.as_ref().map(ToString::to_string)),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|text| (key.to_owned(), Value::String(text))))
    .collect();

    if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    }
}
