//! Session settings resolved once from the loaded configuration.

use camino::{Utf8Path, Utf8PathBuf};

use super::identity::NamingScheme;
use crate::config::{AppConfig, DEFAULT_INSTALL_DIR_NAME};
use crate::descriptor::{DescriptorDefaults, DescriptorParser, EnvironmentDescriptor};
use crate::engine::HostOptions;
use crate::error::{ConfigError, DevctrError, Result};

/// Everything a session needs from configuration, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Image reference for new containers.
    pub image: String,
    /// Host install directory, canonicalised when it exists.
    pub install_dir: Utf8PathBuf,
    /// Descriptor file name inside the install directory.
    pub descriptor_file: String,
    /// User home inside the container.
    pub container_home: Utf8PathBuf,
    /// Shell attached for interactive sessions.
    pub shell: String,
    /// Container naming rules.
    pub naming: NamingScheme,
    /// Grace period for stops.
    pub stop_timeout_secs: u64,
    /// Host options for new containers.
    pub host: HostOptions,
}

impl SessionSettings {
    /// Resolve settings from `config`, reading `HOME` from `env` when the
    /// install directory is not configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when no install directory is
    /// configured and `HOME` is unset.
    pub fn from_config<E: mockable::Env>(config: &AppConfig, env: &E) -> Result<Self> {
        let install_dir = resolve_install_dir(config.install_dir.as_deref(), env)?;
        let session = &config.session;

        Ok(Self {
            image: String::from(config.image_ref()),
            install_dir,
            descriptor_file: session.descriptor_file.clone(),
            container_home: session.container_home.clone(),
            shell: session.shell.clone(),
            naming: NamingScheme::new(&session.name_prefix, &session.sentinel_name),
            stop_timeout_secs: session.stop_timeout_secs,
            host: HostOptions::from_container_config(&config.container),
        })
    }

    /// Location of the environment descriptor.
    #[must_use]
    pub fn descriptor_path(&self) -> Utf8PathBuf {
        self.install_dir.join(&self.descriptor_file)
    }

    /// Where the install directory appears inside the container.
    #[must_use]
    pub fn install_mount_target(&self) -> Utf8PathBuf {
        self.container_home.join(DEFAULT_INSTALL_DIR_NAME)
    }

    /// Defaults handed to the descriptor parser.
    #[must_use]
    pub fn descriptor_defaults(&self) -> DescriptorDefaults {
        DescriptorDefaults {
            default_workdir: self.container_home.clone(),
            install_dir: self.install_dir.clone(),
            install_mount_target: self.install_mount_target(),
        }
    }

    /// Read the environment descriptor fresh from disk.
    #[must_use]
    pub fn load_descriptor<E: mockable::Env>(&self, env: &E) -> EnvironmentDescriptor {
        let defaults = self.descriptor_defaults();
        DescriptorParser::new(env, &defaults).parse(&self.descriptor_path())
    }
}

fn resolve_install_dir<E: mockable::Env>(
    configured: Option<&Utf8Path>,
    env: &E,
) -> Result<Utf8PathBuf> {
    let raw = match configured.filter(|dir| !dir.as_str().trim().is_empty()) {
        Some(dir) => Utf8PathBuf::from(
            shellexpand::tilde_with_context(dir.as_str(), || env.string("HOME")).as_ref(),
        ),
        None => env
            .string("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| Utf8PathBuf::from(home).join(DEFAULT_INSTALL_DIR_NAME))
            .ok_or_else(|| {
                DevctrError::from(ConfigError::MissingRequired {
                    field: String::from("install_dir"),
                })
            })?,
    };

    Ok(raw.canonicalize_utf8().unwrap_or(raw))
}

#[cfg(test)]
mod tests {
    use mockable::MockEnv;
    use rstest::rstest;

    use super::*;

    fn env_with_home(home: Option<&'static str>) -> MockEnv {
        let mut env = MockEnv::new();
        env.expect_string()
            .returning(move |key| (key == "HOME").then_some(home).flatten().map(String::from));
        env
    }

    #[rstest]
    fn install_dir_defaults_under_home() {
        let settings =
            SessionSettings::from_config(&AppConfig::default(), &env_with_home(Some("/nowhere/alice")))
                .expect("settings should resolve");

        assert_eq!(settings.install_dir, Utf8PathBuf::from("/nowhere/alice/.dev"));
        assert_eq!(
            settings.descriptor_path(),
            Utf8PathBuf::from("/nowhere/alice/.dev/dev.env")
        );
        assert_eq!(settings.install_mount_target(), Utf8PathBuf::from("/home/me/.dev"));
        assert_eq!(settings.image, crate::config::DEFAULT_IMAGE);
    }

    #[rstest]
    fn configured_install_dir_expands_tilde() {
        let config = AppConfig {
            install_dir: Some(Utf8PathBuf::from("~/tools/dev")),
            ..AppConfig::default()
        };

        let settings = SessionSettings::from_config(&config, &env_with_home(Some("/nowhere/bob")))
            .expect("settings should resolve");

        assert_eq!(settings.install_dir, Utf8PathBuf::from("/nowhere/bob/tools/dev"));
    }

    #[rstest]
    fn existing_install_dir_is_canonicalised() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .expect("temp path should be UTF-8");
        std::fs::create_dir(root.join("real")).expect("dir should be created");
        let config = AppConfig {
            install_dir: Some(root.join("real/../real")),
            ..AppConfig::default()
        };

        let settings = SessionSettings::from_config(&config, &env_with_home(None))
            .expect("settings should resolve");

        let expected = root
            .join("real")
            .canonicalize_utf8()
            .expect("dir should canonicalise");
        assert_eq!(settings.install_dir, expected);
    }

    #[rstest]
    fn missing_home_without_install_dir_is_an_error() {
        let result = SessionSettings::from_config(&AppConfig::default(), &env_with_home(None));
        assert!(
            matches!(
                result,
                Err(DevctrError::Config(ConfigError::MissingRequired { ref field }))
                    if field == "install_dir"
            ),
            "unexpected result: {result:?}"
        );
    }

    #[rstest]
    fn descriptor_defaults_use_container_home() {
        let settings =
            SessionSettings::from_config(&AppConfig::default(), &env_with_home(Some("/nowhere/alice")))
                .expect("settings should resolve");
        let defaults = settings.descriptor_defaults();
        assert_eq!(defaults.default_workdir, Utf8PathBuf::from("/home/me"));
        assert_eq!(defaults.install_dir, Utf8PathBuf::from("/nowhere/alice/.dev"));
    }
}
