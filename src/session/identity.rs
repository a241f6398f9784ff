//! Container identity: which container belongs to the current directory.

use std::fmt;

use camino::Utf8Path;
use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 4;

/// Name of the container serving one directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerIdentity(String);

impl ContainerIdentity {
    /// Wrap an explicit container name, such as one given with `--name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The container name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How container names are derived from directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    prefix: String,
    sentinel: String,
}

impl NamingScheme {
    /// Create a scheme naming containers `<prefix>-<fingerprint>`, and the
    /// install directory's container `sentinel`.
    #[must_use]
    pub fn new(prefix: impl Into<String>, sentinel: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sentinel: sentinel.into(),
        }
    }

    /// Derive the identity for `cwd`.
    ///
    /// Both paths are compared component-wise, so `/a/b` and `/a/b/` agree.
    /// Callers canonicalise them first; this function does no I/O.
    #[must_use]
    pub fn identity(&self, cwd: &Utf8Path, install_root: &Utf8Path) -> ContainerIdentity {
        if cwd == install_root {
            return ContainerIdentity(self.sentinel.clone());
        }
        ContainerIdentity(format!("{}-{}", self.prefix, fingerprint(cwd)))
    }

    /// Whether `name` was produced by this scheme.
    #[must_use]
    pub fn owns(&self, name: &str) -> bool {
        name == self.sentinel || name.starts_with(&self.list_prefix())
    }

    /// Name prefix shared by every directory-derived container.
    #[must_use]
    pub fn list_prefix(&self) -> String {
        format!("{}-", self.prefix)
    }

    /// Name of the install directory's container.
    #[must_use]
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }
}

/// First eight lowercase hex characters of the SHA-256 of the path.
fn fingerprint(path: &Utf8Path) -> String {
    let digest = Sha256::digest(path.as_str().as_bytes());
    let leading: Vec<u8> = digest.iter().take(FINGERPRINT_BYTES).copied().collect();
    hex::encode(leading)
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn scheme() -> NamingScheme {
        NamingScheme::new("dev", "dev-main")
    }

    #[rstest]
    fn identity_is_deterministic(scheme: NamingScheme) {
        let cwd = Utf8Path::new("/home/alice/src/api");
        let install = Utf8Path::new("/home/alice/.dev");

        let first = scheme.identity(cwd, install);
        let second = scheme.identity(cwd, install);

        assert_eq!(first, second);
    }

    #[rstest]
    fn identity_is_prefix_and_eight_hex_characters(scheme: NamingScheme) {
        let identity = scheme.identity(
            Utf8Path::new("/home/alice/src/api"),
            Utf8Path::new("/home/alice/.dev"),
        );

        let fingerprint = identity
            .as_str()
            .strip_prefix("dev-")
            .expect("identity should carry the prefix");
        assert_eq!(fingerprint.len(), 8);
        assert!(
            fingerprint
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)),
            "fingerprint should be lowercase hex: {fingerprint}"
        );
    }

    #[rstest]
    fn fingerprint_is_leading_sha256_hex() {
        // sha256("abc") = ba7816bf...
        assert_eq!(fingerprint(Utf8Path::new("abc")), "ba7816bf");
    }

    #[rstest]
    fn different_directories_get_different_names(scheme: NamingScheme) {
        let install = Utf8Path::new("/home/alice/.dev");
        assert_ne!(
            scheme.identity(Utf8Path::new("/home/alice/src/api"), install),
            scheme.identity(Utf8Path::new("/home/alice/src/web"), install)
        );
    }

    #[rstest]
    #[case::exact("/home/alice/.dev")]
    #[case::trailing_slash("/home/alice/.dev/")]
    fn install_root_maps_to_sentinel(scheme: NamingScheme, #[case] cwd: &str) {
        let identity = scheme.identity(Utf8Path::new(cwd), Utf8Path::new("/home/alice/.dev"));
        assert_eq!(identity.as_str(), "dev-main");
    }

    #[rstest]
    fn child_of_install_root_is_not_the_sentinel(scheme: NamingScheme) {
        let identity = scheme.identity(
            Utf8Path::new("/home/alice/.dev/config"),
            Utf8Path::new("/home/alice/.dev"),
        );
        assert_ne!(identity.as_str(), "dev-main");
    }

    #[rstest]
    #[case("dev-main", true)]
    #[case("dev-1a2b3c4d", true)]
    #[case("devtools", false)]
    #[case("postgres", false)]
    fn scheme_recognises_its_own_names(
        scheme: NamingScheme,
        #[case] name: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(scheme.owns(name), expected);
    }
}
