//! Mapping the host working directory to its place inside the container.

use camino::{Utf8Path, Utf8PathBuf};

use crate::descriptor::EnvironmentDescriptor;

/// Resolve the in-container working directory for `cwd`.
///
/// The first mount, in declaration order, whose host path contains `cwd`
/// wins, even when a later mount is more specific. Without a match the
/// descriptor's default working directory is used.
#[must_use]
pub fn resolve_workdir(cwd: &Utf8Path, descriptor: &EnvironmentDescriptor) -> Utf8PathBuf {
    descriptor
        .mounts
        .iter()
        .find_map(|mount| {
            let rest = cwd.strip_prefix(&mount.host_path).ok()?;
            if rest.as_str().is_empty() {
                Some(mount.container_path.clone())
            } else {
                Some(mount.container_path.join(rest))
            }
        })
        .unwrap_or_else(|| descriptor.default_workdir.clone())
}
