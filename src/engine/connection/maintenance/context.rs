//! Packs a host directory into the tar stream the build endpoint expects.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tar::{Builder, EntryType, Header};

/// The file whose presence turns a directory into a build context.
pub(super) const DOCKERFILE: &str = "Dockerfile";

/// Archive every regular file and directory below `root`.
///
/// Entry names are relative to `root` and sorted, so the same tree always
/// packs to the same bytes. Symlinks, sockets and devices are skipped.
pub(super) fn pack_build_context(root: &Utf8Path) -> io::Result<Vec<u8>> {
    let root_dir = Dir::open_ambient_dir(root, ambient_authority())?;
    if !root_dir.is_file(DOCKERFILE) {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no {DOCKERFILE} in {root}"),
        ));
    }

    let mut archive = Builder::new(Vec::new());
    let mut pending = vec![(root_dir, Utf8PathBuf::new())];
    while let Some((dir, prefix)) = pending.pop() {
        for (name, is_dir) in listing(&dir)? {
            let relative = prefix.join(&name);
            if is_dir {
                append_entry(&mut archive, &relative, EntryType::Directory, 0, io::empty())?;
                pending.push((dir.open_dir(&name)?, relative));
            } else {
                let size = dir.metadata(&name)?.len();
                let file = dir.open(&name)?;
                append_entry(&mut archive, &relative, EntryType::Regular, size, file)?;
            }
        }
    }

    archive.into_inner()
}

/// Directories and regular files in `dir`, by name.
fn listing(dir: &Dir) -> io::Result<Vec<(String, bool)>> {
    let mut names = Vec::new();
    for found in dir.entries()? {
        let entry = found?;
        let kind = entry.file_type()?;
        if kind.is_dir() || kind.is_file() {
            names.push((entry.file_name()?, kind.is_dir()));
        }
    }
    names.sort();
    Ok(names)
}

fn append_entry<R: io::Read>(
    archive: &mut Builder<Vec<u8>>,
    relative: &Utf8Path,
    kind: EntryType,
    size: u64,
    data: R,
) -> io::Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(kind);
    header.set_size(size);
    header.set_mode(if kind == EntryType::Directory { 0o755 } else { 0o644 });
    header.set_cksum();

    let name = if kind == EntryType::Directory {
        format!("{relative}/")
    } else {
        relative.as_str().replace('\\', "/")
    };
    archive.append_data(&mut header, name, data)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use rstest::rstest;

    use super::*;

    fn entries(bytes: &[u8]) -> Vec<(String, String)> {
        let mut archive = tar::Archive::new(bytes);
        archive
            .entries()
            .expect("archive should be readable")
            .map(|read| {
                let mut entry = read.expect("entry should be readable");
                let path = entry
                    .path()
                    .expect("entry should have a path")
                    .to_string_lossy()
                    .into_owned();
                let mut contents = String::new();
                entry
                    .read_to_string(&mut contents)
                    .expect("entry should be UTF-8");
                (path, contents)
            })
            .collect()
    }

    #[rstest]
    fn packs_files_and_nested_directories_relative_to_the_root() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let root = Utf8Path::from_path(temp.path()).expect("tempdir should be UTF-8");
        std::fs::write(root.join("Dockerfile"), "FROM debian:stable\n")
            .expect("write Dockerfile");
        std::fs::create_dir_all(root.join("config/nvim")).expect("create config dirs");
        std::fs::write(root.join("config/nvim/init.lua"), "vim.o.number = true\n")
            .expect("write init.lua");

        let packed = pack_build_context(root).expect("context should pack");
        let listed = entries(&packed);

        assert!(listed.contains(&(
            String::from("Dockerfile"),
            String::from("FROM debian:stable\n")
        )));
        assert!(listed.iter().any(|(path, _)| path.trim_end_matches('/') == "config"));
        assert!(listed.contains(&(
            String::from("config/nvim/init.lua"),
            String::from("vim.o.number = true\n")
        )));
        assert!(listed.iter().all(|(path, _)| !path.starts_with('/')));
    }

    #[rstest]
    fn a_directory_without_a_dockerfile_is_not_a_build_context() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let root = Utf8Path::from_path(temp.path()).expect("tempdir should be UTF-8");
        std::fs::write(root.join("dev.env"), "PORT=8080:80\n").expect("write descriptor");

        let error = pack_build_context(root).expect_err("packing should fail");

        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert!(error.to_string().contains("no Dockerfile"));
    }
}
