//! Single-pass path operations: directory creation, copy, move,
//! permission and ownership changes, and pattern listing.
//!
//! These are the collaborators around the watch core. Each call validates
//! that its paths are absolute, performs one pass over them, and propagates
//! the first failure. No loop-carried state.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use nix::unistd::{chown as unix_chown, Gid, Group, Uid, User};
use walkdir::WalkDir;

use crate::error::FsOpError;

fn ensure_absolute(path: &Path) -> Result<(), FsOpError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(FsOpError::NotAbsolute(path.to_path_buf()))
    }
}

/// Create the given directories if they do not exist yet, parents included.
pub fn make_dirs(paths: &[PathBuf]) -> Result<(), FsOpError> {
    for path in paths {
        ensure_absolute(path)?;

        if path.exists() {
            tracing::info!("directory {} already exists, skipping creation", path.display());
            continue;
        }

        fs::create_dir_all(path).map_err(|source| FsOpError::Mkdir {
            path: path.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Copy files or directory trees to a destination.
///
/// A file source is copied into a directory destination or onto a file
/// destination. A directory source requires a directory destination and is
/// copied to `destination/<source-basename>`.
pub fn copy(sources: &[PathBuf], destination: &Path) -> Result<(), FsOpError> {
    for source in sources {
        ensure_absolute(source)?;
        tracing::info!("copy {} to {}", source.display(), destination.display());

        if source.is_dir() {
            if !destination.is_dir() {
                return Err(FsOpError::NotADirectory(destination.to_path_buf()));
            }
            let target = destination.join(base_name(source)?);
            copy_tree(source, &target)?;
        } else {
            let target = file_target(source, destination)?;
            fs::copy(source, &target).map_err(|source_err| FsOpError::Copy {
                path: source.clone(),
                source: source_err,
            })?;
        }
    }
    Ok(())
}

/// Move files or directory trees to a destination. Falls back to
/// copy-and-remove when a rename crosses a filesystem boundary.
pub fn move_paths(sources: &[PathBuf], destination: &Path) -> Result<(), FsOpError> {
    ensure_absolute(destination)?;

    for source in sources {
        ensure_absolute(source)?;
        tracing::info!("move {} to {}", source.display(), destination.display());

        let is_dir = source.is_dir();
        if is_dir && !destination.is_dir() {
            return Err(FsOpError::NotADirectory(destination.to_path_buf()));
        }

        let target = if is_dir {
            destination.join(base_name(source)?)
        } else {
            file_target(source, destination)?
        };

        if fs::rename(source, &target).is_ok() {
            continue;
        }

        // Rename failed, likely across filesystems.
        let fallback = if is_dir {
            copy_tree(source, &target)
                .map_err(|err| match err {
                    FsOpError::Copy { path, source } => FsOpError::Move { path, source },
                    other => other,
                })
                .and_then(|_| {
                    fs::remove_dir_all(source).map_err(|source_err| FsOpError::Move {
                        path: source.clone(),
                        source: source_err,
                    })
                })
        } else {
            fs::copy(source, &target)
                .and_then(|_| fs::remove_file(source))
                .map_err(|source_err| FsOpError::Move {
                    path: source.clone(),
                    source: source_err,
                })
        };
        fallback?;
    }
    Ok(())
}

/// Set POSIX permissions from an octal mode string such as "755".
///
/// For a directory: the directory itself is always changed; `recursive`
/// descends the whole tree, otherwise only its direct child files are
/// touched. `only_dirs` leaves files alone.
pub fn chmod(
    paths: &[PathBuf],
    mode: &str,
    recursive: bool,
    only_dirs: bool,
) -> Result<(), FsOpError> {
    let bits = u32::from_str_radix(mode, 8).map_err(|_| FsOpError::BadMode(mode.to_string()))?;

    for path in paths {
        ensure_absolute(path)?;

        if path.is_dir() {
            set_mode(path, bits)?;
            if recursive {
                for entry in WalkDir::new(path).min_depth(1) {
                    let entry = entry.map_err(|err| FsOpError::Walk {
                        path: path.clone(),
                        source: io::Error::from(err),
                    })?;
                    if only_dirs && !entry.file_type().is_dir() {
                        continue;
                    }
                    set_mode(entry.path(), bits)?;
                }
            } else if !only_dirs {
                for child in direct_child_files(path)? {
                    set_mode(&child, bits)?;
                }
            }
        } else {
            set_mode(path, bits)?;
        }
    }
    Ok(())
}

/// Set file ownership. At least one of `user` / `group` must be given;
/// either may be a name or a numeric id. Recursion rules match `chmod`.
pub fn chown(
    paths: &[PathBuf],
    user: Option<&str>,
    group: Option<&str>,
    recursive: bool,
    only_dirs: bool,
) -> Result<(), FsOpError> {
    if user.is_none() && group.is_none() {
        return Err(FsOpError::MissingOwner);
    }
    let uid = user.map(resolve_uid).transpose()?;
    let gid = group.map(resolve_gid).transpose()?;

    for path in paths {
        ensure_absolute(path)?;

        if path.is_dir() {
            set_owner(path, uid, gid)?;
            if recursive {
                for entry in WalkDir::new(path).min_depth(1) {
                    let entry = entry.map_err(|err| FsOpError::Walk {
                        path: path.clone(),
                        source: io::Error::from(err),
                    })?;
                    if only_dirs && !entry.file_type().is_dir() {
                        continue;
                    }
                    set_owner(entry.path(), uid, gid)?;
                }
            } else if !only_dirs {
                for child in direct_child_files(path)? {
                    set_owner(&child, uid, gid)?;
                }
            }
        } else {
            set_owner(path, uid, gid)?;
        }
    }
    Ok(())
}

/// List files under the given paths matching a glob pattern. With
/// `recursive`, the pattern is applied at every depth. `names_only`
/// returns bare file names instead of full paths.
pub fn glob_files(
    paths: &[PathBuf],
    pattern: &str,
    recursive: bool,
    names_only: bool,
) -> Result<Vec<String>, FsOpError> {
    for path in paths {
        ensure_absolute(path)?;
    }

    let pattern = if recursive && !pattern.contains("**") {
        format!("**/{pattern}")
    } else {
        pattern.to_string()
    };

    let mut files = Vec::new();
    for path in paths {
        let full = path.join(&pattern);
        for entry in glob::glob(&full.to_string_lossy())? {
            match entry {
                Ok(found) => {
                    let rendered = if names_only {
                        found
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_default()
                    } else {
                        found.to_string_lossy().into_owned()
                    };
                    files.push(rendered);
                }
                Err(err) => {
                    tracing::warn!("skipping unreadable glob entry: {}", err);
                }
            }
        }
    }
    Ok(files)
}

fn base_name(source: &Path) -> Result<&std::ffi::OsStr, FsOpError> {
    source.file_name().ok_or_else(|| FsOpError::Copy {
        path: source.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
    })
}

fn file_target(source: &Path, destination: &Path) -> Result<PathBuf, FsOpError> {
    if destination.is_dir() {
        Ok(destination.join(base_name(source)?))
    } else {
        Ok(destination.to_path_buf())
    }
}

fn copy_tree(source: &Path, target: &Path) -> Result<(), FsOpError> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|err| FsOpError::Copy {
            path: source.to_path_buf(),
            source: io::Error::from(err),
        })?;
        let rel = match entry.path().strip_prefix(source) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let dest = target.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|source_err| FsOpError::Copy {
                path: entry.path().to_path_buf(),
                source: source_err,
            })?;
        } else {
            fs::copy(entry.path(), &dest).map_err(|source_err| FsOpError::Copy {
                path: entry.path().to_path_buf(),
                source: source_err,
            })?;
        }
    }
    Ok(())
}

fn direct_child_files(path: &Path) -> Result<Vec<PathBuf>, FsOpError> {
    let wrap = |source: io::Error| FsOpError::Walk {
        path: path.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(wrap)? {
        let entry = entry.map_err(wrap)?;
        let child = entry.path();
        if child.is_file() {
            files.push(child);
        }
    }
    Ok(files)
}

fn set_mode(path: &Path, bits: u32) -> Result<(), FsOpError> {
    fs::set_permissions(path, fs::Permissions::from_mode(bits)).map_err(|source| {
        FsOpError::Chmod {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn set_owner(path: &Path, uid: Option<Uid>, gid: Option<Gid>) -> Result<(), FsOpError> {
    unix_chown(path, uid, gid).map_err(|source| FsOpError::Chown {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_uid(name: &str) -> Result<Uid, FsOpError> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(Uid::from_raw(id));
    }
    match User::from_name(name) {
        Ok(Some(user)) => Ok(user.uid),
        _ => Err(FsOpError::UnknownUser(name.to_string())),
    }
}

fn resolve_gid(name: &str) -> Result<Gid, FsOpError> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(Gid::from_raw(id));
    }
    match Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid),
        _ => Err(FsOpError::UnknownGroup(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_make_dirs_creates_nested_paths() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let nested = dir.path().join("a/b/c");

        make_dirs(&[nested.clone()]).expect("mkdir failed");
        assert!(nested.is_dir());

        // Existing directories are skipped, not an error.
        make_dirs(&[nested]).expect("second mkdir failed");
    }

    #[test]
    fn test_relative_path_rejected() {
        let result = make_dirs(&[PathBuf::from("rel/dir")]);
        assert!(matches!(result, Err(FsOpError::NotAbsolute(_))));
    }

    #[test]
    fn test_copy_file_into_directory() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let src = dir.path().join("a.txt");
        let dest = dir.path().join("out");
        fs::write(&src, "payload").expect("write failed");
        fs::create_dir(&dest).expect("mkdir failed");

        copy(&[src], &dest).expect("copy failed");

        let copied = fs::read_to_string(dest.join("a.txt")).expect("read failed");
        assert_eq!(copied, "payload");
    }

    #[test]
    fn test_copy_directory_tree() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let src = dir.path().join("tree");
        let dest = dir.path().join("out");
        fs::create_dir_all(src.join("sub")).expect("mkdir failed");
        fs::write(src.join("sub/deep.txt"), "x").expect("write failed");
        fs::create_dir(&dest).expect("mkdir failed");

        copy(&[src], &dest).expect("copy failed");

        assert!(dest.join("tree/sub/deep.txt").is_file());
    }

    #[test]
    fn test_copy_directory_requires_directory_destination() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let src = dir.path().join("tree");
        let dest = dir.path().join("not-a-dir.txt");
        fs::create_dir(&src).expect("mkdir failed");
        fs::write(&dest, "").expect("write failed");

        let result = copy(&[src], &dest);
        assert!(matches!(result, Err(FsOpError::NotADirectory(_))));
    }

    #[test]
    fn test_move_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let src = dir.path().join("a.txt");
        let dest = dir.path().join("out");
        fs::write(&src, "payload").expect("write failed");
        fs::create_dir(&dest).expect("mkdir failed");

        move_paths(&[src.clone()], &dest).expect("move failed");

        assert!(!src.exists());
        assert!(dest.join("a.txt").is_file());
    }

    #[test]
    fn test_chmod_file_mode() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let file = dir.path().join("a.sh");
        fs::write(&file, "#!/bin/sh\n").expect("write failed");

        chmod(&[file.clone()], "755", false, false).expect("chmod failed");

        let mode = fs::metadata(&file).expect("stat failed").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_chmod_rejects_bad_mode_string() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let result = chmod(&[dir.path().to_path_buf()], "rwx", false, false);
        assert!(matches!(result, Err(FsOpError::BadMode(_))));
    }

    #[test]
    fn test_chmod_only_dirs_leaves_files_alone() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("sub")).expect("mkdir failed");
        let file = root.join("sub/a.txt");
        fs::write(&file, "x").expect("write failed");
        chmod(&[file.clone()], "600", false, false).expect("chmod failed");

        chmod(&[root.clone()], "750", true, true).expect("chmod failed");

        let file_mode = fs::metadata(&file).expect("stat failed").permissions().mode();
        let dir_mode = fs::metadata(root.join("sub"))
            .expect("stat failed")
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);
        assert_eq!(dir_mode & 0o777, 0o750);
    }

    #[test]
    fn test_chown_requires_user_or_group() {
        let result = chown(&[PathBuf::from("/tmp")], None, None, false, false);
        assert!(matches!(result, Err(FsOpError::MissingOwner)));
    }

    #[test]
    fn test_glob_matches_pattern() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("a.txt"), "").expect("write failed");
        fs::write(dir.path().join("b.log"), "").expect("write failed");

        let files = glob_files(&[dir.path().to_path_buf()], "*.txt", false, true)
            .expect("glob failed");

        assert_eq!(files, vec!["a.txt"]);
    }

    #[test]
    fn test_glob_recursive_descends() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir(dir.path().join("sub")).expect("mkdir failed");
        fs::write(dir.path().join("sub/deep.txt"), "").expect("write failed");

        let flat = glob_files(&[dir.path().to_path_buf()], "*.txt", false, true)
            .expect("glob failed");
        let deep = glob_files(&[dir.path().to_path_buf()], "*.txt", true, true)
            .expect("glob failed");

        assert!(flat.is_empty());
        assert_eq!(deep, vec!["deep.txt"]);
    }
}
