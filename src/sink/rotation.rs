//! Size-based rotation of a log file into numbered generations
//!
//! For a base path `app.log` the chain is `app.log`, `app.log.1`, ...
//! `app.log.N`; generation 1 is the most recently rotated file.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{Error, Result};

/// Path of rotated generation `generation` for `base`
pub fn generation_path(base: &Path, generation: usize) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".{}", generation));
    PathBuf::from(name)
}

/// Whether the base file has reached `threshold` bytes
///
/// A missing base file never needs rotation.
pub fn needs_rotation(base: &Path, threshold: u64) -> io::Result<bool> {
    match fs::metadata(base) {
        Ok(metadata) => Ok(metadata.len() >= threshold),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Shift every generation up by one and move the base file into generation 1
///
/// The oldest generation (`max_files`) is deleted first, then the remaining
/// generations are renamed from the highest index down so no file is
/// overwritten before it has moved. With `max_files == 0` the base file is
/// simply discarded. Stops at the first failing step.
pub fn rotate(base: &Path, max_files: usize) -> Result<()> {
    if max_files == 0 {
        return remove_if_exists(base);
    }

    remove_if_exists(&generation_path(base, max_files))?;

    for generation in (1..max_files).rev() {
        let from = generation_path(base, generation);
        rename_if_exists(&from, &generation_path(base, generation + 1))?;
    }

    rename_if_exists(base, &generation_path(base, 1))
}

/// Delete generations numbered above `max_files`
///
/// Returns the number of files deleted. Files that merely share the base
/// name's prefix (`app.log.bak`, `app.log.01`) are left alone.
pub fn prune_generations(base: &Path, max_files: usize) -> Result<usize> {
    let (dir, file_name) = match (base.parent(), base.file_name().and_then(|n| n.to_str())) {
        (Some(dir), Some(name)) => (dir, name),
        _ => return Ok(0),
    };
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(Error::Rotation {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let prefix = format!("{}.", file_name);
    let mut deleted_count = 0;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(generation) = name
            .to_str()
            .and_then(|n| n.strip_prefix(&prefix))
            .and_then(parse_generation)
        else {
            continue;
        };

        if generation > max_files {
            let path = entry.path();
            fs::remove_file(&path).map_err(|source| Error::Rotation { path, source })?;
            deleted_count += 1;
        }
    }

    Ok(deleted_count)
}

/// Parse a generation suffix written by `generation_path`
fn parse_generation(suffix: &str) -> Option<usize> {
    if suffix.is_empty() || suffix.starts_with('0') || !suffix.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    suffix.parse().ok()
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Rotation {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn rename_if_exists(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Ok(());
    }
    fs::rename(from, to).map_err(|source| Error::Rotation {
        path: from.to_path_buf(),
        source,
    })
}
