//! Rotating file sink
//!
//! Appends one line per call to the base log file, rotating the file into
//! numbered generations once it reaches the configured size. The file is
//! opened per write, so a rotation performed by this sink never leaves a
//! stale handle behind.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};

use super::rotation::{needs_rotation, prune_generations, rotate};
use super::{Error, Result};
use crate::config::{FileSinkConfig, MAX_FILES_LIMIT};

/// Line terminator appended after every entry
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
/// Line terminator appended after every entry
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Lifecycle of a file sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// No write attempted since the sink was (re)configured
    Uninitialized,
    /// Directory was created at least once; every write re-checks it
    Ready,
    /// The log directory could not be created; writes are refused
    Degraded,
}

/// Size-rotated append-only log file
#[derive(Debug)]
pub struct FileSink {
    config: FileSinkConfig,
    /// Base path after `~` expansion
    path: PathBuf,
    encoding: &'static Encoding,
    state: SinkState,
}

impl FileSink {
    /// Create a sink; nothing touches the filesystem until the first write
    pub fn new(mut config: FileSinkConfig) -> Self {
        let path = expand_path(&config.file_path);
        let encoding = resolve_encoding(&config.encoding);
        warn_if_truncate_requested(&config);
        if config.max_files > MAX_FILES_LIMIT {
            tracing::warn!(
                "max_files = {} is above the limit, keeping {} generations",
                config.max_files,
                MAX_FILES_LIMIT
            );
            config.max_files = MAX_FILES_LIMIT;
        }
        Self {
            config,
            path,
            encoding,
            state: SinkState::Uninitialized,
        }
    }

    /// Swap in new settings and start over from `Uninitialized`
    pub fn reconfigure(&mut self, config: FileSinkConfig) {
        *self = Self::new(config);
    }

    pub fn config(&self) -> &FileSinkConfig {
        &self.config
    }

    /// The base log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    /// Append one line, rotating first if the base file is over the threshold
    ///
    /// Rotation failures are reported and the append still goes ahead; the
    /// chain may then be left with a gap until the next successful rotation.
    pub fn write(&mut self, line: &str) -> Result<()> {
        self.ensure_ready()?;

        if let Some(threshold) = self.config.rotate_size.filter(|t| *t > 0) {
            if let Err(e) = self.rotate_if_needed(threshold) {
                tracing::warn!("Log rotation failed, appending to current file: {}", e);
            }
        }

        self.append(line)
    }

    /// Make sure the parent directory exists; it may vanish between writes
    fn ensure_ready(&mut self) -> Result<()> {
        if self.state == SinkState::Degraded {
            return Err(Error::Unavailable(self.path.clone()));
        }

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(source) = fs::create_dir_all(dir) {
                self.state = SinkState::Degraded;
                return Err(Error::CreateDirectory {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        }

        if self.state == SinkState::Ready {
            return Ok(());
        }
        self.state = SinkState::Ready;

        // Generations left over from a larger max_files
        match prune_generations(&self.path, self.config.max_files) {
            Ok(0) => {}
            Ok(count) => tracing::debug!(
                "Removed {} log generations beyond max_files={}",
                count,
                self.config.max_files
            ),
            Err(e) => tracing::warn!("Failed to prune old log generations: {}", e),
        }

        Ok(())
    }

    fn rotate_if_needed(&self, threshold: u64) -> Result<()> {
        let due = needs_rotation(&self.path, threshold).map_err(|source| Error::Rotation {
            path: self.path.clone(),
            source,
        })?;
        if due {
            tracing::debug!("Rotating {}", self.path.display());
            rotate(&self.path, self.config.max_files)?;
        }
        Ok(())
    }

    fn append(&self, line: &str) -> Result<()> {
        let mut text = String::with_capacity(line.len() + LINE_ENDING.len());
        text.push_str(line);
        text.push_str(LINE_ENDING);
        let (bytes, _, had_errors) = self.encoding.encode(&text);
        if had_errors {
            tracing::warn!(
                "{} cannot encode part of a log line; wrote numeric references",
                self.encoding.name()
            );
        }

        let write_err = |source| Error::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.write_all(&bytes).map_err(write_err)?;
        file.flush().map_err(write_err)
    }
}

/// Expand a leading `~` in the configured path
fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

fn resolve_encoding(label: &str) -> &'static Encoding {
    let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
        tracing::warn!("Unknown log file encoding '{}', using UTF-8", label);
        return UTF_8;
    };
    let output = encoding.output_encoding();
    if output != encoding {
        tracing::warn!(
            "Log file encoding '{}' cannot be written, using {}",
            label,
            output.name()
        );
    }
    output
}

fn warn_if_truncate_requested(config: &FileSinkConfig) {
    if !config.append {
        tracing::warn!(
            "append = false is not supported for {}; entries will be appended",
            config.file_path.display()
        );
    }
}
