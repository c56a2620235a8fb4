//! Output sinks for rendered entries
//!
//! The router decides, per line, whether it goes to the console, the rotating
//! file sink, both, or nowhere. Failures are reported through `tracing` and
//! never surface to the caller of the logging methods.

mod console;
mod file;
mod rotation;

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::FileSinkConfig;
use crate::entry::Level;

pub use console::Console;
pub use file::{FileSink, SinkState, LINE_ENDING};
pub use rotation::{generation_path, needs_rotation, prune_generations, rotate};

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while writing to a sink
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to create the directory holding the log file
    #[error("Failed to create log directory at {path}: {source}")]
    CreateDirectory {
        /// The directory that could not be created
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// A rename or delete in the rotation chain failed
    #[error("Failed to rotate {path}: {source}")]
    Rotation {
        /// The file being moved or removed
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Appending the line failed
    #[error("Failed to write to {path}: {source}")]
    Write {
        /// The base log file
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// File sink settings violate an invariant
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The sink gave up after its directory could not be created
    #[error("File sink for {0} is unavailable")]
    Unavailable(PathBuf),
}

/// Destination selection for rendered entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    None,
    #[default]
    Console,
    File,
    Both,
}

impl Target {
    pub fn wants_console(&self) -> bool {
        matches!(self, Target::Console | Target::Both)
    }

    pub fn wants_file(&self) -> bool {
        matches!(self, Target::File | Target::Both)
    }
}

/// What the running environment lets the router do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether a filesystem is available for the file sink
    pub supports_file: bool,
}

impl Capabilities {
    /// Probe the current runtime
    pub fn detect() -> Self {
        Self {
            supports_file: !cfg!(target_family = "wasm"),
        }
    }

    /// An environment without filesystem access
    pub fn console_only() -> Self {
        Self {
            supports_file: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Routes rendered lines to the console and/or the file sink
pub struct SinkRouter {
    /// Effective target, after any capability downgrade
    target: Target,
    capabilities: Capabilities,
    console: Console,
    file: FileSink,
}

impl SinkRouter {
    /// Create a router; the requested target is checked against `capabilities`
    pub fn new(
        target: Target,
        file_config: FileSinkConfig,
        capabilities: Capabilities,
        console: Console,
    ) -> Self {
        Self {
            target: resolve_target(target, capabilities),
            capabilities,
            console,
            file: FileSink::new(file_config),
        }
    }

    /// The effective target
    pub fn target(&self) -> Target {
        self.target
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn file_sink(&self) -> &FileSink {
        &self.file
    }

    /// Request a new target, downgrading it if file output is not possible
    pub fn set_target(&mut self, target: Target) {
        self.target = resolve_target(target, self.capabilities);
    }

    /// Replace the file sink settings; a degraded sink gets a fresh start
    pub fn set_file_config(&mut self, config: FileSinkConfig) {
        self.file.reconfigure(config);
    }

    /// Deliver one rendered line
    pub fn emit(&mut self, level: Option<Level>, line: &str) {
        let mut to_console = self.target.wants_console();

        if self.target.wants_file() {
            match self.file.write(line) {
                Ok(()) => {}
                Err(Error::Unavailable(_)) => {
                    // Directory creation already failed and was reported
                    to_console = true;
                }
                Err(e @ Error::CreateDirectory { .. }) => {
                    tracing::error!("{}; falling back to console output", e);
                    to_console = true;
                }
                Err(e) => {
                    tracing::error!("Dropped log line: {}", e);
                }
            }
        }

        if to_console {
            self.console.print(level, line);
        }
    }
}

/// Downgrade file targets to the console when the environment has no filesystem
fn resolve_target(requested: Target, capabilities: Capabilities) -> Target {
    if requested.wants_file() && !capabilities.supports_file {
        tracing::warn!(
            requested = ?requested,
            "File output is not supported in this environment; logging to console instead"
        );
        Target::Console
    } else {
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{capture_diagnostics, SharedBuffer};
    use tempfile::TempDir;

    fn router(
        target: Target,
        config: FileSinkConfig,
        capabilities: Capabilities,
    ) -> (SinkRouter, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let console = Console::new(out.clone(), err.clone());
        (
            SinkRouter::new(target, config, capabilities, console),
            out,
            err,
        )
    }

    #[test]
    fn test_target_predicates() {
        assert!(!Target::None.wants_console());
        assert!(!Target::None.wants_file());
        assert!(Target::Console.wants_console());
        assert!(!Target::Console.wants_file());
        assert!(!Target::File.wants_console());
        assert!(Target::File.wants_file());
        assert!(Target::Both.wants_console());
        assert!(Target::Both.wants_file());
    }

    #[test]
    fn test_file_target_downgraded_without_capability() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs/app.log");

        let (diagnostics, (mut router, out, _err)) = capture_diagnostics(|| {
            router(
                Target::File,
                FileSinkConfig::new(&path),
                Capabilities::console_only(),
            )
        });

        assert_eq!(router.target(), Target::Console);
        assert!(diagnostics.contains("File output is not supported"));

        router.emit(Some(Level::Info), "hello");
        assert_eq!(out.contents(), "hello\n");
        assert!(!path.exists());
        assert!(!temp_dir.path().join("logs").exists());
    }

    #[test]
    fn test_downgrade_reevaluated_on_set_target() {
        let (mut router, _out, _err) = router(
            Target::Console,
            FileSinkConfig::default(),
            Capabilities::console_only(),
        );

        router.set_target(Target::Both);
        assert_eq!(router.target(), Target::Console);

        router.set_target(Target::None);
        assert_eq!(router.target(), Target::None);
    }

    #[test]
    fn test_error_levels_go_to_stderr() {
        let (mut router, out, err) = router(
            Target::Console,
            FileSinkConfig::default(),
            Capabilities::detect(),
        );

        router.emit(Some(Level::Debug), "d");
        router.emit(Some(Level::Info), "i");
        router.emit(Some(Level::Warn), "w");
        router.emit(None, "r");
        router.emit(Some(Level::Error), "e");
        router.emit(Some(Level::Fatal), "f");

        assert_eq!(out.contents(), "d\ni\nw\nr\n");
        assert_eq!(err.contents(), "e\nf\n");
    }

    #[test]
    fn test_none_target_emits_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let (mut router, out, err) = router(
            Target::None,
            FileSinkConfig::new(&path),
            Capabilities::detect(),
        );

        router.emit(Some(Level::Error), "quiet");
        assert!(out.contents().is_empty());
        assert!(err.contents().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_both_writes_console_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let (mut router, out, _err) = router(
            Target::Both,
            FileSinkConfig::new(&path),
            Capabilities::detect(),
        );

        router.emit(Some(Level::Info), "twice");
        assert_eq!(out.contents(), "twice\n");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("twice{}", LINE_ENDING)
        );
    }

    #[test]
    fn test_degraded_file_sink_falls_back_to_console() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the log directory should be
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("app.log");

        let (mut router, out, _err) = router(
            Target::File,
            FileSinkConfig::new(&path),
            Capabilities::detect(),
        );

        let (diagnostics, ()) = capture_diagnostics(|| {
            router.emit(Some(Level::Info), "first");
        });
        assert!(diagnostics.contains("Failed to create log directory"));
        assert_eq!(router.file_sink().state(), SinkState::Degraded);

        router.emit(Some(Level::Info), "second");
        assert_eq!(out.contents(), "first\nsecond\n");

        // Reapplying settings gives the sink another chance
        let good = temp_dir.path().join("ok/app.log");
        router.set_file_config(FileSinkConfig::new(&good));
        assert_eq!(router.file_sink().state(), SinkState::Uninitialized);
        router.emit(Some(Level::Info), "third");
        assert_eq!(
            std::fs::read_to_string(&good).unwrap(),
            format!("third{}", LINE_ENDING)
        );
    }
}
