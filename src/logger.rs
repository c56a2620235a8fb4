//! The logger: configuration, formatting and routing behind one handle

use crate::config::{FileOptions, FileSinkConfig, LoggerConfig};
use crate::entry::{timestamp_now, Entry, Level};
use crate::sink::{Capabilities, Console, SinkRouter, Target};

/// A tagged, leveled line logger
///
/// Every logging method renders the entry, routes it to the configured sinks
/// and returns the rendered line. Sink failures are reported through `tracing`
/// and never returned to the caller.
///
/// ```no_run
/// use m3log::{Logger, Target};
///
/// let mut log = Logger::new(["svc"], Target::Console, None);
/// log.set_auto_timestamp(false).add_tags(["api"]);
/// assert_eq!(log.info("ready", &[]), "[svc api] #INFO: ready");
/// ```
pub struct Logger {
    config: LoggerConfig,
    router: SinkRouter,
}

impl Logger {
    /// Create a logger with default tags, a target and optional file settings
    pub fn new<I, S>(tags: I, target: Target, file: Option<FileSinkConfig>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_config(LoggerConfig {
            tags: tags.into_iter().map(Into::into).collect(),
            target,
            file: file.unwrap_or_default(),
            ..LoggerConfig::default()
        })
    }

    /// Create a logger writing to the process console
    pub fn from_config(config: LoggerConfig) -> Self {
        Self::with_console(config, Capabilities::detect(), Console::stdio())
    }

    /// Create a logger with explicit capabilities
    pub fn with_capabilities(config: LoggerConfig, capabilities: Capabilities) -> Self {
        Self::with_console(config, capabilities, Console::stdio())
    }

    /// Create a logger with explicit capabilities and console streams
    pub fn with_console(
        mut config: LoggerConfig,
        capabilities: Capabilities,
        console: Console,
    ) -> Self {
        let router = SinkRouter::new(config.target, config.file.clone(), capabilities, console);
        config.target = router.target();
        Self { config, router }
    }

    /// Current configuration; `target` reflects any capability downgrade
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Effective target
    pub fn target(&self) -> Target {
        self.config.target
    }

    pub fn tags(&self) -> &[String] {
        &self.config.tags
    }

    pub fn set_target(&mut self, target: Target) -> &mut Self {
        self.router.set_target(target);
        self.config.target = self.router.target();
        self
    }

    /// Update file sink settings
    ///
    /// The options are applied all at once; if the result is invalid it is
    /// reported and the previous settings stay in effect.
    pub fn set_file_options(&mut self, options: FileOptions) -> &mut Self {
        match self.config.file.apply(&options) {
            Ok(file) => {
                self.router.set_file_config(file.clone());
                self.config.file = file;
            }
            Err(e) => tracing::warn!("Ignoring file options: {}", e),
        }
        self
    }

    pub fn set_auto_timestamp(&mut self, enabled: bool) -> &mut Self {
        self.config.auto_timestamp = enabled;
        self
    }

    /// Append default tags
    pub fn add_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Replace the default tags
    pub fn set_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Render an entry without sending it anywhere
    pub fn format(&self, level: Option<Level>, message: &str, tags: &[&str]) -> String {
        let timestamp = self.config.auto_timestamp.then(timestamp_now);
        self.entry(timestamp, level, message, tags).render()
    }

    /// Render, route and return one entry
    pub fn log(&mut self, level: Option<Level>, message: &str, tags: &[&str]) -> String {
        let line = self.format(level, message, tags);
        self.router.emit(level, &line);
        line
    }

    pub fn debug(&mut self, message: &str, tags: &[&str]) -> String {
        self.log(Some(Level::Debug), message, tags)
    }

    pub fn info(&mut self, message: &str, tags: &[&str]) -> String {
        self.log(Some(Level::Info), message, tags)
    }

    pub fn warn(&mut self, message: &str, tags: &[&str]) -> String {
        self.log(Some(Level::Warn), message, tags)
    }

    pub fn error(&mut self, message: &str, tags: &[&str]) -> String {
        self.log(Some(Level::Error), message, tags)
    }

    pub fn fatal(&mut self, message: &str, tags: &[&str]) -> String {
        self.log(Some(Level::Fatal), message, tags)
    }

    /// Log without a level
    pub fn raw(&mut self, message: &str, tags: &[&str]) -> String {
        self.log(None, message, tags)
    }

    fn entry(
        &self,
        timestamp: Option<String>,
        level: Option<Level>,
        message: &str,
        tags: &[&str],
    ) -> Entry {
        Entry {
            timestamp,
            tags: self
                .config
                .tags
                .iter()
                .cloned()
                .chain(tags.iter().map(|t| t.to_string()))
                .collect(),
            level,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
