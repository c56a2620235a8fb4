//! Log entries and the m3log line format
//!
//! A rendered entry is a single line laid out as
//! `@<timestamp> [<tag> <tag> ...] #<LEVEL>: <message>`, where the timestamp,
//! tag list and level are each optional. Without a level the line still carries
//! the `: ` separator before the message.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// All levels, least severe first
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    /// Get the name written after `#` in a rendered line
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Whether console output for this level belongs on stderr
    pub fn uses_stderr(&self) -> bool {
        matches!(self, Level::Error | Level::Fatal)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ParseError::UnknownLevel(s.to_string()))
    }
}

/// Errors produced when reading a line back into an [`Entry`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// `@` marker with nothing separating the timestamp from the rest
    #[error("timestamp is not followed by a space")]
    UnterminatedTimestamp,

    /// `[` without a matching `]`
    #[error("tag list is missing its closing bracket")]
    UnterminatedTags,

    /// `#` marker without the `:` that ends the level name
    #[error("level marker is missing its ':' terminator")]
    UnterminatedLevel,

    /// Level name outside the fixed set
    #[error("unknown level '{0}'")]
    UnknownLevel(String),

    /// No `:` separator before the message
    #[error("missing ':' separator before the message")]
    MissingSeparator,
}

/// Format a UTC instant the way entries carry it: ISO-8601, millisecond precision, `Z` suffix
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time formatted for an entry
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

/// One log record, prior to (or recovered from) its single-line form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Pre-formatted timestamp, written after `@`
    pub timestamp: Option<String>,
    /// Tags in insertion order; duplicates are kept
    pub tags: Vec<String>,
    /// Level, or `None` for raw entries
    pub level: Option<Level>,
    /// Message text, written verbatim
    pub message: String,
}

impl Entry {
    /// Create an entry with no timestamp and no tags
    pub fn new(level: Option<Level>, message: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            tags: Vec::new(),
            level,
            message: message.into(),
        }
    }

    /// Set the timestamp
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Append tags, keeping their order
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Render the entry as one line (no terminator)
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Read a rendered line back into an entry
    ///
    /// The message is everything after the first `: ` following the level (or
    /// the tag list when there is no level), so messages may themselves contain
    /// colons, brackets or `#`.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut rest = line;

        let timestamp = match rest.strip_prefix('@') {
            Some(after) => {
                let (time, tail) = after
                    .split_once(' ')
                    .ok_or(ParseError::UnterminatedTimestamp)?;
                rest = tail;
                Some(time.to_string())
            }
            None => None,
        };

        let mut tags = Vec::new();
        if let Some(after) = rest.strip_prefix('[') {
            let (list, tail) = after.split_once(']').ok_or(ParseError::UnterminatedTags)?;
            tags = list.split_whitespace().map(str::to_string).collect();
            rest = tail.strip_prefix(' ').unwrap_or(tail);
        }

        let level = match rest.strip_prefix('#') {
            Some(after) => {
                let (name, tail) = after.split_once(':').ok_or(ParseError::UnterminatedLevel)?;
                rest = tail;
                Some(name.trim().parse::<Level>()?)
            }
            None => {
                rest = rest.strip_prefix(':').ok_or(ParseError::MissingSeparator)?;
                None
            }
        };

        let message = rest.strip_prefix(' ').unwrap_or(rest).to_string();

        Ok(Self {
            timestamp,
            tags,
            level,
            message,
        })
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(timestamp) = &self.timestamp {
            write!(f, "@{} ", timestamp)?;
        }
        if !self.tags.is_empty() {
            write!(f, "[{}] ", self.tags.join(" "))?;
        }
        match self.level {
            Some(level) => write!(f, "#{}: ", level)?,
            None => f.write_str(": ")?,
        }
        f.write_str(&self.message)
    }
}
