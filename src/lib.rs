//! m3log - tagged, timestamped, leveled line logging
//!
//! Entries are rendered as single lines
//! (`@2024-01-02T03:04:05.678Z [svc api] #INFO: message`) and routed to the
//! console, a size-rotated log file, or both.

pub mod config;
pub mod diagnostics;
pub mod entry;
pub mod logger;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{FileOptions, FileSinkConfig, LoggerConfig};
pub use entry::{Entry, Level, ParseError};
pub use logger::Logger;
pub use sink::{Capabilities, Target};
