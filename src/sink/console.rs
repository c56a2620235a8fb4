//! Console sink: stdout for ordinary entries, stderr for errors

use std::io::{self, Write};

use crate::entry::Level;

/// Console output streams
pub struct Console {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl Console {
    /// Console bound to the process stdout and stderr
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Console writing to arbitrary streams
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            err: Box::new(err),
        }
    }

    /// Print one line; ERROR and FATAL go to the error stream
    pub fn print(&mut self, level: Option<Level>, line: &str) {
        let stream = match level {
            Some(level) if level.uses_stderr() => &mut self.err,
            _ => &mut self.out,
        };
        // Nothing left to report a console failure to
        let _ = writeln!(stream, "{}", line);
        let _ = stream.flush();
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdio()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}
