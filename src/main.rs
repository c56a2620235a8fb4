use std::io::{self, BufRead};

use anyhow::{Context, Result};

use m3log::{diagnostics, Level, Logger, LoggerConfig};

/// Level for every line read from stdin; unset means raw entries
const LEVEL_ENV: &str = "M3LOG_LEVEL";

fn main() -> Result<()> {
    diagnostics::init();

    let config = LoggerConfig::load()?;

    let level = match std::env::var(LEVEL_ENV) {
        Ok(name) => Some(
            name.trim()
                .to_ascii_uppercase()
                .parse::<Level>()
                .with_context(|| format!("Invalid {}", LEVEL_ENV))?,
        ),
        Err(_) => None,
    };

    let mut logger = Logger::from_config(config);

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        logger.log(level, &line, &[]);
    }

    Ok(())
}
