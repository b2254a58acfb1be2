use std::path::PathBuf;
use std::time::Duration;

use crate::application::data::LogLevel;
use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub master: PathBuf,
    pub slave: PathBuf,
    /// Delay between passes; the CLI guarantees it is positive and finite.
    pub interval: Duration,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            master: cli.master,
            slave: cli.slave,
            interval: cli.interval,
            log_level: cli.log_level,
            log_file: cli.log_file,
        }
    }
}
