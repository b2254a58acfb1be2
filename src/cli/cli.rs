use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::application::data::LogLevel;

/// Continuously mirrors the master directory onto the slave directory.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Cli {
    /// Source tree the mirror is taken from
    pub master: PathBuf,

    /// Destination tree that is made to match the master
    pub slave: PathBuf,

    /// Seconds to wait between passes
    #[clap(long, short, default_value = "1.0", value_parser = parse_interval)]
    pub interval: Duration,

    /// Also append log lines to this file (stdout is always written)
    #[clap(long)]
    pub log_file: Option<PathBuf>,

    #[clap(long, short, default_value = "info", value_enum)]
    pub log_level: LogLevel,
}

/// Accepts positive, finite second counts that fit in a [`Duration`];
/// everything else (zero, negatives, `inf`, `nan`, overflow) is a parse
/// error, so no later conversion can panic.
fn parse_interval(raw: &str) -> Result<Duration, String> {
    let seconds: f64 = raw.parse().map_err(|err| format!("{err}"))?;
    if seconds <= 0.0 {
        return Err(String::from("interval must be positive"));
    }
    Duration::try_from_secs_f64(seconds).map_err(|err| format!("{err}"))
}
