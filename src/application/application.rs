use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use snafu::Snafu;
use snafu::prelude::*;
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

use crate::application::RuntimeConfig;
use crate::sync::{SyncError, Synchronizer};

pub struct Application;

impl Application {
    /// Wire the logging sink, build the [`Synchronizer`], install the
    /// Ctrl-C task, and block on the mirror loop. Returns when the loop is
    /// stopped (exit 0 through `main`) or a pass fails fatally.
    pub async fn run(config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let config: RuntimeConfig = config.into();

        let dispatch = build_dispatch(&config)?;
        let synchronizer =
            Synchronizer::new(&config.master, &config.slave, config.interval, dispatch)
                .context(SetupSnafu)?;

        let stop = synchronizer.stop_handle();
        compio::runtime::spawn(async move {
            if compio::signal::ctrl_c().await.is_ok() {
                stop.stop();
            }
        })
        .detach();

        synchronizer.run().await.context(MirrorSnafu)?;

        Ok(())
    }
}

/// Compose the logging sink injected into the synchronizer: an fmt layer on
/// stdout always, plus an append-mode file layer when a log file was
/// requested. The `silent` level yields a no-op dispatch.
fn build_dispatch(config: &RuntimeConfig) -> Result<Dispatch, ApplicationError> {
    let Some(level) = config.log_level.to_tracing_level() else {
        return Ok(Dispatch::none());
    };

    let registry = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(fmt::layer());

    let dispatch = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .context(LogFileSnafu { path: path.clone() })?;
            Dispatch::new(registry.with(fmt::layer().with_ansi(false).with_writer(Arc::new(file))))
        }
        None => Dispatch::new(registry),
    };

    Ok(dispatch)
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Failed to open log file {}", path.display()))]
    LogFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Critical failure while preparing the mirror roots"))]
    SetupError { source: SyncError },
    #[snafu(display("Critical failure during mirroring"))]
    MirrorError { source: SyncError },
}
