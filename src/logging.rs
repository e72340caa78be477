//! Report sinks for a run: a durable append-only log file and the live console.
//!
//! The sinks are an explicit value scoped around a command with
//! [`LogSinks::in_scope`]; nothing is installed process-wide.

use crate::Result;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Console output format
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Dual-destination log dispatch
#[derive(Clone)]
pub struct LogSinks {
    dispatch: Dispatch,
}

impl LogSinks {
    /// Console at info and above; when `log_file` is given, also append to it
    /// at full detail (debug for this crate when `verbose`, info otherwise).
    pub fn open(log_file: Option<&Path>, verbose: bool, format: LogFormat) -> Result<Self> {
        let file_layer = match log_file {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(false)
                        .with_filter(file_filter(verbose)),
                )
            }
            None => None,
        };

        let console_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
            LogFormat::Text => fmt::layer()
                .with_writer(io::stdout)
                .with_target(false)
                .with_filter(LevelFilter::INFO)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(io::stdout)
                .with_filter(LevelFilter::INFO)
                .boxed(),
        };

        let subscriber = Registry::default().with(console_layer).with(file_layer);
        Ok(Self {
            dispatch: Dispatch::new(subscriber),
        })
    }

    /// Run `f` with these sinks receiving every event it emits
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

fn file_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::new(format!("info,{}={}", env!("CARGO_CRATE_NAME"), level))
}
